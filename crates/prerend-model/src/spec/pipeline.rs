use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{CommandSpec, ModelError, RouteMap, ServerSpec, Stage, StepSpec};

/// Complete description of a render run.
///
/// Every field has a default, so a config file only needs to name what it
/// changes. The defaults describe a Node application built with npm scripts
/// and served by `node ./src/server` on port 8000.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSpec {
    /// Directory the build step writes to and the rendered site ends up in.
    pub build_root: PathBuf,
    /// Subdirectory of `build_root` the original build output is moved into.
    pub assets_dir: String,
    /// Pre-server steps, executed in order.
    pub steps: Vec<StepSpec>,
    pub server: ServerSpec,
    pub routes: RouteMap,
    /// Command run after a successful render by `prerend deploy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<CommandSpec>,
}

impl PipelineSpec {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.build_root.as_os_str().is_empty() {
            return Err(ModelError::Invalid("buildRoot is empty".into()));
        }
        if self.assets_dir.trim().is_empty()
            || self.assets_dir.contains(['/', '\\'])
            || self.assets_dir == "."
            || self.assets_dir == ".."
        {
            return Err(ModelError::Invalid(format!(
                "assetsDir must be a single directory name: {:?}",
                self.assets_dir
            )));
        }
        for step in &self.steps {
            step.validate()?;
        }
        for pair in self.steps.windows(2) {
            if pair[1].stage < pair[0].stage {
                return Err(ModelError::Invalid(format!(
                    "step '{}' ({}) is listed after '{}' ({})",
                    pair[1].name, pair[1].stage, pair[0].name, pair[0].stage
                )));
            }
        }
        self.server.validate()?;
        if self.routes.is_empty() {
            return Err(ModelError::Invalid("no routes to render".into()));
        }
        if let Some((route, _)) = self
            .routes
            .top_level_outputs()
            .find(|(_, top)| *top == self.assets_dir)
        {
            return Err(ModelError::Invalid(format!(
                "output for route '{route}' would land inside '{}'",
                self.assets_dir
            )));
        }
        if let Some(deploy) = &self.deploy {
            deploy
                .validate()
                .map_err(|e| ModelError::Invalid(format!("deploy: {e}")))?;
        }
        Ok(())
    }
}

impl Default for PipelineSpec {
    fn default() -> Self {
        let routes = RouteMap::new()
            .with("/", "index.html")
            .and_then(|m| m.with("/404", "404.html"))
            .unwrap_or_default();

        Self {
            build_root: PathBuf::from("build"),
            assets_dir: "assets".into(),
            steps: vec![
                StepSpec::exec("lint", Stage::Verify, CommandSpec::new("npm", ["run", "lint"])),
                StepSpec::exec("test", Stage::Test, CommandSpec::new("npm", ["test"])),
                StepSpec::clean("clean"),
                StepSpec::exec("build", Stage::Build, CommandSpec::new("npm", ["run", "build"])),
            ],
            server: ServerSpec::default(),
            routes,
            deploy: None,
        }
    }
}
