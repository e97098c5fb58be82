use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Routes to prerender, keyed by URL path, with the file each one is written to.
///
/// Invariants enforced on every insert (and therefore on deserialization):
/// - routes start with `/`;
/// - output names are relative `/`-separated paths without `..`;
/// - no two routes share an output file.
///
/// Output names are stored normalised (`./a//b` is rejected, `./a/b` becomes
/// `a/b`), so two spellings of one file compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct RouteMap(BTreeMap<String, String>);

impl RouteMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a route, rejecting it if it would break one of the map invariants.
    pub fn insert(
        &mut self,
        route: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<(), ModelError> {
        let route = route.into();
        let output = output.into();

        if !route.starts_with('/') {
            return Err(ModelError::InvalidRoute(route));
        }
        let output = normalize_output(&route, &output)?;

        if let Some((owner, _)) = self
            .0
            .iter()
            .find(|(r, o)| **o == output && **r != route)
        {
            return Err(ModelError::DuplicateOutput {
                file: output,
                first: owner.clone(),
                second: route,
            });
        }
        self.0.insert(route, output);
        Ok(())
    }

    /// Builder-style [`RouteMap::insert`].
    pub fn with(
        mut self,
        route: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.insert(route, output)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn output(&self, route: &str) -> Option<&str> {
        self.0.get(route).map(String::as_str)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(route, output)` pairs in route order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(r, o)| (r.as_str(), o.as_str()))
    }

    /// The top-level path component each output file is written under.
    pub fn top_level_outputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .map(|(route, output)| (route, output.split('/').next().unwrap_or(output)))
    }
}

fn normalize_output(route: &str, output: &str) -> Result<String, ModelError> {
    let invalid = |reason| ModelError::InvalidOutput {
        route: route.to_string(),
        reason,
    };
    if output.trim().is_empty() {
        return Err(invalid("empty filename"));
    }
    if Path::new(output).is_absolute() || output.starts_with('/') {
        return Err(invalid("must be relative to the build root"));
    }
    if output.contains('\\') {
        return Err(invalid("must use '/' as the separator"));
    }

    let mut parts = Vec::new();
    for part in output.split('/') {
        match part {
            "" => return Err(invalid("empty path segment")),
            "." => {}
            ".." => return Err(invalid("must not leave the build root")),
            name => parts.push(name),
        }
    }
    if parts.is_empty() {
        return Err(invalid("must name a file"));
    }
    Ok(parts.join("/"))
}

impl TryFrom<BTreeMap<String, String>> for RouteMap {
    type Error = ModelError;
    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut map = RouteMap::new();
        for (route, output) in raw {
            map.insert(route, output)?;
        }
        Ok(map)
    }
}

impl From<RouteMap> for BTreeMap<String, String> {
    fn from(map: RouteMap) -> Self {
        map.0
    }
}
