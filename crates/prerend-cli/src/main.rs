//! `prerend`: build a web application and prerender its routes to static HTML.
//!
//! Commands:
//! - `render`: run the configured steps, start the server, capture every
//!   route, move the build output into the assets directory and write pages;
//! - `deploy`: `render`, then run the configured deploy command;
//! - `config`: print the effective configuration.
mod args;
mod config;
mod render;
mod steps;

use std::{future::Future, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use prerend_core::pipeline::{PipelineError, PipelineReport};
use prerend_observe::{init_local_offset, init_logger};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    args::{Cli, Command},
    config::AppConfig,
};

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: u8 = 130;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    // Before any thread exists.
    init_local_offset();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let logger = cfg.logger.clone().with_overrides(cli.log_level, cli.log_format);
    if let Err(e) = init_logger(&logger) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Config => match serde_json::to_string_pretty(&cfg) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Render { production } => {
            let env = render::render_env(production).await;
            let cancel = CancellationToken::new();
            interruptible(render::render(&cfg.pipeline, &env, cancel.clone()), cancel).await
        }
        Command::Deploy { production } => {
            let env = render::render_env(production).await;
            let cancel = CancellationToken::new();
            interruptible(render::deploy(&cfg.pipeline, &env, cancel.clone()), cancel).await
        }
    }
}

/// Drive `fut` to completion unless Ctrl-C arrives first.
///
/// On Ctrl-C `cancel` fires and the future is dropped, which kills a running
/// step and stops a running server.
async fn interruptible<F>(fut: F, cancel: CancellationToken) -> ExitCode
where
    F: Future<Output = Result<PipelineReport>>,
{
    tokio::select! {
        res = fut => match res {
            Ok(report) => {
                info!(
                    pages = report.written.len(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "done"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", failure_line(&e));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; stopping");
            cancel.cancel();
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// One-line summary naming the failed stage when the pipeline itself failed.
fn failure_line(e: &anyhow::Error) -> String {
    match e.downcast_ref::<PipelineError>() {
        Some(pe) => format!("error: {} failed ({}): {e:#}", pe.stage(), pe.kind()),
        None => format!("error: {e:#}"),
    }
}
