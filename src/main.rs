use std::sync::{Arc, RwLock};

use clap::Parser;

mod app;
mod chat;
mod classify;
mod cli;
mod config;
mod credits;
mod eid;
mod errors;
mod jobs;
mod pipeline;
mod providers;
mod storage;
mod summarize;
mod task_runner;
#[cfg(test)]
mod tests;
mod trigger;
mod web;

use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let config = Arc::new(RwLock::new(Config::load_with(&args.base_path)?));
    let mut app_mgr = app::App::new(&args.base_path, config)?;

    match args.command {
        cli::Command::Daemon {} => {
            app_mgr.run_queue();
            web::start_daemon(app_mgr);
            Ok(())
        }

        cli::Command::Process { id, url } => {
            let outcome = app_mgr.process(&id.as_str().into(), &url)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }

        cli::Command::Resume { id } => {
            // no queue in foreground mode: reset, then run inline
            let job = app_mgr.resume(&id.as_str().into())?;
            let outcome = app_mgr.process(&job.id, &job.source_url)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }

        cli::Command::Classify { url } => {
            let classification = classify::classify(&url);
            println!("{}", serde_json::to_string_pretty(&classification)?);
            Ok(())
        }
    }
}
