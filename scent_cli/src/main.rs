#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod commands;
mod error_fmt;
mod serve;

use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();

    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
    let mut cfg = scent_config::load_toml(&text).wrap_err("parse config TOML")?;
    if let Some(path) = &cli.slots {
        cfg.slots = scent_config::load_slot_table_csv(path)?;
    }
    cfg.validate().wrap_err("invalid configuration")?;

    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run {
            input,
            auto_start,
            wait_for_start,
        } => {
            if auto_start {
                cfg.runner.start = scent_config::StartMode::Auto;
            } else if wait_for_start {
                cfg.runner.start = scent_config::StartMode::Command;
            }

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;

            let summary = serve::run(&cfg, input.as_deref(), shutdown)?;
            tracing::info!(
                completed = summary.completed,
                rejected = summary.rejected,
                failed = summary.failed,
                "session finished"
            );
            Ok(())
        }
        Commands::Inventory => commands::inventory(&cfg, cli.json),
        Commands::Plan {
            slots,
            props,
            carrier,
        } => commands::plan(&cfg, &slots, &props, carrier, cli.json),
        Commands::SelfCheck => commands::self_check(&cfg),
    }
}

/// Console logs go to stderr (stdout carries protocol replies); the optional
/// file sink always writes JSON lines.
fn init_tracing(json: bool, level: &str, logging: &scent_config::Logging) -> eyre::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file '{file}' has no file name"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "never" => tracing_appender::rolling::never(dir, name),
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                other => eyre::bail!(
                    "logging.rotation must be one of never|daily|hourly, got '{other}'"
                ),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(file_layer);
    let res = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()
    };
    res.map_err(|e| eyre::eyre!("init tracing: {e}"))
}
