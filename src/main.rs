mod cli;
mod commands;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use stickydesk::logging;
use stickydesk::settings::{default_settings_path, Settings};
use stickydesk::storage::{default_store_path, YamlStore};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let data_path = match args.data {
        Some(path) => path,
        None => default_store_path()?,
    };
    let config_path = match args.config {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let log_dir = data_path
        .parent()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|| "logs".into());
    let _guard = logging::init(&log_dir)?;

    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading settings from {:?}", config_path))?;
    let store = YamlStore::open(&data_path)
        .with_context(|| format!("opening desk at {:?}", data_path))?;
    tracing::info!(data = ?data_path, config = ?config_path, "starting");

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Tui => commands::tui(store, settings, &config_path),
        cli::Command::List => commands::list(&store),
        cli::Command::Add { topic, tasks } => commands::add(store, topic, tasks),
        cli::Command::Toggle { note, index } => commands::toggle(store, &note, index),
        cli::Command::Copy { note } => commands::copy(&store, &note),
        cli::Command::Clean => commands::clean(store),
        cli::Command::Layout { width, height } => commands::layout(store, settings, width, height),
        cli::Command::CheckUpdates { url } => commands::check_updates(&url),
        cli::Command::Settings {
            corner,
            axis,
            margin,
            spacing,
            license,
        } => commands::settings(
            settings,
            &config_path,
            commands::SettingsUpdate {
                corner,
                axis,
                margin,
                spacing,
                license,
            },
        ),
    }
}
