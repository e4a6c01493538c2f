use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stickydesk::settings::{Axis, Corner, License, Spacing};
use stickydesk::updates::LATEST_RELEASE_URL;

#[derive(Parser, Debug)]
#[command(name = "stickydesk", version, about = "Floating to-do notes for the terminal")]
pub struct Cli {
    /// Desk data file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the terminal desktop
    Tui,
    /// List every note and its tasks
    List,
    /// Create a note holding the given tasks
    Add {
        /// Topic of the note
        #[arg(long)]
        topic: Option<String>,
        /// Tasks, one per argument
        #[arg(required = true)]
        tasks: Vec<String>,
    },
    /// Mark a task done or not done
    Toggle {
        /// Note hash (a unique prefix is enough)
        note: String,
        /// Task position, starting at 1
        index: usize,
    },
    /// Print a note as an HTML list
    Copy {
        /// Note hash (a unique prefix is enough)
        note: String,
    },
    /// Drop empty tasks and delete finished or empty notes
    Clean,
    /// Show where an arrangement pass would place every note
    Layout {
        /// Virtual screen width in points
        #[arg(long, default_value_t = 1440)]
        width: i32,
        /// Virtual screen height in points
        #[arg(long, default_value_t = 900)]
        height: i32,
    },
    /// Look up the latest release and compare it with this version
    CheckUpdates {
        /// Release endpoint answering with a `tag_name`
        #[arg(long, default_value = LATEST_RELEASE_URL)]
        url: String,
    },
    /// Show or change settings
    Settings {
        #[arg(long, value_enum)]
        corner: Option<Corner>,
        #[arg(long, value_enum)]
        axis: Option<Axis>,
        /// Distance between the corner and the first note
        #[arg(long, value_enum)]
        margin: Option<Spacing>,
        /// Distance between neighbouring notes
        #[arg(long, value_enum)]
        spacing: Option<Spacing>,
        #[arg(long, value_enum)]
        license: Option<License>,
    },
}
