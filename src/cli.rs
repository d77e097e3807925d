use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vinyl-export")]
#[command(author, version, about = "Chapter extraction and 4K playlist video export")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the chapters of a media file
    Chapters {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show duration and chapters of a media file as JSON
    Probe {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Render a playlist file into a single video
    Export {
        /// Playlist JSON file
        #[arg(required = true)]
        playlist: PathBuf,

        /// Directory the video is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}
