use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tubescribe", about = "YouTube transcription and summary pipeline")]
pub struct Args {
    /// Base directory for config and data files
    #[arg(long, default_value = "./")]
    pub base_path: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API and run the processing queue
    Daemon {},

    /// Run the ingestion pipeline for an existing job, in the foreground
    Process {
        /// Job record id
        id: String,
        /// Submitted YouTube URL
        url: String,
    },

    /// Reset a failed or pending job and re-enter it into the pipeline
    Resume {
        /// Job record id
        id: String,
    },

    /// Print the classification for a URL (debug helper)
    Classify { url: String },
}
