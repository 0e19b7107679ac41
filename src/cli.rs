use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediaconv")]
#[command(author, version, about = "Convert video, audio and image files between formats")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve JSON-lines requests on stdin, replying on stdout
    Serve,

    /// Convert a single file and wait for it to finish
    Convert {
        /// File to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Output format, used as the file extension (e.g. mp4, mp3, png)
        #[arg(short, long)]
        format: String,

        /// Directory to write the converted file to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Media type of the input: video, audio or image
        #[arg(short, long)]
        media_type: String,
    },

    /// List the output formats offered for a media type
    Formats {
        /// Media type: video, audio or image
        media_type: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
