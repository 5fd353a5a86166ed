use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the bundle forwarder.
///
/// The binary is a thin front end over the library: it loads a configuration,
/// builds the configured destination and uploads the named bundle files.
#[derive(Parser, Debug)]
#[clap(name = "bundle-forwarder", about = "Deliver staged event bundles to HTTP or S3")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the forwarder.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload bundle files to the configured destination
    Upload {
        /// Path to configuration YAML file
        #[clap(short = 'c', long)]
        config: PathBuf,

        /// Bundle files to upload
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "forwarder.yaml")]
        path: PathBuf,
    },
}
