//! Command-line interface for linkarr.

use clap::{Parser, Subcommand};

/// linkarr - self-hosted bookmark manager
#[derive(Parser)]
#[command(name = "linkarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server
    #[command(alias = "-s", alias = "--serve")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create a user account from the command line
    AddUser {
        name: String,
        password: String,
    },

    /// Promote an existing user to admin
    Promote {
        name: String,
    },
}
