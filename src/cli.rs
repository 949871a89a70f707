//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Issue, look up, and download vehicle certificates.
///
/// cert-client talks to the certificate management API, keeping the signed-in
/// session in a local token file between invocations.
#[derive(Parser, Debug)]
#[command(name = "cert-client")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API origin (overrides the CERT_API_URL environment variable)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new account
    Signup {
        /// Login email address
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Company name
        #[arg(long)]
        company: String,
        /// Request an administrator account
        #[arg(long)]
        admin: bool,
    },

    /// Sign in and persist the session locally
    Login {
        /// Login email address
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Sign out and discard the persisted session
    Logout,

    /// Show the signed-in user
    Me,

    /// Certificate operations
    #[command(subcommand)]
    Cert(CertCommand),

    /// Upload one or more files
    Upload {
        /// Target endpoint path
        #[arg(long, default_value = "/api/files")]
        to: String,
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CertCommand {
    /// Issue a certificate from a JSON request file
    Issue {
        /// Path to a JSON file with the certificate request
        file: PathBuf,
    },

    /// Look up a certificate by its number
    Get {
        /// Certificate number
        cert_number: String,
    },

    /// Look up a certificate by vehicle identification number
    Vin {
        /// Vehicle identification number
        vin: String,
    },

    /// Download a certificate PDF
    Download {
        /// Certificate number
        cert_number: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}
