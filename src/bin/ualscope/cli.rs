use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Разбор баз Windows User Access Logging (ESE)
#[derive(Parser, Debug)]
#[command(name = "ualscope", version, about = "UAL (ESE/JET Blue) database parser")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Parse UAL databases (current.mdb, {GUID}.mdb) into access-log records
    Parse {
        /// One or more .mdb files; records are merged and deduplicated
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Companion SystemIdentity.mdb
        #[arg(long)]
        identity: Option<PathBuf>,
        /// Print JSON lines instead of ||-separated text
        #[arg(long)]
        json: bool,
        /// Do not fail on page checksum mismatches
        #[arg(long)]
        no_verify: bool,
    },
    /// List catalog tables and their columns
    Tables {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Dump all rows of one table
    Dump {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
        /// Stop after N rows
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        no_verify: bool,
    },
    /// Print the database file header
    Header {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check every page checksum and classify pages
    Doctor {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
