//! Argument tree of the `fdfs` binary: global options, one subcommand per
//! file operation, and tracker address parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Command-line client for tracker/storage file clusters
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Tracker address (host:port), overrides the settings file
    #[arg(long)]
    pub tracker: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Upload a local file, print its file id
    Upload {
        file: PathBuf,
        #[arg(long, short = 'g', default_value = "group1")]
        group: String,
        /// Extension stored with the file (defaults to the local one)
        #[arg(long)]
        ext: Option<String>,
        /// Create an appender file
        #[arg(long)]
        appender: bool,
    },
    /// Upload a local file as a slave of an existing file
    UploadSlave {
        file: PathBuf,
        master_id: String,
        prefix: String,
        #[arg(long)]
        ext: Option<String>,
    },
    /// Append a local file to an appender file
    Append { file: PathBuf, file_id: String },
    /// Download a file to disk or stdout
    Download {
        file_id: String,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Bytes to read, 0 = to the end
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
    /// Delete a file
    Delete { file_id: String },
}

/// Split "host:port"; the port defaults to 22122.
pub fn parse_host_port(s: &str) -> Result<(String, u16)> {
    let s = s.trim();
    let (host, port) = match s.rsplit_once(':') {
        Some((h, p)) => (
            h,
            p.parse()
                .map_err(|_| Error::InvalidArgument(format!("bad port in {:?}", s)))?,
        ),
        None => (s, 22122),
    };
    if host.is_empty() {
        return Err(Error::InvalidArgument(format!("missing host in {:?}", s)));
    }
    Ok((host.to_string(), port))
}
