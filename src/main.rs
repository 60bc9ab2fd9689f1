//! fdfs - upload, download and delete files on a tracker/storage cluster

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;

use fdfs::cli::{parse_host_port, Cli, Command};
use fdfs::config::{PoolSettings, Settings, TrackerSettings};
use fdfs::logging::setup_logging;
use fdfs::protocol_core::file_ext;
use fdfs::Client;

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("load settings {}", path.display()))?,
        None => Settings {
            log_level: "warn".to_string(),
            tracker: TrackerSettings {
                host: "127.0.0.1".to_string(),
                port: 22122,
            },
            pool: PoolSettings::default(),
        },
    };
    if let Some(addr) = &cli.tracker {
        let (host, port) = parse_host_port(addr)?;
        settings.tracker = TrackerSettings { host, port };
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    Ok(settings)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn ext_for(path: &Path, ext: &Option<String>) -> String {
    match ext {
        Some(e) => e.clone(),
        None => file_ext(&path.to_string_lossy()).to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    setup_logging(&settings.log_level)?;

    let client = Client::new(
        &settings.tracker.host,
        settings.tracker.port,
        settings.client_config()?,
    )
    .with_context(|| format!("connect tracker {}:{}", settings.tracker.host, settings.tracker.port))?;

    match &cli.command {
        Command::Upload { file, group, ext, appender } => {
            let blob = read_input(file)?;
            let ext = ext_for(file, ext);
            let file_id = if *appender {
                client.upload_appender_by_buffer(group, &blob, &ext)
            } else {
                client.upload_by_buffer(group, &blob, &ext)
            }
            .with_context(|| format!("upload {}", file.display()))?;
            println!("{}", file_id);
        }
        Command::UploadSlave { file, master_id, prefix, ext } => {
            let blob = read_input(file)?;
            let ext = ext_for(file, ext);
            let file_id = client
                .upload_slave_by_buffer(&blob, master_id, prefix, &ext)
                .with_context(|| format!("upload slave of {}", master_id))?;
            println!("{}", file_id);
        }
        Command::Append { file, file_id } => {
            let blob = read_input(file)?;
            client
                .append_file(&blob, file_id)
                .with_context(|| format!("append to {}", file_id))?;
        }
        Command::Download { file_id, output, offset, size } => {
            let blob = client
                .download_to_buffer_by_offset(file_id, *offset, *size)
                .with_context(|| format!("download {}", file_id))?;
            match output {
                Some(path) => std::fs::write(path, &blob)
                    .with_context(|| format!("write {}", path.display()))?,
                None => std::io::stdout().write_all(&blob)?,
            }
        }
        Command::Delete { file_id } => {
            client
                .delete_file(file_id)
                .with_context(|| format!("delete {}", file_id))?;
        }
    }

    client.close();
    Ok(())
}
