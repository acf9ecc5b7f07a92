use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use tunnlr::cli::{Cli, Commands};
use tunnlr::config::Config;
use tunnlr::daemon;
use tunnlr::session::HandshakeResponse;

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    Ok(())
}

fn read_response_blob(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).context(format!("Failed to read {}", path.display()))
        }
        None => {
            let mut blob = String::new();
            std::io::stdin()
                .read_to_string(&mut blob)
                .context("Failed to read stdin")?;
            Ok(blob)
        }
    }
}

fn print_handshake_summary(parsed: &HandshakeResponse) {
    let presence = |value: &str| if value.is_empty() { "absent" } else { "present" };

    println!("upgrade_version: {}", parsed.upgrade_version);
    println!("psk: {}", presence(&parsed.psk));
    println!("ssh_port: {}", parsed.ssh_port);
    println!("ssh_username: {}", parsed.ssh_username);
    println!("ssh_password: {}", presence(&parsed.ssh_password));
    println!("ssh_host_key: {}", presence(&parsed.ssh_host_key));
    println!("homepages: {}", parsed.homepages.join(", "));
    println!("servers: {}", parsed.servers.len());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Handshake { file }) => {
            let blob = read_response_blob(file.as_ref())?;
            print_handshake_summary(&HandshakeResponse::parse(&blob));
            Ok(())
        }
        Some(Commands::Run) | None => {
            info!("starting worker daemon");
            daemon::run(&config).context("Daemon failed")
        }
    }
}
