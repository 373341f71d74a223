//! Serial line exerciser
//!
//! Opens a serial port, streams an incrementing byte sequence through it and
//! verifies the sequence coming back. The process exit status summarises the
//! run:
//!
//! - 0 when everything sent came back in order
//! - the number of lost bytes plus sequence errors otherwise (capped at 125)
//! - 127 when an enabled direction never moved a byte
//! - `-errno` (as seen by the shell) when the run was aborted

mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::Args;
use colored::Colorize;
use config::{resolve_config_path, ConfigBuilder};
use serialtest_core::{errno_status, ExerciserError, EINVAL, EIO};
use serialtest_hardware::{list_ports, Console, SerialChannel, Session};
use tracing::{debug, error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    init_tracing(args.verbose);

    let status = match run(args).await {
        Ok(status) => status,
        Err(e) => {
            error!("{:#}", e);
            setup_status(&e)
        }
    };

    debug!("Exit status {}", status);
    std::process::exit(status);
}

async fn run(args: Args) -> Result<i32> {
    if args.list_ports {
        print_ports()?;
        return Ok(0);
    }

    // Build configuration using priority chain: defaults → file → env → CLI args
    let config_path = resolve_config_path(&args, |key| std::env::var(key).ok());
    if let Some(path) = &config_path {
        info!("Profile: {}", path.display());
    }

    let profile = ConfigBuilder::new()
        .with_config_file(config_path.as_deref())?
        .with_env_overrides()
        .with_args(&args)
        .build()?;

    if profile.output.color {
        colored::control::set_override(true);
    }

    let mut channel = SerialChannel::open(&profile.port)?;

    if let Some(first) = args.single_byte {
        return send_single(&mut channel, first, args.second_byte).await;
    }

    let port_name = profile.port.path.clone().unwrap_or_default();
    let console = Console::new(std::io::stdout(), port_name, profile.output.clone());
    let mut session = Session::new(channel, profile.loop_config(), console)?;

    let outcome = session.run().await;
    if let Err(e) = &outcome {
        error!("{}", e);
    }

    // Runs on the abort path too, so partial progress is always reported
    let summary = session.shutdown().await;
    info!(
        "Done: {} bytes written, {} bytes read, {} errors",
        summary.counters.bytes_written, summary.counters.bytes_read, summary.counters.mismatches
    );

    Ok(summary.status_for(&outcome))
}

/// Write one or two bytes and report the outcome as an exit status
async fn send_single(channel: &mut SerialChannel, first: u8, second: Option<u8>) -> Result<i32> {
    let mut bytes = vec![first];
    bytes.extend(second);

    match channel.send_bytes(&bytes).await {
        Ok(written) if written == bytes.len() => Ok(0),
        Ok(written) => {
            error!("write() returned {}, not {}", written, bytes.len());
            Ok(errno_status(EIO))
        }
        Err(ExerciserError::Io(e)) => {
            error!("write() failed: {}", e);
            Ok(e.raw_os_error().unwrap_or(EIO))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        match port.usb {
            Some((vid, pid)) => println!(
                "{}  {:04x}:{:04x}  {}",
                port.name.bold(),
                vid,
                pid,
                port.description
            ),
            None => println!("{}  {}", port.name.bold(), port.description),
        }
    }

    Ok(())
}

/// Exit status for an error raised before or outside the loop
fn setup_status(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ExerciserError>()
        .map_or(errno_status(EINVAL), ExerciserError::exit_status)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the report lines
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
