//! japctl - command line control for a Just Add Power matrix

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use jap_protocol::{ReceiverId, TransmitterId};
use jap_switch::{Matrix, MatrixConfig, Receiver, RouteCommandStatus, TcpConnector, UsbReconnect};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "japctl")]
#[command(about = "Inspect and change routes on a Just Add Power matrix")]
struct CtlArgs {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/japswitch/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show every receiver and its current source
    Status,
    /// List the selectable sources
    Sources,
    /// Switch a receiver to a source
    Route {
        /// Receiver id or name
        receiver: String,
        /// Source name or transmitter id
        source: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jap_ctl=info,jap_switch=info,jap_protocol=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CtlArgs::parse();

    let path = match args.config {
        Some(path) => path,
        None => MatrixConfig::default_path()?,
    };
    let config = MatrixConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    if let Command::Sources = args.command {
        for tx in config.transmitters() {
            println!("{:>4}  {}", tx.id.as_u16(), tx.name);
        }
        return Ok(());
    }

    tracing::info!("Connecting to switch {}", config.switch.host);
    let mut matrix = Matrix::connect(&config, Arc::new(TcpConnector))
        .await
        .with_context(|| format!("connecting to switch {}", config.switch.host))?;

    let result = match args.command {
        Command::Status => {
            print_status(&mut matrix);
            Ok(())
        }
        Command::Route { receiver, source } => route(&mut matrix, &receiver, &source).await,
        Command::Sources => Ok(()),
    };

    matrix.disconnect().await;
    result
}

fn print_status(matrix: &mut Matrix) {
    println!(
        "{:>4}  {:<20} {:<4} {:<15} {:<17} SOURCE",
        "RX", "NAME", "STAT", "ADDRESS", "MAC"
    );
    for rx in matrix.receivers_mut() {
        let image = rx.media_image_url();
        println!(
            "{:>4}  {:<20} {:<4} {:<15} {:<17} {}",
            rx.id().as_u16(),
            rx.name(),
            rx.status().name(),
            rx.info().address,
            rx.mac().unwrap_or("-"),
            rx.media_title().unwrap_or("-"),
        );
        if let Some(url) = image {
            println!("      image: {}", url);
        }
    }
}

fn find_receiver<'a>(matrix: &'a mut Matrix, key: &str) -> anyhow::Result<&'a mut Receiver> {
    let id = key.parse::<u16>().ok().map(ReceiverId);
    let index = matrix
        .receivers()
        .iter()
        .position(|rx| Some(rx.id()) == id || rx.name() == key)
        .ok_or_else(|| anyhow!("no receiver {:?} in configuration", key))?;
    Ok(&mut matrix.receivers_mut()[index])
}

async fn route(matrix: &mut Matrix, receiver: &str, source: &str) -> anyhow::Result<()> {
    let rx = find_receiver(matrix, receiver)?;

    let outcome = match source.parse::<u16>() {
        Ok(id) => rx.set_route(TransmitterId(id)).await?,
        Err(_) => match rx.select_source(source).await? {
            Some(outcome) => outcome,
            None => bail!("no source named {:?}", source),
        },
    };

    let command = match outcome.command {
        RouteCommandStatus::Confirmed => "confirmed",
        RouteCommandStatus::Unconfirmed => "not confirmed by switch",
    };
    println!("{} -> {} ({})", outcome.receiver, outcome.transmitter, command);
    match outcome.usb {
        UsbReconnect::NotRequired => {}
        UsbReconnect::Sent => println!("USB reconnected"),
        UsbReconnect::Failed => println!("USB reconnect failed"),
    }
    Ok(())
}
