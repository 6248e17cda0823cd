//! mpdwire - send commands to an MPD daemon from the shell.
//!
//! Connects to the daemon named by `MPD_HOST`/`MPD_PORT`, runs each
//! argument as one command and prints the responses. With `--idle` it keeps
//! the connection open and prints subsystems as they change.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mpdwire::{Client, ClientError, Event, ResponseFrame, Target};

/// Send commands to an MPD daemon and print the responses.
#[derive(Debug, Parser)]
#[command(name = "mpdwire", version)]
struct Args {
    /// Print responses as JSON
    #[arg(long)]
    json: bool,

    /// After the commands, wait for changes and print them
    #[arg(long)]
    idle: bool,

    /// Use the local Unix socket instead of MPD_HOST/MPD_PORT
    #[arg(long)]
    local: bool,

    /// Commands to run, one per argument (e.g. "setvol 50")
    #[arg(required_unless_present = "idle")]
    commands: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries responses.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mpdwire=info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    let target = if args.local {
        Target::local()
    } else {
        Target::from_env()
    };

    let client = Client::new();
    client
        .connect(&target)
        .await
        .with_context(|| format!("Could not connect to {}", target))?;

    let mut failed = false;
    for command in &args.commands {
        match client.command(command).await {
            Ok(frame) => print_frame(&frame, args.json)?,
            Err(ClientError::Ack(frame)) => {
                failed = true;
                match frame.ack() {
                    Some(ack) => eprintln!("{}: {}", command, ack),
                    None => eprintln!("{}: {}", command, frame.status()),
                }
                if args.json {
                    print_frame(&frame, true)?;
                }
            }
            Err(e) => return Err(e).with_context(|| format!("`{}` failed", command)),
        }
    }

    if args.idle {
        watch(&client).await?;
    }

    client.disconnect().await;
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_frame(frame: &ResponseFrame, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(frame)?);
    } else {
        print!("{}", frame.raw());
    }
    Ok(())
}

/// Print changed subsystems until the daemon goes away.
async fn watch(client: &Client) -> Result<()> {
    let mut events = client.subscribe();
    client.idle().await?;
    info!("Waiting for changes");

    loop {
        match events.recv().await {
            Ok(Event::Changed(subsystems)) => {
                for subsystem in subsystems {
                    println!("{}", subsystem);
                }
                client.idle().await?;
            }
            Ok(Event::Error(message)) => warn!("Connection error: {}", message),
            Ok(Event::Closed) | Err(RecvError::Closed) => return Ok(()),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} events", skipped),
        }
    }
}
