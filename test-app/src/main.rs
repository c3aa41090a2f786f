// migw command line tool -- talk to a gateway from the shell.
//
// Usage:
//   migw-cli --host 192.168.1.20 monitor --seconds 60
//   migw-cli --host 192.168.1.20 send get_doorbell_push --expect-result
//   migw-cli --host 192.168.1.20 send set_doorbell_volume --params '[20]'
//   migw-cli --host 192.168.1.20 doorbell push on
//   migw-cli --host 192.168.1.20 doorbell sound --sound 3 --volume 40
//   migw-cli --host 192.168.1.20 light --color ff8800 --brightness 30

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use migw::builder::{DEFAULT_PORT, DEFAULT_REPLY_TIMEOUT};
use migw::devices::parse_color;
use migw::{Gateway, GatewayBuilder, Notification};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// migw command line tool -- send commands to a gateway and watch its traffic.
#[derive(Parser)]
#[command(name = "migw-cli", version, about)]
struct Cli {
    /// Gateway host name or IP address.
    #[arg(long)]
    host: String,

    /// Gateway UDP port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log protocol traffic at debug level (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every notification as a JSON line.
    Monitor {
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Send one command and print its result.
    Send {
        /// Remote method name.
        method: String,

        /// Parameters as JSON (e.g. '[1, "3"]').
        #[arg(long)]
        params: Option<String>,

        /// Treat a `result` in the reply window as the answer.
        #[arg(long)]
        expect_result: bool,
    },

    /// Doorbell operations.
    Doorbell {
        #[command(subcommand)]
        action: DoorbellAction,
    },

    /// Set the light ring color and/or brightness.
    Light {
        /// Color as six hex digits (e.g. ff8800).
        #[arg(long)]
        color: Option<String>,

        /// Brightness, 0-255.
        #[arg(long)]
        brightness: Option<u8>,
    },
}

#[derive(Subcommand)]
enum DoorbellAction {
    /// Read or change the push notification setting.
    Push { value: PushValue },

    /// Change the tone and/or volume.
    Sound {
        #[arg(long)]
        sound: Option<u32>,

        #[arg(long)]
        volume: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PushValue {
    Get,
    On,
    Off,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("migw={level},migw_transport={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_notification(n: &Notification) {
    println!("{}", json!({"topic": n.topic().as_str(), "payload": n.payload()}));
}

async fn connect(cli: &Cli) -> Result<(Gateway, mpsc::UnboundedReceiver<Notification>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let gateway = GatewayBuilder::new()
        .host(&cli.host)
        .port(cli.port)
        .on_notification(move |n: Notification| {
            let _ = tx.send(n);
        })
        .build()
        .await
        .with_context(|| format!("failed to open gateway at {}:{}", cli.host, cli.port))?;
    gateway.start().context("failed to start gateway worker")?;
    tracing::debug!(host = %cli.host, port = cli.port, "Gateway worker started");
    Ok((gateway, rx))
}

/// Wait for queued commands to go out, printing notifications meanwhile.
async fn settle(gateway: &Gateway, rx: &mut mpsc::UnboundedReceiver<Notification>) {
    while gateway.pending_commands() > 0 {
        drain(rx);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    // Give the last command its reply window.
    tokio::time::sleep(DEFAULT_REPLY_TIMEOUT + Duration::from_millis(200)).await;
    drain(rx);
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) {
    while let Ok(n) = rx.try_recv() {
        print_notification(&n);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_monitor(
    gateway: &Gateway,
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    seconds: Option<u64>,
) -> Result<()> {
    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(n) = rx.recv() => print_notification(&n),
            _ = &mut deadline => break,
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    if !gateway.is_online() {
        eprintln!("Gateway is offline");
    }
    Ok(())
}

async fn cmd_send(
    gateway: &Gateway,
    method: &str,
    params: Option<&str>,
    expect_result: bool,
) -> Result<()> {
    let params: Option<Value> = params
        .map(serde_json::from_str)
        .transpose()
        .context("--params is not valid JSON")?;

    match gateway.send_cmd(method, params, expect_result).await? {
        Some(result) => println!("{}", result.result),
        None if expect_result => bail!("no result for {method}"),
        None => println!("sent {method}"),
    }
    Ok(())
}

async fn cmd_doorbell(gateway: &Gateway, action: &DoorbellAction) -> Result<()> {
    let doorbell = gateway.doorbell();
    match action {
        DoorbellAction::Push { value } => match value {
            PushValue::Get => doorbell.get_push().await?,
            PushValue::On => doorbell.set_push("on").await?,
            PushValue::Off => doorbell.set_push("off").await?,
        },
        DoorbellAction::Sound { sound, volume } => {
            if sound.is_none() && volume.is_none() {
                bail!("nothing to change: pass --sound and/or --volume");
            }
            doorbell.set_sound(*sound, *volume).await?;
        }
    }
    Ok(())
}

async fn cmd_light(gateway: &Gateway, color: Option<&str>, brightness: Option<u8>) -> Result<()> {
    let color = color.map(parse_color).transpose()?;
    let ring = gateway.light_ring();
    match (color, brightness) {
        (Some(c), Some(b)) => ring.set_all(c, b).await?,
        (Some(c), None) => ring.set_color(c).await?,
        (None, Some(b)) => ring.set_brightness(b).await?,
        (None, None) => bail!("nothing to change: pass --color and/or --brightness"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (gateway, mut rx) = connect(&cli).await?;

    let result = match &cli.command {
        Command::Monitor { seconds } => cmd_monitor(&gateway, &mut rx, *seconds).await,
        Command::Send {
            method,
            params,
            expect_result,
        } => cmd_send(&gateway, method, params.as_deref(), *expect_result).await,
        Command::Doorbell { action } => cmd_doorbell(&gateway, action).await,
        Command::Light { color, brightness } => {
            cmd_light(&gateway, color.as_deref(), *brightness).await
        }
    };

    // Controller commands only queue; let them reach the gateway.
    if result.is_ok() && matches!(cli.command, Command::Doorbell { .. } | Command::Light { .. }) {
        settle(&gateway, &mut rx).await;
    }
    gateway.shutdown().await;
    result
}
