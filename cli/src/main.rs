// Copyright (c) 2026 wirepeer contributors. MIT License.
// See LICENSE for details.

//! # wirepeer
//!
//! Entry point for the `wirepeer` binary. Parses CLI arguments, initializes
//! logging and dispatches to one subcommand:
//!
//! - `keygen`  — create a wallet file
//! - `listen`  — connect and stream node traffic to stdout
//! - `send`    — sign and send a transfer
//! - `balance` — query a balance over HTTP
//! - `stats`   — query node or peer statistics over HTTP
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::signal;
use tokio::sync::mpsc;

use wirepeer_protocol::config::{ClientConfig, PROTOCOL_VERSION};
use wirepeer_protocol::crypto::keys::PublicKey;
use wirepeer_protocol::network::{Channel, ClientEvent, SyncType};
use wirepeer_protocol::query::QueryClient;
use wirepeer_protocol::transaction::Slip;
use wirepeer_protocol::wallet::Wallet;
use wirepeer_protocol::PeerClient;

use cli::{Commands, SyncArg, WirepeerCli};

const DEFAULT_LOG_LEVEL: &str = "wirepeer=info,wirepeer_protocol=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WirepeerCli::parse();
    logging::init_logging(DEFAULT_LOG_LEVEL, cli.log_format);

    let mut config = ClientConfig::new(cli.url.clone());
    config
        .validate()
        .with_context(|| format!("bad --url {}", cli.url))?;

    match cli.command {
        Commands::Keygen(args) => keygen(&cli.wallet, args),
        Commands::Listen(args) => {
            config.synctype = match args.synctype {
                SyncArg::None => SyncType::None,
                SyncArg::Lite => SyncType::Lite,
                SyncArg::Full => SyncType::Full,
            };
            config.auto_reconnect = !args.no_reconnect;
            listen(config, load_wallet(&cli.wallet)?, args.tags).await
        }
        Commands::Send(args) => send(config, load_wallet(&cli.wallet)?, args).await,
        Commands::Balance(args) => {
            let public_key = match args.public_key {
                Some(pk) => pk,
                None => load_wallet(&cli.wallet)?.public_key_hex(),
            };
            let balance = QueryClient::new(&config)?
                .balance(&public_key)
                .await
                .context("balance query failed")?;
            println!("{}", balance);
            Ok(())
        }
        Commands::Stats(args) => {
            let query = QueryClient::new(&config)?;
            let value = if args.peers {
                query.peers().await
            } else {
                query.stats().await
            }
            .context("stats query failed")?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn load_wallet(path: &std::path::Path) -> Result<Wallet> {
    Wallet::load(path).with_context(|| {
        format!(
            "failed to load wallet from {} (run `wirepeer keygen` first)",
            path.display()
        )
    })
}

/// Generates a wallet file. Refuses to clobber an existing one unless forced.
fn keygen(default_path: &std::path::Path, args: cli::KeygenArgs) -> Result<()> {
    let path = args.out.as_deref().unwrap_or(default_path);
    if path.exists() && !args.force {
        bail!(
            "{} already exists, pass --force to overwrite",
            path.display()
        );
    }

    let wallet = Wallet::generate();
    wallet
        .save(path)
        .with_context(|| format!("failed to write wallet to {}", path.display()))?;

    tracing::info!(path = %path.display(), "wallet generated");
    println!("Wallet written to {}", path.display());
    println!("  Public key : {}", wallet.public_key_hex());
    Ok(())
}

/// Connects and prints every event as one JSON line until Ctrl+C.
async fn listen(config: ClientConfig, wallet: Wallet, tags: Vec<String>) -> Result<()> {
    let client = PeerClient::new(config, wallet)?;

    let mut channels = vec![
        Channel::Transaction,
        Channel::Block,
        Channel::Connected,
        Channel::Disconnected,
        Channel::Error,
    ];
    channels.extend(tags.into_iter().map(Channel::Message));

    let (tx, mut events) = mpsc::unbounded_channel();
    for channel in channels {
        let mut subscription = client.subscribe(channel);
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    client.connect().await.context("failed to connect")?;
    tracing::info!(state = ?client.state(), "listening, Ctrl+C to stop");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{}", render(&event)),
                None => break,
            },
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    client.disconnect().await?;
    Ok(())
}

/// One JSON line per event.
fn render(event: &ClientEvent) -> Value {
    match event {
        ClientEvent::Transaction(tx) => json!({
            "event": "transaction",
            "data": tx.to_json().unwrap_or(Value::Null),
        }),
        ClientEvent::Block(data) => json!({"event": "block", "data": data}),
        ClientEvent::Connected => json!({"event": "connected"}),
        ClientEvent::Disconnected => json!({"event": "disconnected"}),
        ClientEvent::Error(message) => json!({"event": "error", "message": message}),
        ClientEvent::Message { tag, data } => {
            json!({"event": format!("message:{}", tag), "data": data})
        }
    }
}

/// Builds a single-input, single-output transfer, signs it and sends it.
async fn send(config: ClientConfig, wallet: Wallet, args: cli::SendArgs) -> Result<()> {
    let recipient = PublicKey::from_hex(&args.to).context("invalid --to public key")?;
    let client = PeerClient::new(config, wallet.clone())?;

    let mut tx = client
        .new_transaction()
        .add_from(Slip::new(wallet.public_key(), args.amount))
        .add_to(Slip::new(recipient, args.amount));
    if let Some(data) = args.data {
        tx = tx.set_data(data.into_bytes());
    }
    client.sign_transaction(&mut tx)?;

    client.connect().await.context("failed to connect")?;
    client
        .send_transaction(&tx)
        .await
        .context("failed to send transaction")?;
    tracing::info!(amount = args.amount, to = %recipient.to_hex(), "transaction sent");
    println!("{}", serde_json::to_string_pretty(&tx.to_json()?)?);

    client.disconnect().await?;
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("wirepeer  {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
