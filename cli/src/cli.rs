//! # CLI Interface
//!
//! Defines the command-line argument structure for `wirepeer` using `clap`
//! derive. Connection and wallet options are global so every subcommand
//! accepts them in the same place.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use wirepeer_protocol::config::DEFAULT_URL;

use crate::logging::LogFormat;

/// Peer client for a node's WebSocket wire protocol.
///
/// Generates wallets, connects and authenticates to a node, streams its
/// traffic, sends signed transactions and runs the node's HTTP queries.
#[derive(Parser, Debug)]
#[command(
    name = "wirepeer",
    about = "Peer wire-protocol client",
    version,
    propagate_version = true
)]
pub struct WirepeerCli {
    /// Node socket endpoint (`ws://` or `wss://`).
    #[arg(long, short = 'u', global = true, env = "WIREPEER_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Path to the wallet JSON file.
    #[arg(
        long,
        short = 'w',
        global = true,
        env = "WIREPEER_WALLET",
        default_value = "wallet.json"
    )]
    pub wallet: PathBuf,

    /// Log output format.
    #[arg(long, global = true, env = "WIREPEER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new wallet and write it to the wallet path.
    Keygen(KeygenArgs),
    /// Connect, complete the handshake and print traffic until Ctrl+C.
    Listen(ListenArgs),
    /// Build, sign and send a transfer.
    Send(SendArgs),
    /// Print a balance in Nolan.
    Balance(BalanceArgs),
    /// Print the node's statistics.
    Stats(StatsArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Write here instead of the global wallet path.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Overwrite an existing wallet file.
    #[arg(long)]
    pub force: bool,
}

/// Sync preference advertised to the node.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncArg {
    None,
    Lite,
    Full,
}

/// Arguments for the `listen` subcommand.
#[derive(Parser, Debug)]
pub struct ListenArgs {
    /// What the node should relay to us.
    #[arg(long, value_enum, default_value_t = SyncArg::Lite)]
    pub synctype: SyncArg,

    /// Extra request tags to print, besides transactions and blocks.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Do not reconnect when the node drops the socket.
    #[arg(long)]
    pub no_reconnect: bool,
}

/// Arguments for the `send` subcommand.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Recipient public key, hex.
    #[arg(long)]
    pub to: String,

    /// Amount in Nolan.
    #[arg(long)]
    pub amount: u64,

    /// Optional UTF-8 payload.
    #[arg(long)]
    pub data: Option<String>,
}

/// Arguments for the `balance` subcommand.
#[derive(Parser, Debug)]
pub struct BalanceArgs {
    /// Key to look up. Defaults to the wallet's own key.
    #[arg(long)]
    pub public_key: Option<String>,
}

/// Arguments for the `stats` subcommand.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Print the peer list instead of the node statistics.
    #[arg(long)]
    pub peers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        WirepeerCli::command().debug_assert();
    }

    #[test]
    fn send_parses_amount_and_globals_after_subcommand() {
        let cli = WirepeerCli::try_parse_from([
            "wirepeer",
            "send",
            "--to",
            "ab",
            "--amount",
            "18446744073709551615",
            "--url",
            "wss://node.example.org/wsopen",
        ])
        .unwrap();
        assert_eq!(cli.url, "wss://node.example.org/wsopen");
        match cli.command {
            Commands::Send(args) => assert_eq!(args.amount, u64::MAX),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn listen_collects_repeated_tags() {
        let cli =
            WirepeerCli::try_parse_from(["wirepeer", "listen", "--tag", "peers", "--tag", "stats"])
                .unwrap();
        match cli.command {
            Commands::Listen(args) => {
                assert_eq!(args.tags, vec!["peers", "stats"]);
                assert_eq!(args.synctype, SyncArg::Lite);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
