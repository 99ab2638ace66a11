//! # Client Configuration & Protocol Constants
//!
//! Every magic number the client shares with the remote peer lives here.
//! The remote implementation is not ours to negotiate with, so these values
//! are part of the wire contract: change one and the handshake, the codec,
//! or the query endpoints stop lining up.
//!
//! [`ClientConfig`] carries the per-instance knobs (endpoint, timeouts,
//! reconnection policy, advertised peer identity). The CLI fills it from
//! flags and environment variables; library users build it directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::network::handshake::SyncType;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Version string advertised in the handshake `peer.version` field.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Advertised `peer.protocol` when the socket URL is plain `ws://`.
pub const PROTOCOL_HTTP: &str = "http";

/// Advertised `peer.protocol` when the socket URL is `wss://`.
pub const PROTOCOL_HTTPS: &str = "https";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 seed length in bytes. The first half of a private key.
pub const SEED_LENGTH: usize = 32;

/// Private key length in bytes: the 32-byte seed followed by the 32-byte
/// public key (the NaCl "expanded" layout the remote peer uses).
pub const PRIVATE_KEY_LENGTH: usize = 64;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Bytes per serialized slip: public key (32) ‖ amount (8) ‖ type (1).
pub const SLIP_SIZE: usize = PUBLIC_KEY_LENGTH + 8 + 1;

/// Fixed-size portion of a serialized transaction without slips, data, or
/// signature: timestamp (8) + from-count (4) + to-count (4) + data-length (4)
/// + type (1).
pub const TX_FIXED_SIZE: usize = 8 + 4 + 4 + 4 + 1;

/// Largest integer a JavaScript peer can hold without losing precision.
/// Locally generated handshake challenges stay below this.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Path suffix of the socket endpoint. Stripped when deriving the HTTP
/// sibling used by the query helpers.
pub const SOCKET_PATH_SUFFIX: &str = "/wsopen";

/// Default socket endpoint for a local node.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:12101/wsopen";

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// How long `connect()` waits for the handshake to reach `Ready`.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Delay between automatic reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Automatic reconnection attempts before the manager gives up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Timeout applied to every HTTP query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration problems detected by [`ClientConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid socket url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Per-client settings.
///
/// Timeouts are stored as milliseconds so the struct round-trips through
/// JSON without a custom `Duration` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Socket endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Readiness deadline for `connect()`, measured from the call.
    pub handshake_timeout_ms: u64,
    /// Reconnect after an unexpected close.
    pub auto_reconnect: bool,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay_ms: u64,
    /// Attempts allowed before reconnection stops.
    pub max_reconnect_attempts: u32,
    /// Sync preference advertised in the handshake.
    pub synctype: SyncType,
    /// Host advertised in `peer.host`. Empty for a client that accepts no
    /// inbound connections.
    pub host: String,
    /// Port advertised in `peer.port`. Zero for the same reason.
    pub port: u16,
    /// Extra public keys advertised in `peer.keylist`.
    pub keylist: Vec<String>,
    /// Application modules advertised in the handshake.
    pub modules: Vec<String>,
    /// Services advertised in the handshake.
    pub services: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            handshake_timeout_ms: HANDSHAKE_TIMEOUT.as_millis() as u64,
            auto_reconnect: true,
            reconnect_delay_ms: RECONNECT_DELAY.as_millis() as u64,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            synctype: SyncType::Lite,
            host: String::new(),
            port: 0,
            keylist: Vec::new(),
            modules: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Default settings pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// The handshake deadline as a `Duration`.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// The reconnect delay as a `Duration`.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Parses the socket URL and checks the scheme.
    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme `{}`, expected ws or wss", other),
            }),
        }
    }

    /// Checks the configuration without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_url().map(|_| ())
    }

    /// Protocol name advertised in `peer.protocol`, following the socket
    /// scheme.
    pub fn advertised_protocol(&self) -> &'static str {
        if self.url.starts_with("wss://") {
            PROTOCOL_HTTPS
        } else {
            PROTOCOL_HTTP
        }
    }

    /// The HTTP sibling of the socket endpoint: `ws → http`, `wss → https`,
    /// with the socket path suffix stripped.
    pub fn http_base_url(&self) -> Result<Url, ConfigError> {
        let socket = self.socket_url()?;
        let scheme = if socket.scheme() == "wss" {
            "https"
        } else {
            "http"
        };

        let path = socket.path();
        let path = path.strip_suffix(SOCKET_PATH_SUFFIX).unwrap_or(path);
        let path = path.trim_end_matches('/');

        let authority = match socket.port() {
            Some(port) => format!("{}:{}", socket.host_str().unwrap_or_default(), port),
            None => socket.host_str().unwrap_or_default().to_string(),
        };

        Url::parse(&format!("{}://{}{}/", scheme, authority, path)).map_err(|e| {
            ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(PUBLIC_KEY_LENGTH, 32);
        assert_eq!(PRIVATE_KEY_LENGTH, SEED_LENGTH + PUBLIC_KEY_LENGTH);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(SLIP_SIZE, 41);
        assert_eq!(TX_FIXED_SIZE, 21);
    }

    #[test]
    fn test_default_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.handshake_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert!(config.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_base_url_plain() {
        let config = ClientConfig::new("ws://localhost:12101/wsopen");
        let base = config.http_base_url().unwrap();
        assert_eq!(base.as_str(), "http://localhost:12101/");
        assert_eq!(base.join("stats").unwrap().as_str(), "http://localhost:12101/stats");
    }

    #[test]
    fn test_http_base_url_tls_with_prefix() {
        let config = ClientConfig::new("wss://node.example.org/peer/wsopen");
        let base = config.http_base_url().unwrap();
        assert_eq!(base.as_str(), "https://node.example.org/peer/");
        assert_eq!(config.advertised_protocol(), PROTOCOL_HTTPS);
    }

    #[test]
    fn test_rejects_non_socket_scheme() {
        let config = ClientConfig::new("http://localhost:12101");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(ClientConfig::new("not a url").validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url":"ws://10.0.0.1:9000/wsopen","synctype":"full"}"#)
                .unwrap();
        assert_eq!(config.url, "ws://10.0.0.1:9000/wsopen");
        assert_eq!(config.synctype, SyncType::Full);
        assert_eq!(config.reconnect_delay_ms, 5_000);
    }
}
