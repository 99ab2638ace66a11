//! HTTP query helpers.
//!
//! Plain request/response wrappers around the node's HTTP sibling endpoint
//! (the socket URL with `ws` swapped for `http` and `/wsopen` stripped).
//! Stateless apart from the pooled `reqwest::Client`.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, QUERY_TIMEOUT};
use crate::error::ClientError;
use crate::transaction::json::nolan;

#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    base: Url,
}

impl QueryClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = config.http_base_url()?;
        let http = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Balance of `public_key` (hex) in Nolan.
    pub async fn balance(&self, public_key: &str) -> Result<u64, ClientError> {
        let body = self.get_text(&format!("balance/{}", public_key)).await?;
        parse_balance(&body, public_key)
    }

    pub async fn stats(&self) -> Result<Value, ClientError> {
        self.get_json("stats").await
    }

    pub async fn peers(&self) -> Result<Value, ClientError> {
        self.get_json("stats/peers").await
    }

    pub async fn version(&self) -> Result<Value, ClientError> {
        self.get_json("version").await
    }

    /// A block filtered down to the transactions touching `public_key`.
    pub async fn lite_block(&self, hash: &str, public_key: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("lite-block/{}/{}", hash, public_key))
            .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Query(format!("bad query path {}: {}", path, e)))
    }

    async fn get_text(&self, path: &str) -> Result<String, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, "query");
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Bodies are parsed by `serde_json` directly so large integers keep
    /// their exact value.
    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::Query(format!("{} returned invalid JSON: {}", path, e)))
    }
}

/// Interprets a `/balance` body: JSON `{"balance": ..}` if it is one,
/// otherwise the plain-text slip snapshot.
pub fn parse_balance(body: &str, public_key: &str) -> Result<u64, ClientError> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let balance = map
            .get("balance")
            .ok_or_else(|| ClientError::Query("balance response without `balance`".into()))?;
        return nolan::deserialize(balance)
            .map_err(|e| ClientError::Query(format!("bad balance value: {}", e)));
    }
    parse_balance_snapshot(body, public_key)
}

/// Sums the amounts of every snapshot record owned by `public_key`.
///
/// Records are whitespace-separated `publicKey nonce index type amount uuid`,
/// one per line. Blank and short lines are skipped; a bad amount on a
/// matching line is an error, as is a total beyond u64.
pub fn parse_balance_snapshot(snapshot: &str, public_key: &str) -> Result<u64, ClientError> {
    let mut total: u64 = 0;
    for line in snapshot.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[0] != public_key {
            continue;
        }
        let amount: u64 = fields[4]
            .parse()
            .map_err(|_| ClientError::Query(format!("bad amount `{}` in snapshot", fields[4])))?;
        total = total
            .checked_add(amount)
            .ok_or_else(|| ClientError::Query("balance overflows 64 bits".into()))?;
    }
    Ok(total)
}
