// Chain access contract and the Aptos fullnode REST implementation.
//
// Transactions are built as JSON entry-function payloads. The node encodes
// the signing message (`/transactions/encode_submission`), the local key
// signs it, and the signed JSON is submitted back. Confirmation is a poll on
// `/transactions/by_hash` bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use money_buddy_core::config::ChainConfig;

use crate::account::{AccountAddress, LocalAccount};
use crate::error::ChainError;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Call descriptors
// ---------------------------------------------------------------------------

/// A Move function reference plus its type and positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFunction {
    pub module: AccountAddress,
    pub module_name: String,
    pub function: String,
    pub type_args: Vec<String>,
    pub args: Vec<Value>,
}

impl EntryFunction {
    pub fn new(
        module: AccountAddress,
        module_name: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            module,
            module_name: module_name.into(),
            function: function.into(),
            type_args: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn type_args<I, S>(mut self, type_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_args = type_args.into_iter().map(Into::into).collect();
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// `0x…::module::function`
    pub fn function_id(&self) -> String {
        format!("{}::{}::{}", self.module, self.module_name, self.function)
    }

    fn payload(&self) -> Value {
        json!({
            "type": "entry_function_payload",
            "function": self.function_id(),
            "type_arguments": self.type_args,
            "arguments": self.args,
        })
    }

    fn view_request(&self) -> Value {
        json!({
            "function": self.function_id(),
            "type_arguments": self.type_args,
            "arguments": self.args,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedTransaction {
    pub hash: String,
    pub version: Option<u64>,
    pub success: bool,
    pub vm_status: String,
}

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sign and submit `call` from `signer`, returning the pending hash.
    async fn submit(&self, signer: &LocalAccount, call: &EntryFunction)
        -> Result<String, ChainError>;

    /// Wait until `hash` is committed. A committed-but-aborted transaction is
    /// an error.
    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ChainError>;

    async fn view(&self, call: &EntryFunction) -> Result<Vec<Value>, ChainError>;

    async fn execute(
        &self,
        signer: &LocalAccount,
        call: &EntryFunction,
    ) -> Result<CommittedTransaction, ChainError> {
        let hash = self.submit(signer, call).await?;
        self.wait_for_transaction(&hash).await
    }
}

// ---------------------------------------------------------------------------
// AptosRestClient
// ---------------------------------------------------------------------------

pub struct AptosRestClient {
    http: reqwest::Client,
    base_url: String,
    max_gas_amount: u64,
    expiration: Duration,
    confirmation_timeout: Duration,
}

impl AptosRestClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_gas_amount: 200_000,
            expiration: Duration::from_secs(60),
            confirmation_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        let mut client = Self::new(reqwest::Client::new(), config.node_url());
        client.max_gas_amount = config.max_gas_amount;
        client.expiration = Duration::from_secs(config.expiration_secs);
        client.confirmation_timeout = Duration::from_secs(config.confirmation_timeout_secs);
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json(&self, path: &str) -> Result<Value, ChainError> {
        let response = self.http.get(self.url(path)).send().await?;
        read_json(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ChainError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        read_json(response).await
    }

    async fn raw_transaction(
        &self,
        sender: AccountAddress,
        call: &EntryFunction,
    ) -> Result<Value, ChainError> {
        let account = self.get_json(&format!("accounts/{sender}")).await?;
        let sequence_number = parse_sequence_number(&account)?;
        let gas = self.get_json("estimate_gas_price").await?;
        let gas_unit_price = parse_gas_estimate(&gas)?;
        let expiration = chrono::Utc::now().timestamp().max(0) as u64 + self.expiration.as_secs();

        Ok(json!({
            "sender": sender.to_hex(),
            "sequence_number": sequence_number.to_string(),
            "max_gas_amount": self.max_gas_amount.to_string(),
            "gas_unit_price": gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": call.payload(),
        }))
    }
}

#[async_trait]
impl ChainClient for AptosRestClient {
    async fn submit(
        &self,
        signer: &LocalAccount,
        call: &EntryFunction,
    ) -> Result<String, ChainError> {
        let raw = self.raw_transaction(signer.address(), call).await?;

        let encoded = self.post_json("transactions/encode_submission", &raw).await?;
        let message = decode_signing_message(&encoded)?;
        let signature = signer.sign(&message);

        let signed = attach_signature(
            raw,
            &signer.public_key_hex(),
            &format!("0x{}", hex::encode(signature.to_bytes())),
        );
        let pending = self.post_json("transactions", &signed).await?;
        let hash = pending
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::Decode("submission response has no hash".into()))?
            .to_string();

        info!(function = %call.function_id(), %hash, "Transaction submitted");
        Ok(hash)
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ChainError> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;
        let path = format!("transactions/by_hash/{hash}");

        loop {
            let response = self.http.get(self.url(&path)).send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                debug!(hash, "Transaction not yet visible");
            } else {
                let body = read_json(response).await?;
                if let Some(committed) = parse_transaction(&body)? {
                    if !committed.success {
                        warn!(hash, vm_status = %committed.vm_status, "Transaction aborted");
                        return Err(ChainError::TransactionFailed {
                            hash: committed.hash,
                            vm_status: committed.vm_status,
                        });
                    }
                    return Ok(committed);
                }
            }

            if tokio::time::Instant::now() + POLL_INTERVAL > deadline {
                return Err(ChainError::Timeout {
                    hash: hash.to_string(),
                    secs: self.confirmation_timeout.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn view(&self, call: &EntryFunction) -> Result<Vec<Value>, ChainError> {
        let body = self.post_json("view", &call.view_request()).await?;
        match body {
            Value::Array(values) => Ok(values),
            other => Err(ChainError::Decode(format!("view returned {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

async fn read_json(response: reqwest::Response) -> Result<Value, ChainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChainError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// The node's `{"message": …}` error text, or the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// u64 fields arrive as decimal strings; accept plain numbers as well.
fn u64_field(value: &Value, field: &str) -> Result<u64, ChainError> {
    match value.get(field) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| ChainError::Decode(format!("{field} is not a u64: {s}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ChainError::Decode(format!("{field} is not a u64: {n}"))),
        _ => Err(ChainError::Decode(format!("missing {field}"))),
    }
}

fn parse_sequence_number(account: &Value) -> Result<u64, ChainError> {
    u64_field(account, "sequence_number")
}

fn parse_gas_estimate(estimate: &Value) -> Result<u64, ChainError> {
    u64_field(estimate, "gas_estimate")
}

fn decode_signing_message(encoded: &Value) -> Result<Vec<u8>, ChainError> {
    let hex_str = encoded
        .as_str()
        .ok_or_else(|| ChainError::Decode("signing message is not a string".into()))?;
    hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| ChainError::Decode(format!("signing message: {e}")))
}

fn attach_signature(mut raw: Value, public_key: &str, signature: &str) -> Value {
    raw["signature"] = json!({
        "type": "ed25519_signature",
        "public_key": public_key,
        "signature": signature,
    });
    raw
}

/// `None` while the transaction is still pending.
fn parse_transaction(body: &Value) -> Result<Option<CommittedTransaction>, ChainError> {
    if body.get("type").and_then(Value::as_str) == Some("pending_transaction") {
        return Ok(None);
    }
    let hash = body
        .get("hash")
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::Decode("transaction has no hash".into()))?;
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| ChainError::Decode("transaction has no success flag".into()))?;

    Ok(Some(CommittedTransaction {
        hash: hash.to_string(),
        version: u64_field(body, "version").ok(),
        success,
        vm_status: body
            .get("vm_status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }))
}
