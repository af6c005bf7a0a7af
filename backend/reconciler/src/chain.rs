//! Ethereum JSON-RPC client.
//!
//! The chain is the authoritative store; everything local is a mirror. This
//! module exposes the three capabilities the rest of the service needs —
//! current height, log queries, and confirmed contract calls — behind the
//! [`ChainClient`] trait so the reconciler and lifecycle manager can be
//! exercised against a mock in tests.
//!
//! Transactions are signed by the node (`eth_sendTransaction` with an
//! unlocked account, as on the Ganache deployment this service targets); the
//! caller's credential is its unlocked `from` address.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::abi::{self, CallBuilder};
use crate::config::Config;
use crate::events::{self, ChainEvent, EventKind};

/// How often we poll for a transaction receipt while waiting for it to mine.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Chain-call failures, each a distinct user-visible kind. None of these are
/// retried automatically; the caller decides.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The contract reverted the call (receipt status 0).
    #[error("Contract rejected the call: {0}")]
    ContractLogic(String),

    /// The node no longer knows the transaction at all.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// The transaction is still pending past the configured deadline.
    /// Retryable but not yet failed.
    #[error("Timed out waiting for transaction: {0}")]
    Timeout(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ─────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One entry from `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: Option<String>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    status: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Contract calls
// ─────────────────────────────────────────────────────────

/// The RealEstate contract functions the lifecycle manager submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    ListProperty {
        price_wei: u128,
        details: String,
        property_type: u8,
        area: u64,
        bedrooms: u64,
        bathrooms: u64,
        agent: Option<String>,
        agent_commission_bps: u64,
    },
    SubmitOffer {
        property_id: i64,
        expires_in_secs: u64,
    },
    AcceptOffer {
        property_id: i64,
        buyer: String,
    },
    UpdateInspection {
        property_id: i64,
        passed: bool,
    },
    CompleteTransaction {
        property_id: i64,
    },
}

impl ContractCall {
    /// ABI-encode the call into `selector ++ args` calldata.
    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        match self {
            Self::ListProperty {
                price_wei,
                details,
                property_type,
                area,
                bedrooms,
                bathrooms,
                agent,
                agent_commission_bps,
            } => Ok(CallBuilder::new(
                "listProperty(uint256,string,uint8,uint256,uint256,uint256,address,uint256)",
            )
            .uint(*price_wei)
            .string(details)
            .uint(u128::from(*property_type))
            .uint(u128::from(*area))
            .uint(u128::from(*bedrooms))
            .uint(u128::from(*bathrooms))
            .address_or_zero(agent.as_deref())?
            .uint(u128::from(*agent_commission_bps))
            .build()),
            Self::SubmitOffer {
                property_id,
                expires_in_secs,
            } => Ok(CallBuilder::new("submitOffer(uint256,uint256)")
                .uint(*property_id as u128)
                .uint(u128::from(*expires_in_secs))
                .build()),
            Self::AcceptOffer { property_id, buyer } => {
                Ok(CallBuilder::new("acceptOffer(uint256,address)")
                    .uint(*property_id as u128)
                    .address(buyer)?
                    .build())
            }
            Self::UpdateInspection {
                property_id,
                passed,
            } => Ok(CallBuilder::new("updateInspectionStatus(uint256,bool)")
                .uint(*property_id as u128)
                .boolean(*passed)
                .build()),
            Self::CompleteTransaction { property_id } => {
                Ok(CallBuilder::new("completeTransaction(uint256)")
                    .uint(*property_id as u128)
                    .build())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Client trait
// ─────────────────────────────────────────────────────────

/// The blockchain collaborator contract. Implemented by [`EthRpcClient`] for
/// real nodes and by the test mock.
pub trait ChainClient: Send + Sync {
    /// Current chain head height.
    fn current_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Fetch and decode all logs of one kind emitted by the contract in the
    /// inclusive block range.
    fn query_logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<ChainEvent>, ChainError>> + Send;

    /// Submit a contract call from an unlocked account and block until it is
    /// mined, returning the transaction hash.
    fn submit_call(
        &self,
        from: &str,
        call: &ContractCall,
        value_wei: Option<u128>,
    ) -> impl Future<Output = Result<String, ChainError>> + Send;
}

// ─────────────────────────────────────────────────────────
// JSON-RPC implementation
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EthRpcClient {
    http: Client,
    rpc_url: String,
    contract_address: String,
    tx_timeout: Duration,
}

impl EthRpcClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            rpc_url: config.rpc_url.clone(),
            contract_address: config.contract_address.clone(),
            tx_timeout: Duration::from_secs(config.tx_timeout_secs),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            // Revert reasons surface as RPC errors on eth_sendTransaction.
            if err.message.contains("revert") {
                return Err(ChainError::ContractLogic(err.message));
            }
            return Err(ChainError::Rpc(format!("{} ({})", err.message, err.code)));
        }
        body.result
            .ok_or_else(|| ChainError::Rpc(format!("empty result from {method}")))
    }

    /// Poll for the receipt until mined or the deadline passes, then map the
    /// outcome onto the error taxonomy.
    async fn await_receipt(&self, tx_hash: &str) -> Result<String, ChainError> {
        let deadline = tokio::time::Instant::now() + self.tx_timeout;

        while tokio::time::Instant::now() < deadline {
            let result = self
                .rpc("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !result.is_null() {
                let receipt: Receipt =
                    serde_json::from_value(result).map_err(|e| ChainError::Rpc(e.to_string()))?;
                return match receipt.status.as_deref() {
                    Some("0x0") => Err(ChainError::ContractLogic(format!(
                        "transaction {tx_hash} reverted"
                    ))),
                    _ => Ok(tx_hash.to_string()),
                };
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        // Deadline passed: distinguish "dropped" from "still pending".
        let pending = self
            .rpc("eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        if pending.is_null() {
            Err(ChainError::TransactionNotFound(tx_hash.to_string()))
        } else {
            Err(ChainError::Timeout(tx_hash.to_string()))
        }
    }
}

impl ChainClient for EthRpcClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        let result = self.rpc("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(abi::parse_hex_u64)
            .ok_or_else(|| ChainError::Rpc(format!("bad block number: {result}")))
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ChainEvent>, ChainError> {
        let filter = json!([{
            "address": self.contract_address,
            "fromBlock": abi::to_hex_u64(from_block),
            "toBlock": abi::to_hex_u64(to_block),
            "topics": [format!("0x{}", hex::encode(kind.topic0()))],
        }]);

        let result = self.rpc("eth_getLogs", filter).await?;
        let raw: Vec<RawLog> =
            serde_json::from_value(result).map_err(|e| ChainError::Rpc(e.to_string()))?;

        debug!(
            kind = kind.as_str(),
            from_block,
            to_block,
            count = raw.len(),
            "Fetched logs"
        );

        Ok(raw
            .iter()
            .filter_map(|log| events::decode_log(kind, log))
            .collect())
    }

    async fn submit_call(
        &self,
        from: &str,
        call: &ContractCall,
        value_wei: Option<u128>,
    ) -> Result<String, ChainError> {
        let data = call.encode()?;
        let mut tx = json!({
            "from": from,
            "to": self.contract_address,
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(value) = value_wei {
            tx["value"] = json!(abi::to_hex_u128(value));
        }

        let result = self.rpc("eth_sendTransaction", json!([tx])).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| ChainError::Rpc(format!("bad transaction hash: {result}")))?
            .to_string();

        debug!(%tx_hash, "Submitted transaction, awaiting receipt");
        self.await_receipt(&tx_hash).await
    }
}
