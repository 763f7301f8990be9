use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write;
use core::future::Future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::Score;

pub const DEFAULT_CHAIN_ID: u64 = 0x2105;
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xCd0F532029F42F21E18eA1164cF8848cF380B370";
pub const DEFAULT_MINT_METHOD: &str = "mintScoreNFT";

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-3326 "unrecognized chain", the chain has to be added first.
pub const UNKNOWN_CHAIN_CODE: i64 = 4902;

pub const RECEIPT_POLL_MILLIS: u32 = 2_000;
pub const GAS_BUFFER_PERCENT: u128 = 120;

/// Error object returned by an injected wallet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code:?})")]
pub struct WalletRpcError {
    pub code: Option<i64>,
    pub message: String,
}

impl WalletRpcError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Mint failures, the messages are shown to the player as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error("Please install Rabby or MetaMask and try again.")]
    NoWallet,
    #[error("Transaction rejected by user.")]
    UserRejected,
    #[error("❌ Could not switch your wallet to {0}. Please switch networks and try again.")]
    NetworkSwitch(String),
    #[error("❌ Transaction failed: insufficient gas. Please try again with a higher gas limit.")]
    InsufficientGas,
    #[error("❌ Network error. Please check your connection and try again.")]
    Network,
    #[error("❌ Mint failed: {0}. See console for details.")]
    Failed(String),
}

impl MintError {
    /// Maps a wallet error to the matching failure.
    pub fn classify(err: &WalletRpcError) -> Self {
        if err.code == Some(USER_REJECTED_CODE) {
            return Self::UserRejected;
        }

        let message = err.message.to_lowercase();
        const GAS_HINTS: [&str; 4] = [
            "out of gas",
            "exceeds gas limit",
            "gas required exceeds",
            "intrinsic gas too low",
        ];
        if GAS_HINTS.iter().any(|hint| message.contains(hint)) {
            Self::InsufficientGas
        } else if message.contains("network") {
            Self::Network
        } else {
            Self::Failed(err.message.clone())
        }
    }
}

impl From<WalletRpcError> for MintError {
    fn from(err: WalletRpcError) -> Self {
        Self::classify(&err)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            chain_name: "Base Mainnet".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
            currency_name: "ETH".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            explorer_url: "https://basescan.org".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeCurrency<'a> {
    name: &'a str,
    symbol: &'a str,
    decimals: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParams<'a> {
    chain_id: String,
    chain_name: &'a str,
    rpc_urls: [&'a str; 1],
    native_currency: NativeCurrency<'a>,
    block_explorer_urls: [&'a str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainParams {
    chain_id: String,
}

impl ChainConfig {
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// `wallet_addEthereumChain` payload.
    pub fn add_chain_params(&self) -> Value {
        let params = AddChainParams {
            chain_id: self.hex_chain_id(),
            chain_name: &self.chain_name,
            rpc_urls: [self.rpc_url.as_str()],
            native_currency: NativeCurrency {
                name: &self.currency_name,
                symbol: &self.currency_symbol,
                decimals: self.currency_decimals,
            },
            block_explorer_urls: [self.explorer_url.as_str()],
        };
        serde_json::to_value(params).unwrap_or(Value::Null)
    }

    fn switch_chain_params(&self) -> Value {
        let params = SwitchChainParams {
            chain_id: self.hex_chain_id(),
        };
        serde_json::to_value(params).unwrap_or(Value::Null)
    }
}

/// Target contract, its method always takes `(string imageUrl, uint256 score)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    pub method: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            method: DEFAULT_MINT_METHOD.to_string(),
        }
    }
}

impl ContractConfig {
    pub fn signature(&self) -> String {
        format!("{}(string,uint256)", self.method)
    }

    /// Hex encoded call data for `method(image_url, score)`.
    pub fn calldata(&self, image_url: &str, score: Score) -> String {
        let selector = function_selector(&self.signature());
        to_hex(&encode_string_uint256(selector, image_url, score.into()))
    }
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// ABI encoding of a `(string, uint256)` call.
pub fn encode_string_uint256(selector: [u8; 4], text: &str, value: u128) -> Vec<u8> {
    let bytes = text.as_bytes();
    let padded_len = bytes.len().div_ceil(32) * 32;

    let mut out = Vec::with_capacity(4 + 32 * 3 + padded_len);
    out.extend_from_slice(&selector);
    // dynamic argument goes to the tail, right after the two head words
    out.extend_from_slice(&word(0x40));
    out.extend_from_slice(&word(value));
    out.extend_from_slice(&word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(4 + 32 * 3 + padded_len, 0);
    out
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parses a JSON-RPC hex quantity such as `"0x5208"`.
pub fn parse_quantity(value: &Value) -> Option<u128> {
    let digits = value.as_str()?.strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

pub const fn buffered_gas(estimate: u128) -> u128 {
    estimate.saturating_mul(GAS_BUFFER_PERCENT) / 100
}

/// EIP-1193 style provider, usually `window.ethereum`.
pub trait WalletProvider {
    fn is_available(&self) -> bool;

    fn request(&self, method: &str, params: Value) -> impl Future<Output = Result<Value, WalletRpcError>>;

    /// Wait between receipt polls.
    fn sleep(&self, millis: u32) -> impl Future<Output = ()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest<'a> {
    from: &'a str,
    to: &'a str,
    data: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Minter<W> {
    wallet: W,
    chain: ChainConfig,
    contract: ContractConfig,
}

impl<W: WalletProvider> Minter<W> {
    pub fn new(wallet: W, chain: ChainConfig, contract: ContractConfig) -> Self {
        Self {
            wallet,
            chain,
            contract,
        }
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Records `(image_url, score)` on chain and waits for the receipt.
    pub async fn mint(&self, image_url: &str, score: Score) -> Result<MintReceipt, MintError> {
        if !self.wallet.is_available() {
            return Err(MintError::NoWallet);
        }

        let account = self.connect().await?;
        log::debug!("wallet connected: {}", account);

        self.ensure_chain().await?;

        let data = self.contract.calldata(image_url, score);
        let gas_price = self.quantity("eth_gasPrice", vec![]).await?;

        let call = TransactionRequest {
            from: &account,
            to: &self.contract.address,
            data: &data,
            gas: None,
            gas_price: None,
        };
        let estimate = self
            .quantity("eth_estimateGas", vec![to_json(&call)])
            .await?;
        let gas_limit = buffered_gas(estimate);
        log::debug!(
            "estimated gas {}, sending with limit {} at price {}",
            estimate,
            gas_limit,
            gas_price
        );

        let transaction = TransactionRequest {
            gas: Some(format!("{gas_limit:#x}")),
            gas_price: Some(format!("{gas_price:#x}")),
            ..call
        };
        let sent = self
            .wallet
            .request("eth_sendTransaction", Value::Array(vec![to_json(&transaction)]))
            .await?;
        let tx_hash = sent
            .as_str()
            .ok_or_else(|| MintError::Failed("wallet returned no transaction hash".to_string()))?
            .to_string();
        log::info!("mint transaction sent: {}", tx_hash);

        self.wait_for_receipt(tx_hash).await
    }

    async fn connect(&self) -> Result<String, MintError> {
        let accounts = self
            .wallet
            .request("eth_requestAccounts", Value::Array(vec![]))
            .await?;
        accounts
            .as_array()
            .and_then(|accounts| accounts.first())
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or(MintError::NoWallet)
    }

    async fn ensure_chain(&self) -> Result<(), MintError> {
        match self
            .wallet
            .request("eth_chainId", Value::Array(vec![]))
            .await
        {
            Ok(current) if parse_quantity(&current) == Some(self.chain.chain_id.into()) => {
                return Ok(());
            }
            Ok(current) => log::debug!("wallet on chain {}, switching", current),
            Err(err) => log::warn!("could not read wallet chain: {}", err),
        }

        let switch_failed = |err: WalletRpcError| {
            log::error!("network switch failed: {}", err);
            MintError::NetworkSwitch(self.chain.chain_name.clone())
        };

        match self.switch_chain().await {
            Ok(()) => Ok(()),
            Err(err) if err.code == Some(UNKNOWN_CHAIN_CODE) => {
                log::info!("adding {} to the wallet", self.chain.chain_name);
                self.wallet
                    .request(
                        "wallet_addEthereumChain",
                        Value::Array(vec![self.chain.add_chain_params()]),
                    )
                    .await
                    .map_err(switch_failed)?;
                self.switch_chain().await.map_err(switch_failed)
            }
            Err(err) => Err(switch_failed(err)),
        }
    }

    async fn switch_chain(&self) -> Result<(), WalletRpcError> {
        self.wallet
            .request(
                "wallet_switchEthereumChain",
                Value::Array(vec![self.chain.switch_chain_params()]),
            )
            .await
            .map(|_| ())
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<u128, MintError> {
        let value = self.wallet.request(method, Value::Array(params)).await?;
        parse_quantity(&value)
            .ok_or_else(|| MintError::Failed(format!("malformed {method} response {value}")))
    }

    async fn wait_for_receipt(&self, tx_hash: String) -> Result<MintReceipt, MintError> {
        loop {
            let receipt = self
                .wallet
                .request(
                    "eth_getTransactionReceipt",
                    Value::Array(vec![Value::String(tx_hash.clone())]),
                )
                .await?;

            if receipt.is_null() {
                self.wallet.sleep(RECEIPT_POLL_MILLIS).await;
                continue;
            }

            if receipt.get("status").and_then(parse_quantity) == Some(0) {
                return Err(MintError::Failed(format!("transaction {tx_hash} reverted")));
            }

            let block_number = receipt
                .get("blockNumber")
                .and_then(parse_quantity)
                .and_then(|block| u64::try_from(block).ok());
            log::info!("mint confirmed in block {:?}", block_number);
            return Ok(MintReceipt {
                tx_hash,
                block_number,
            });
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
