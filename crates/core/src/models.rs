use serde::{Deserialize, Serialize};

use crate::ContractAddress;

// ─── Contract ───────────────────────────────────────────────────────────────

/// Token standard inferred from a verified contract's ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Contract,
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
}

impl TokenType {
    /// Fungible or non-fungible token, as opposed to a plain contract.
    pub fn is_token(self) -> bool {
        matches!(self, TokenType::Erc20 | TokenType::Erc721)
    }
}

/// Identity and verification metadata for a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub address: ContractAddress,
    pub name: String,
    pub compiler: String,
    pub verified: bool,
    pub token_type: TokenType,
    pub optimization_used: bool,
    pub runs: String,
}

// ─── Transaction ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

/// A native-asset transaction touching the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Ether value, already scaled from wei.
    pub value: String,
    pub gas_used: u64,
    pub gas_price: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub status: TxStatus,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

// ─── TokenTransfer ──────────────────────────────────────────────────────────

/// A token balance movement emitted by some token contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Token amount scaled by `token_decimal`.
    pub value: String,
    pub token_symbol: String,
    pub token_name: String,
    pub token_decimal: u8,
    pub contract_address: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub block_number: u64,
}

// ─── Pages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: usize,
    pub page: u32,
}

impl TransactionPage {
    pub fn new(transactions: Vec<Transaction>, page: u32) -> Self {
        Self {
            total: transactions.len(),
            transactions,
            page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPage {
    pub transfers: Vec<TokenTransfer>,
    pub total: usize,
    pub page: u32,
}

impl TransferPage {
    pub fn new(transfers: Vec<TokenTransfer>, page: u32) -> Self {
        Self {
            total: transfers.len(),
            transfers,
            page,
        }
    }
}

// ─── PriceInfo ──────────────────────────────────────────────────────────────

/// USD market data for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    pub price: f64,
    pub price_change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
