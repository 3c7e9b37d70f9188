//! Etherscan v2 client: contract metadata, transaction list and token transfers.

use contractscope_core::{
    AppError, ContractAddress, Settings,
    models::{ContractSummary, TokenTransfer, Transaction, TxStatus},
};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::abi::{UNVERIFIED_ABI, classify_abi};
use crate::http::{self, RATE_LIMITED};
use crate::units::{ETHER_DECIMALS, scale_units};

pub const CONTRACT_NOT_FOUND: &str = "Contract not found";
pub const NO_TRANSACTIONS: &str = "No transactions found";
pub const NO_TRANSFERS: &str = "No token transfers found";

/// Decimals assumed when a transfer row does not report any.
const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Thin client over the Etherscan v2 `api` endpoint for one chain.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: Client,
    base_url: String,
    chain_id: u64,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(settings: &Settings) -> eyre::Result<Self> {
        Ok(Self {
            http: http::build_client(settings.upstream_timeout())?,
            base_url: settings.etherscan_api_url.clone(),
            chain_id: settings.chain_id,
            api_key: settings.etherscan_api_key.clone(),
        })
    }

    /// `module=contract&action=getsourcecode`, reshaped into a summary.
    pub async fn contract(&self, address: &ContractAddress) -> Result<ContractSummary, AppError> {
        let envelope = self.call("contract", "getsourcecode", address, Vec::new()).await?;
        let rows: Vec<RawSourceCode> = envelope.into_rows(CONTRACT_NOT_FOUND)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(CONTRACT_NOT_FOUND.into()))?;

        let summary = decode_contract(address, row);
        tracing::info!(address = %address, name = %summary.name, token_type = ?summary.token_type, "Contract found");
        Ok(summary)
    }

    /// `module=account&action=txlist`, newest first.
    pub async fn transactions(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>, AppError> {
        let envelope = self
            .call("account", "txlist", address, page_params(page, offset))
            .await?;
        let rows: Vec<RawTransaction> = envelope.into_rows(NO_TRANSACTIONS)?;
        Ok(decode_rows(rows, decode_transaction, "transaction"))
    }

    /// `module=account&action=tokentx`, newest first.
    pub async fn transfers(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<Vec<TokenTransfer>, AppError> {
        let envelope = self
            .call("account", "tokentx", address, page_params(page, offset))
            .await?;
        let rows: Vec<RawTransfer> = envelope.into_rows(NO_TRANSFERS)?;
        Ok(decode_rows(rows, decode_transfer, "token transfer"))
    }

    async fn call(
        &self,
        module: &str,
        action: &str,
        address: &ContractAddress,
        extra: Vec<(&'static str, String)>,
    ) -> Result<Envelope, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("ETHERSCAN_API_KEY is not set".into()))?;

        let mut query = vec![
            ("chainid", self.chain_id.to_string()),
            ("module", module.to_string()),
            ("action", action.to_string()),
            ("address", address.to_string()),
        ];
        query.extend(extra);
        query.push(("apikey", api_key.to_string()));

        tracing::debug!(module, action, address = %address, "Calling Etherscan");

        let response = self
            .http
            .get(&self.base_url)
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await
            .map_err(http::request_error)?;
        let response = http::check_status(response)?;

        response
            .json::<Envelope>()
            .await
            .map_err(|e| AppError::Decode(format!("malformed Etherscan response: {e}")))
    }
}

fn page_params(page: u32, offset: u32) -> Vec<(&'static str, String)> {
    vec![
        ("page", page.to_string()),
        ("offset", offset.to_string()),
        ("sort", "desc".to_string()),
    ]
}

// ─── Envelope ───────────────────────────────────────────────────────────────

/// Every Etherscan response: `status` is `"1"` on success, `result` holds the rows
/// or, on failure, a human-readable reason.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl Envelope {
    fn into_rows<T: DeserializeOwned>(self, miss: &str) -> Result<Vec<T>, AppError> {
        if self.status != "1" {
            let detail = match &self.result {
                serde_json::Value::String(reason) => reason.clone(),
                _ => self.message.clone(),
            };
            if http::mentions_rate_limit(&detail) || http::mentions_rate_limit(&self.message) {
                tracing::warn!(detail = %detail, "Etherscan rate limit reached");
                return Err(AppError::RateLimited(RATE_LIMITED.into()));
            }
            tracing::debug!(detail = %detail, "Etherscan reported no data");
            return Err(AppError::NotFound(miss.into()));
        }

        serde_json::from_value(self.result)
            .map_err(|e| AppError::Decode(format!("unexpected Etherscan result shape: {e}")))
    }
}

// ─── Raw rows ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSourceCode {
    #[serde(rename = "ABI", default)]
    abi: String,
    #[serde(default)]
    contract_name: String,
    #[serde(default)]
    compiler_version: String,
    #[serde(default)]
    optimization_used: String,
    #[serde(default)]
    runs: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    gas_used: String,
    #[serde(default)]
    gas_price: String,
    #[serde(default)]
    time_stamp: String,
    #[serde(default)]
    is_error: String,
    #[serde(default)]
    block_number: String,
    #[serde(default)]
    function_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransfer {
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    token_symbol: String,
    #[serde(default)]
    token_name: String,
    #[serde(default)]
    token_decimal: String,
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    time_stamp: String,
    #[serde(default)]
    block_number: String,
}

// ─── Decoding ───────────────────────────────────────────────────────────────

fn decode_contract(address: &ContractAddress, row: RawSourceCode) -> ContractSummary {
    let verified = row.abi != UNVERIFIED_ABI;
    let token_type = classify_abi(&row.abi);

    ContractSummary {
        address: address.clone(),
        name: non_empty_or(row.contract_name, "Unknown Contract"),
        compiler: non_empty_or(row.compiler_version, "Unknown"),
        verified,
        token_type,
        optimization_used: row.optimization_used == "1",
        runs: non_empty_or(row.runs, "0"),
    }
}

/// Decode each row, dropping (and logging) the ones that fail.
fn decode_rows<R, T>(
    rows: Vec<R>,
    decode: fn(R) -> Result<T, AppError>,
    kind: &'static str,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(kind, error = %e, "Skipping undecodable row");
                None
            }
        })
        .collect()
}

fn decode_transaction(raw: RawTransaction) -> Result<Transaction, AppError> {
    let function_name = match raw.function_name.trim() {
        "" => None,
        name => Some(name.to_string()),
    };

    Ok(Transaction {
        value: scale_units(&raw.value, ETHER_DECIMALS)?,
        gas_used: parse_number(&raw.gas_used, "gasUsed")?,
        gas_price: parse_number(&raw.gas_price, "gasPrice")?,
        timestamp: seconds_to_millis(&raw.time_stamp)?,
        status: if raw.is_error == "0" {
            TxStatus::Success
        } else {
            TxStatus::Failed
        },
        block_number: parse_number(&raw.block_number, "blockNumber")?,
        from: raw.from.to_ascii_lowercase(),
        to: raw.to.to_ascii_lowercase(),
        function_name,
        hash: raw.hash,
    })
}

fn decode_transfer(raw: RawTransfer) -> Result<TokenTransfer, AppError> {
    let decimals = match raw.token_decimal.trim() {
        "" => DEFAULT_TOKEN_DECIMALS,
        d => parse_number(d, "tokenDecimal")?,
    };

    Ok(TokenTransfer {
        value: scale_units(&raw.value, decimals)?,
        token_symbol: non_empty_or(raw.token_symbol, "UNKNOWN"),
        token_name: non_empty_or(raw.token_name, "Unknown Token"),
        token_decimal: decimals,
        contract_address: raw.contract_address.to_ascii_lowercase(),
        timestamp: seconds_to_millis(&raw.time_stamp)?,
        block_number: parse_number(&raw.block_number, "blockNumber")?,
        from: raw.from.to_ascii_lowercase(),
        to: raw.to.to_ascii_lowercase(),
        hash: raw.hash,
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Decode(format!("invalid {field}: {raw:?}")))
}

fn seconds_to_millis(raw: &str) -> Result<i64, AppError> {
    let seconds: i64 = parse_number(raw, "timeStamp")?;
    seconds
        .checked_mul(1000)
        .ok_or_else(|| AppError::Decode(format!("timeStamp out of range: {raw}")))
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
