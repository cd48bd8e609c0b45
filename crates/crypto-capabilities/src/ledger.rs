//! Ledger Capability
//!
//! Native and ERC-20 balances on the Base network, over plain
//! JSON-RPC. Balance arithmetic uses `Decimal` throughout.

use agent_core::{AgentError, Capability, JsonMap, OperationSpec, ParamKind, Result as CoreResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CapabilityError, Result};
use crate::{check_status, require_env, USER_AGENT};

const CAPABILITY_ID: &str = "ledger";
const GET_NATIVE_BALANCE: &str = "ledger_get_native_balance_tool";
const GET_ERC20_BALANCE: &str = "ledger_get_erc20_balance_tool";

/// `balanceOf(address)`
const BALANCE_OF_SELECTOR: &str = "70a08231";
/// `decimals()`
const DECIMALS_SELECTOR: &str = "313ce567";

const NATIVE_DECIMALS: u32 = 18;

/// Capability provider for on-chain reads.
pub struct LedgerCapability {
    http: reqwest::Client,
    rpc_url: String,
}

impl LedgerCapability {
    /// Construct from `LEDGER_BASE_RPC`.
    pub fn from_env() -> Result<Self> {
        let rpc_url = require_env("LEDGER_BASE_RPC")?;
        Self::new(rpc_url)
    }

    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct RpcResponse {
            result: Option<Value>,
            error: Option<RpcError>,
        }

        #[derive(Deserialize)]
        struct RpcError {
            code: i64,
            message: String,
        }

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
        let response = check_status(response).await?;
        let reply: RpcResponse = response.json().await?;

        if let Some(error) = reply.error {
            return Err(CapabilityError::Rpc(format!(
                "{method} failed ({}): {}",
                error.code, error.message
            )));
        }
        reply
            .result
            .ok_or_else(|| CapabilityError::Rpc(format!("{method} returned no result")))
    }

    async fn rpc_quantity(&self, method: &str, params: Value) -> Result<u128> {
        let result = self.rpc(method, params).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| CapabilityError::Rpc(format!("{method} returned a non-string")))?;
        parse_hex_quantity(hex)
    }

    /// Native balance of a wallet, in ether units.
    async fn get_native_balance(&self, wallet: &str) -> Result<Value> {
        let address = parse_address(wallet)?;
        let wei = self
            .rpc_quantity("eth_getBalance", json!([format!("0x{address}"), "latest"]))
            .await?;
        let ether = scale_units(wei, NATIVE_DECIMALS)?;

        Ok(json!({
            "address": format!("0x{address}"),
            "ether": ether.to_string(),
        }))
    }

    /// ERC-20 balance of a wallet, scaled by the token's decimals.
    async fn get_erc20_balance(&self, contract: &str, wallet: &str) -> Result<Value> {
        let contract = parse_address(contract)?;
        let wallet = parse_address(wallet)?;

        let raw = self
            .rpc_quantity(
                "eth_call",
                json!([
                    {
                        "to": format!("0x{contract}"),
                        "data": encode_address_call(BALANCE_OF_SELECTOR, &wallet),
                    },
                    "latest"
                ]),
            )
            .await?;
        let decimals = self
            .rpc_quantity(
                "eth_call",
                json!([
                    {
                        "to": format!("0x{contract}"),
                        "data": format!("0x{DECIMALS_SELECTOR}"),
                    },
                    "latest"
                ]),
            )
            .await?;
        let decimals = u32::try_from(decimals)
            .map_err(|_| CapabilityError::Rpc(format!("absurd token decimals: {decimals}")))?;

        let balance = scale_units(raw, decimals)?;
        Ok(json!({
            "contract": format!("0x{contract}"),
            "address": format!("0x{wallet}"),
            "balance": balance.to_string(),
        }))
    }
}

#[async_trait]
impl Capability for LedgerCapability {
    fn id(&self) -> &str {
        CAPABILITY_ID
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(
                GET_NATIVE_BALANCE,
                "Get the native (ETH) balance of a wallet address, in ether.",
            )
            .param(
                "wallet_address",
                ParamKind::String,
                "Wallet address, 0x-prefixed",
                true,
            ),
            OperationSpec::new(
                GET_ERC20_BALANCE,
                "Get the ERC-20 token balance of a wallet address, scaled by the token's decimals.",
            )
            .param(
                "erc20_contract_address",
                ParamKind::String,
                "Token contract address, 0x-prefixed",
                true,
            )
            .param(
                "wallet_address",
                ParamKind::String,
                "Wallet address, 0x-prefixed",
                true,
            ),
        ]
    }

    async fn invoke(&self, operation: &str, args: &JsonMap) -> CoreResult<Value> {
        match operation {
            GET_NATIVE_BALANCE => {
                let wallet = require_str(args, "wallet_address")?;
                Ok(self.get_native_balance(wallet).await?)
            }
            GET_ERC20_BALANCE => {
                let contract = require_str(args, "erc20_contract_address")?;
                let wallet = require_str(args, "wallet_address")?;
                Ok(self.get_erc20_balance(contract, wallet).await?)
            }
            other => Err(AgentError::UnknownOperation {
                capability: CAPABILITY_ID.into(),
                operation: other.into(),
            }),
        }
    }
}

fn require_str<'a>(args: &'a JsonMap, key: &str) -> CoreResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidArguments(format!("{key} is required")))
}

/// Validate and normalize an address to 40 lowercase hex chars.
fn parse_address(address: &str) -> Result<String> {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hex.to_lowercase())
    } else {
        Err(CapabilityError::InvalidArgument(format!(
            "invalid address: {address:?}"
        )))
    }
}

/// ABI-encode a single-address call: selector + left-padded address.
fn encode_address_call(selector: &str, address: &str) -> String {
    format!("0x{selector}{:0>24}{address}", "")
}

/// Parse a JSON-RPC hex quantity.
fn parse_hex_quantity(hex: &str) -> Result<u128> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| CapabilityError::Rpc(format!("unparseable quantity: {hex:?}")))
}

/// Scale a raw integer amount down by `decimals` places.
///
/// `Decimal` carries a 96-bit mantissa, so a sufficiently large raw
/// amount (or an absurd decimals value) is unrepresentable; that is an
/// error, never a panic.
fn scale_units(raw: u128, decimals: u32) -> Result<Decimal> {
    let raw = i128::try_from(raw)
        .map_err(|_| CapabilityError::Rpc(format!("amount out of range: {raw}")))?;
    let scaled = Decimal::try_from_i128_with_scale(raw, decimals).map_err(|_| {
        CapabilityError::Rpc(format!(
            "amount {raw} with {decimals} decimals exceeds supported precision"
        ))
    })?;
    Ok(scaled.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_validated_and_normalized() {
        let parsed =
            parse_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        assert_eq!(parsed, "833589fcd6edb6e08f4c7c32d4f71b54bda02913");

        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not an address").is_err());
    }

    #[test]
    fn balance_of_calldata_is_padded_to_32_bytes() {
        let data = encode_address_call(
            BALANCE_OF_SELECTOR,
            "833589fcd6edb6e08f4c7c32d4f71b54bda02913",
        );
        // 0x + 8 selector chars + 64 argument chars
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231000000000000000000000000833589f"));
    }

    #[test]
    fn hex_quantities_parse() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0xde0b6b3a7640000").unwrap(), 1_000_000_000_000_000_000);
        assert!(parse_hex_quantity("0xzz").is_err());
    }

    #[test]
    fn wei_scales_to_ether() {
        let one_ether = scale_units(1_000_000_000_000_000_000, 18).unwrap();
        assert_eq!(one_ether.to_string(), "1");

        let half = scale_units(500_000_000_000_000_000, 18).unwrap();
        assert_eq!(half.to_string(), "0.5");
    }

    #[test]
    fn whale_sized_balances_error_instead_of_panicking() {
        // 590 trillion tokens at 18 decimals overflows the 96-bit
        // mantissa; a low-decimals token of the same raw size fits.
        let raw: u128 = 590_000_000_000_000_000_000_000_000_000_000;
        assert!(matches!(scale_units(raw, 18), Err(CapabilityError::Rpc(_))));

        assert!(scale_units(u128::from(u64::MAX), 18).is_ok());
    }

    #[test]
    fn absurd_decimals_error_instead_of_panicking() {
        assert!(matches!(
            scale_units(1_000, 255),
            Err(CapabilityError::Rpc(_))
        ));
    }

    #[test]
    fn declares_two_advertised_operations() {
        let capability = LedgerCapability::new("http://localhost:8545").unwrap();
        let names: Vec<String> = capability
            .operations()
            .iter()
            .map(|op| op.name.clone())
            .collect();
        assert_eq!(names, vec![GET_NATIVE_BALANCE, GET_ERC20_BALANCE]);
    }

    #[tokio::test]
    async fn missing_arguments_are_invalid() {
        let capability = LedgerCapability::new("http://localhost:8545").unwrap();
        let result = capability.invoke(GET_NATIVE_BALANCE, &JsonMap::new()).await;
        assert!(matches!(result, Err(AgentError::InvalidArguments(_))));
    }
}
