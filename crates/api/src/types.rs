//! Lend protocol payload schemas.
//!
//! Every record goes through serde with strict field parsers, then
//! `validate()`. Prices must be finite and non-negative; raw amounts must be
//! non-negative integers. A record that fails either step never reaches the
//! scanner.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use solana_sdk::address_lookup_table_account::AddressLookupTableAccount;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::error::{ApiError, Result};

/// Token metadata attached to a vault side.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Mint address
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,

    #[serde(default)]
    pub symbol: String,

    pub decimals: u8,

    /// USD price per whole token
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub price: f64,
}

impl TokenInfo {
    /// Convert a raw on-chain amount to whole tokens.
    pub fn to_human(&self, raw: u128) -> f64 {
        raw as f64 / 10f64.powi(i32::from(self.decimals))
    }

    /// USD value of a raw amount.
    pub fn usd_value(&self, raw: u128) -> f64 {
        self.to_human(raw) * self.price
    }

    fn validate(&self, side: &str) -> Result<()> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ApiError::invalid(format!(
                "{side} token {} has invalid price {}",
                self.address, self.price
            )));
        }
        Ok(())
    }
}

/// Aggregate state of one lending vault, fetched fresh each cycle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSnapshot {
    pub id: u64,

    #[serde(with = "pubkey_string")]
    pub address: Pubkey,

    pub borrow_token: TokenInfo,

    pub supply_token: TokenInfo,

    /// Raw borrowed amount (borrow token base units)
    #[serde(with = "u128_string")]
    pub total_borrow: u128,

    /// Raw supplied amount (supply token base units)
    #[serde(with = "u128_string")]
    pub total_supply: u128,
}

impl VaultSnapshot {
    /// Borrowed amount in whole borrow tokens.
    pub fn borrow_amount(&self) -> f64 {
        self.borrow_token.to_human(self.total_borrow)
    }

    /// Supplied amount in whole supply tokens.
    pub fn supply_amount(&self) -> f64 {
        self.supply_token.to_human(self.total_supply)
    }

    /// Borrow as a percentage of supply. `None` when nothing is supplied.
    pub fn utilization(&self) -> Option<f64> {
        let supply = self.supply_amount();
        if supply == 0.0 {
            return None;
        }
        Some(self.borrow_amount() * 100.0 / supply)
    }

    pub fn validate(&self) -> Result<()> {
        self.borrow_token.validate("borrow")?;
        self.supply_token.validate("supply")
    }
}

/// A position the protocol reports as liquidatable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationCandidate {
    /// Raw debt to repay (borrow token base units)
    #[serde(with = "u128_string")]
    pub amt_in: u128,

    /// Raw collateral received (supply token base units)
    #[serde(with = "u128_string")]
    pub amt_out: u128,

    /// Position account, when the API reports one
    #[serde(default, with = "option_pubkey_string", skip_serializing_if = "Option::is_none")]
    pub position: Option<Pubkey>,
}

/// Parameters for building a liquidation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidateRequest {
    pub vault_id: u64,

    /// Raw debt amount to repay
    #[serde(with = "u128_string")]
    pub debt_amount: u128,

    #[serde(with = "pubkey_string")]
    pub signer: Pubkey,

    /// Collateral recipient
    #[serde(with = "pubkey_string")]
    pub to: Pubkey,
}

/// Instructions and lookup tables for one liquidation.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationInstructions {
    pub instructions: Vec<Instruction>,
    pub lookup_tables: Vec<AddressLookupTableAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountMetaRecord {
    #[serde(with = "pubkey_string")]
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstructionRecord {
    #[serde(with = "pubkey_string")]
    program_id: Pubkey,
    accounts: Vec<AccountMetaRecord>,
    /// Base64 instruction data
    data: String,
}

#[derive(Debug, Deserialize)]
struct LookupTableRecord {
    #[serde(with = "pubkey_string")]
    key: Pubkey,
    #[serde(deserialize_with = "deserialize_pubkeys")]
    addresses: Vec<Pubkey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiquidateResponse {
    #[serde(alias = "ixs")]
    instructions: Vec<InstructionRecord>,
    #[serde(default, alias = "addressLookupTableAccounts")]
    address_lookup_tables: Vec<LookupTableRecord>,
}

/// Decode a vault list, dropping records that fail to parse or validate.
pub fn decode_vaults(value: serde_json::Value) -> Result<Vec<VaultSnapshot>> {
    decode_records(value, "vault", |vault: &VaultSnapshot| vault.validate())
}

/// Decode a candidate list, dropping malformed records.
pub fn decode_candidates(value: serde_json::Value) -> Result<Vec<LiquidationCandidate>> {
    decode_records(value, "candidate", |_: &LiquidationCandidate| Ok(()))
}

/// Decode a liquidation build response. Any malformed instruction fails the
/// whole response.
pub fn decode_liquidate_response(value: serde_json::Value) -> Result<LiquidationInstructions> {
    let response: LiquidateResponse = serde_json::from_value(value)?;

    if response.instructions.is_empty() {
        return Err(ApiError::invalid("liquidation response has no instructions"));
    }

    let instructions = response
        .instructions
        .into_iter()
        .map(|record| {
            let data = BASE64
                .decode(record.data.as_bytes())
                .map_err(|e| ApiError::invalid(format!("instruction data is not base64: {e}")))?;
            let accounts = record
                .accounts
                .into_iter()
                .map(|meta| AccountMeta {
                    pubkey: meta.pubkey,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect();
            Ok(Instruction {
                program_id: record.program_id,
                accounts,
                data,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let lookup_tables = response
        .address_lookup_tables
        .into_iter()
        .map(|table| AddressLookupTableAccount {
            key: table.key,
            addresses: table.addresses,
        })
        .collect();

    Ok(LiquidationInstructions {
        instructions,
        lookup_tables,
    })
}

fn decode_records<T, F>(value: serde_json::Value, kind: &str, validate: F) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> Result<()>,
{
    let serde_json::Value::Array(items) = value else {
        return Err(ApiError::invalid(format!("expected a {kind} array")));
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = serde_json::from_value::<T>(item)
                .map_err(ApiError::from)
                .and_then(|record| validate(&record).map(|_| record));
            match record {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(kind, index, error = %e, "Rejected malformed record");
                    None
                }
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            kind,
            accepted = records.len(),
            rejected = total - records.len(),
            "Dropped malformed records"
        );
    }

    Ok(records)
}

// Field parsers

fn deserialize_f64_from_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

fn deserialize_pubkeys<'de, D>(deserializer: D) -> std::result::Result<Vec<Pubkey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let keys: Vec<String> = Deserialize::deserialize(deserializer)?;
    keys.iter()
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .collect()
}

mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod option_pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => serializer.collect_str(key),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pubkey>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.is_empty() => s.parse().map(Some).map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Raw token amounts travel as decimal strings; integers are accepted too.
mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrInteger {
            String(String),
            Integer(u64),
        }

        match StringOrInteger::deserialize(deserializer)? {
            StringOrInteger::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
            StringOrInteger::Integer(n) => Ok(u128::from(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vault_json(id: u64, price: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "address": Pubkey::new_unique().to_string(),
            "borrowToken": {
                "address": Pubkey::new_unique().to_string(),
                "symbol": "USDC",
                "decimals": 6,
                "price": price
            },
            "supplyToken": {
                "address": Pubkey::new_unique().to_string(),
                "symbol": "SOL",
                "decimals": 9,
                "price": "150.25"
            },
            "totalBorrow": "5000000",
            "totalSupply": 100000000000u64
        })
    }

    #[test]
    fn test_decode_vault() {
        let vaults = decode_vaults(json!([vault_json(7, json!("1.0"))])).unwrap();
        assert_eq!(vaults.len(), 1);

        let vault = &vaults[0];
        assert_eq!(vault.id, 7);
        assert_eq!(vault.borrow_token.symbol, "USDC");
        assert!((vault.borrow_amount() - 5.0).abs() < 1e-12);
        assert!((vault.supply_amount() - 100.0).abs() < 1e-12);
        assert!((vault.supply_token.price - 150.25).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_vaults_rejected() {
        let mut missing_borrow = vault_json(3, json!("1"));
        missing_borrow.as_object_mut().unwrap().remove("totalBorrow");

        let mut bad_address = vault_json(4, json!("1"));
        bad_address["address"] = json!("not-a-pubkey");

        let mut negative_amount = vault_json(5, json!("1"));
        negative_amount["totalSupply"] = json!("-10");

        let payload = json!([
            vault_json(1, json!("NaN")),
            vault_json(2, json!("-1")),
            missing_borrow,
            bad_address,
            negative_amount,
            vault_json(6, json!(0.99)),
        ]);

        let vaults = decode_vaults(payload).unwrap();
        assert_eq!(vaults.iter().map(|v| v.id).collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn test_non_array_payload_is_error() {
        assert!(decode_vaults(json!({"error": "maintenance"})).is_err());
    }

    #[test]
    fn test_utilization() {
        let mut vault: VaultSnapshot = serde_json::from_value(vault_json(1, json!("1"))).unwrap();
        vault.supply_token.decimals = 6;
        vault.total_borrow = 5_000_000;
        vault.total_supply = 100_000_000;
        assert_eq!(vault.utilization(), Some(5.0));

        vault.total_supply = 0;
        assert_eq!(vault.utilization(), None);
    }

    #[test]
    fn test_decode_candidates() {
        let position = Pubkey::new_unique();
        let payload = json!([
            {"amtIn": "50000000", "amtOut": "80000000"},
            {"amtIn": "1.5", "amtOut": "2"},
            {"amtIn": 10, "amtOut": 20, "position": position.to_string()}
        ]);

        let candidates = decode_candidates(payload).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].amt_in, 50_000_000);
        assert_eq!(candidates[0].amt_out, 80_000_000);
        assert_eq!(candidates[0].position, None);
        assert_eq!(candidates[1].position, Some(position));
    }

    #[test]
    fn test_decode_liquidate_response() {
        let program = Pubkey::new_unique();
        let account = Pubkey::new_unique();
        let table = Pubkey::new_unique();
        let payload = json!({
            "instructions": [{
                "programId": program.to_string(),
                "accounts": [{"pubkey": account.to_string(), "isSigner": false, "isWritable": true}],
                "data": BASE64.encode([9u8, 8, 7])
            }],
            "addressLookupTables": [{"key": table.to_string(), "addresses": [account.to_string()]}]
        });

        let built = decode_liquidate_response(payload).unwrap();
        assert_eq!(built.instructions.len(), 1);
        assert_eq!(built.instructions[0].program_id, program);
        assert_eq!(built.instructions[0].data, vec![9, 8, 7]);
        assert!(built.instructions[0].accounts[0].is_writable);
        assert_eq!(built.lookup_tables[0].key, table);
        assert_eq!(built.lookup_tables[0].addresses, vec![account]);
    }

    #[test]
    fn test_liquidate_response_rejects_bad_data() {
        let payload = json!({
            "instructions": [{
                "programId": Pubkey::new_unique().to_string(),
                "accounts": [],
                "data": "%%%"
            }]
        });
        assert!(matches!(
            decode_liquidate_response(payload),
            Err(ApiError::InvalidRecord(_))
        ));

        assert!(decode_liquidate_response(json!({"instructions": []})).is_err());
    }

    #[test]
    fn test_liquidate_request_wire_format() {
        let signer = Pubkey::new_unique();
        let request = LiquidateRequest {
            vault_id: 12,
            debt_amount: 50_000_000,
            signer,
            to: signer,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["vaultId"], json!(12));
        assert_eq!(value["debtAmount"], json!("50000000"));
        assert_eq!(value["signer"], json!(signer.to_string()));
    }
}
