//! Signing credential loading.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::signature::{read_keypair_file, Keypair};

/// Where the liquidator keypair comes from. `private_key` wins over
/// `keypair_path` when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Base58-encoded 64-byte secret key
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,

    /// Path to a Solana CLI keypair JSON file
    #[serde(default)]
    pub keypair_path: Option<String>,
}

impl WalletConfig {
    pub fn has_credential(&self) -> bool {
        self.private_key.is_some() || self.keypair_path.is_some()
    }

    /// Load the signing keypair.
    pub fn load_keypair(&self) -> anyhow::Result<Keypair> {
        if let Some(secret) = &self.private_key {
            return keypair_from_base58(secret);
        }
        if let Some(path) = &self.keypair_path {
            return read_keypair_file(path)
                .map_err(|e| anyhow!("Failed to read keypair from {}: {}", path, e));
        }
        bail!("no signing credential configured")
    }
}

fn keypair_from_base58(secret: &str) -> anyhow::Result<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .context("PRIVATE_KEY is not valid base58")?;
    if bytes.len() != 64 {
        bail!("PRIVATE_KEY must decode to 64 bytes, got {}", bytes.len());
    }
    Keypair::from_bytes(&bytes).map_err(|e| anyhow!("Failed to parse keypair: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{write_keypair_file, Signer};

    #[test]
    fn test_private_key() {
        let keypair = Keypair::new();
        let wallet = WalletConfig {
            private_key: Some(keypair.to_base58_string()),
            keypair_path: None,
        };
        assert_eq!(wallet.load_keypair().unwrap().pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_keypair_file() {
        let keypair = Keypair::new();
        let path = std::env::temp_dir().join(format!("liquidator-test-{}.json", keypair.pubkey()));
        write_keypair_file(&keypair, &path).unwrap();

        let wallet = WalletConfig {
            private_key: None,
            keypair_path: Some(path.to_string_lossy().into_owned()),
        };
        assert_eq!(wallet.load_keypair().unwrap().pubkey(), keypair.pubkey());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_bad_private_key() {
        let wallet = WalletConfig {
            private_key: Some("0OIl".to_string()),
            keypair_path: None,
        };
        assert!(wallet.load_keypair().is_err());

        let short = WalletConfig {
            private_key: Some(bs58::encode([1u8; 32]).into_string()),
            keypair_path: None,
        };
        assert!(short.load_keypair().is_err());

        assert!(!WalletConfig::default().has_credential());
        assert!(WalletConfig::default().load_keypair().is_err());
    }
}
