//! Local bridge transaction records
//!
//! The claimer works from a JSON file of [`BridgeTransaction`]s, the same
//! records a wallet UI keeps for its user. Missing message hashes are
//! computed on load.

use std::path::Path;

use alloy::primitives::B256;
use bridge_sdk::{hash_message, BridgeTransaction};
use eyre::{eyre, Result, WrapErr};
use tracing::{info, warn};

/// Read every record in `path`, accepting a single object or an array
pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<BridgeTransaction>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let txs = parse_transactions(&json)
        .wrap_err_with(|| format!("Invalid transaction records in {}", path.display()))?;
    info!(path = %path.display(), count = txs.len(), "Loaded bridge transactions");
    Ok(txs)
}

pub fn parse_transactions(json: &str) -> Result<Vec<BridgeTransaction>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let mut txs: Vec<BridgeTransaction> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };

    for tx in &mut txs {
        fill_msg_hash(tx)?;
    }
    // Newest first, records without a timestamp last
    txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(txs)
}

/// Compute `msg_hash` from the message, rejecting stored hashes that disagree
fn fill_msg_hash(tx: &mut BridgeTransaction) -> Result<()> {
    let Some(message) = &tx.message else {
        if tx.msg_hash.is_none() {
            warn!(tx_hash = %tx.hash, "Record has neither message nor msgHash");
        }
        return Ok(());
    };

    let computed = hash_message(message);
    match tx.msg_hash {
        Some(stored) if stored != computed => Err(eyre!(
            "msgHash {} of {} does not match its message ({})",
            stored,
            tx.hash,
            computed
        )),
        _ => {
            tx.msg_hash = Some(computed);
            Ok(())
        }
    }
}

/// Find a record by source transaction hash or message hash
pub fn find_transaction(txs: &[BridgeTransaction], hash: B256) -> Option<&BridgeTransaction> {
    txs.iter()
        .find(|tx| tx.hash == hash || tx.msg_hash == Some(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxHash;
    use bridge_sdk::testing::sample_bridge_tx;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bridge-claimer-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_fills_missing_msg_hash() {
        let expected = sample_bridge_tx(1, 2);
        let mut stored = expected.clone();
        stored.msg_hash = None;

        let json = serde_json::to_string(&vec![stored]).unwrap();
        let txs = parse_transactions(&json).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].msg_hash, expected.msg_hash);
    }

    #[test]
    fn test_accepts_single_object() {
        let tx = sample_bridge_tx(1, 2);
        let json = serde_json::to_string(&tx).unwrap();
        let txs = parse_transactions(&json).unwrap();
        assert_eq!(txs, vec![tx]);
    }

    #[test]
    fn test_rejects_mismatched_msg_hash() {
        let mut tx = sample_bridge_tx(1, 2);
        tx.msg_hash = Some(B256::repeat_byte(0x99));
        let json = serde_json::to_string(&tx).unwrap();
        assert!(parse_transactions(&json).is_err());
    }

    #[test]
    fn test_sorted_newest_first() {
        let mut old = sample_bridge_tx(1, 2);
        old.hash = TxHash::with_last_byte(1);
        old.timestamp = Some(100);
        let mut new = sample_bridge_tx(2, 1);
        new.hash = TxHash::with_last_byte(2);
        new.timestamp = Some(200);
        let mut undated = sample_bridge_tx(1, 2);
        undated.hash = TxHash::with_last_byte(3);

        let json = serde_json::to_string(&vec![old, undated, new]).unwrap();
        let hashes: Vec<_> = parse_transactions(&json)
            .unwrap()
            .iter()
            .map(|tx| tx.hash)
            .collect();
        assert_eq!(
            hashes,
            vec![
                TxHash::with_last_byte(2),
                TxHash::with_last_byte(1),
                TxHash::with_last_byte(3)
            ]
        );
    }

    #[test]
    fn test_find_by_either_hash() {
        let tx = sample_bridge_tx(1, 2);
        let txs = vec![tx.clone()];

        assert_eq!(find_transaction(&txs, tx.hash), Some(&tx));
        assert_eq!(find_transaction(&txs, tx.msg_hash.unwrap()), Some(&tx));
        assert_eq!(find_transaction(&txs, B256::repeat_byte(7)), None);
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_path("load");
        let tx = sample_bridge_tx(1, 2);
        std::fs::write(&path, serde_json::to_string_pretty(&vec![&tx]).unwrap()).unwrap();

        let txs = load_transactions(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(txs, vec![tx]);

        assert!(load_transactions(temp_path("missing")).is_err());
    }
}
