//! JSON encoding of ledger snapshots, backups and import files.

use medchain_types::TreatmentPayload;
use serde::{Deserialize, Serialize};

use crate::block::{Block, LedgerSnapshot, FORMAT_VERSION};
use crate::error::{LedgerError, LedgerResult};

/// Borrowed form of [`LedgerSnapshot`] so encoding never clones the chain.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    format_version: u32,
    blocks: &'a [Block],
}

/// Only the version tag, read before attempting the full parse.
#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

/// Encode blocks as a pretty-printed snapshot document.
pub fn encode_snapshot(blocks: &[Block]) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec_pretty(&SnapshotRef {
        format_version: FORMAT_VERSION,
        blocks,
    })
    .map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode a snapshot document.
///
/// Parsing concerns only: malformed JSON, a missing or unknown
/// `format_version`, bad hex, bad timestamps or unknown fields are
/// [`LedgerError::CorruptFormat`]. Whether the hashes line up is left to
/// verification.
pub fn decode_snapshot(bytes: &[u8]) -> LedgerResult<LedgerSnapshot> {
    check_version(bytes)?;
    serde_json::from_slice(bytes).map_err(|e| LedgerError::CorruptFormat(e.to_string()))
}

/// Check the `format_version` tag of any versioned document.
pub(crate) fn check_version(bytes: &[u8]) -> LedgerResult<()> {
    let probe: VersionProbe =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::CorruptFormat(e.to_string()))?;
    if probe.format_version != FORMAT_VERSION {
        return Err(LedgerError::CorruptFormat(format!(
            "unsupported format_version {} (expected {FORMAT_VERSION})",
            probe.format_version
        )));
    }
    Ok(())
}

/// Decode a bulk-import file: a JSON array of treatment payloads.
pub fn decode_payloads(bytes: &[u8]) -> LedgerResult<Vec<TreatmentPayload>> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::CorruptFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tests::payload;

    fn chain(n: usize) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for i in 0..n {
            let next = Block::next(blocks.last(), i as u64, payload(&format!("P-{i}"), "10mg"));
            blocks.push(next);
        }
        blocks
    }

    #[test]
    fn roundtrip_is_structurally_equal() {
        let blocks = chain(4);
        let bytes = encode_snapshot(&blocks).unwrap();
        let snapshot = decode_snapshot(&bytes).unwrap();
        assert_eq!(snapshot.format_version, FORMAT_VERSION);
        assert_eq!(snapshot.blocks, blocks);
    }

    #[test]
    fn empty_chain_roundtrip() {
        let bytes = encode_snapshot(&[]).unwrap();
        assert!(decode_snapshot(&bytes).unwrap().blocks.is_empty());
    }

    #[test]
    fn garbage_is_corrupt_format() {
        let err = decode_snapshot(b"{ not json").unwrap_err();
        assert!(matches!(err, LedgerError::CorruptFormat(_)));
    }

    #[test]
    fn missing_version_is_corrupt_format() {
        let err = decode_snapshot(br#"{"blocks": []}"#).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptFormat(_)));
    }

    #[test]
    fn unknown_version_is_corrupt_format() {
        let err = decode_snapshot(br#"{"format_version": 2, "blocks": []}"#).unwrap_err();
        match err {
            LedgerError::CorruptFormat(msg) => assert!(msg.contains("format_version 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_hex_is_corrupt_format() {
        let blocks = chain(1);
        let mut value: serde_json::Value =
            serde_json::from_slice(&encode_snapshot(&blocks).unwrap()).unwrap();
        value["blocks"][0]["content_hash"] = serde_json::json!("xyz");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(LedgerError::CorruptFormat(_))
        ));
    }

    #[test]
    fn edited_field_still_parses() {
        // Tampering with a value is a verification concern, not a parse error.
        let blocks = chain(2);
        let mut value: serde_json::Value =
            serde_json::from_slice(&encode_snapshot(&blocks).unwrap()).unwrap();
        value["blocks"][1]["payload"]["dosage"] = serde_json::json!("1000mg");
        let bytes = serde_json::to_vec(&value).unwrap();
        let snapshot = decode_snapshot(&bytes).unwrap();
        assert_eq!(snapshot.blocks[1].payload().dosage, "1000mg");
        assert!(!snapshot.blocks[1].hash_is_consistent());
    }

    #[test]
    fn decode_payload_list() {
        let payloads = vec![payload("P-1", "5mg"), payload("P-2", "10mg")];
        let bytes = serde_json::to_vec(&payloads).unwrap();
        assert_eq!(decode_payloads(&bytes).unwrap(), payloads);
        assert!(matches!(
            decode_payloads(b"{}"),
            Err(LedgerError::CorruptFormat(_))
        ));
    }
}
