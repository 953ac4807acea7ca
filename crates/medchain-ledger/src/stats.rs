use std::collections::{BTreeMap, BTreeSet};

use medchain_types::{ForgeryStatus, Timestamp};
use serde::Serialize;

use crate::block::Block;

/// Aggregate counts over a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub total: u64,
    /// Every status is present, with zero when no block carries it.
    pub count_by_status: BTreeMap<ForgeryStatus, u64>,
    pub earliest_timestamp: Option<Timestamp>,
    pub latest_timestamp: Option<Timestamp>,
    pub distinct_patients: u64,
    pub distinct_doctors: u64,
}

/// Summarize an already-loaded chain.
///
/// Pure aggregation: no integrity check is made, so verify first when the
/// numbers feed a trust decision.
pub fn summarize(blocks: &[Block]) -> ChainSummary {
    let mut count_by_status: BTreeMap<ForgeryStatus, u64> =
        ForgeryStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut patients = BTreeSet::new();
    let mut doctors = BTreeSet::new();
    let mut earliest: Option<Timestamp> = None;
    let mut latest: Option<Timestamp> = None;

    for block in blocks {
        let payload = block.payload();
        *count_by_status.entry(payload.forgery.status).or_default() += 1;
        patients.insert(payload.patient_id.as_str());
        doctors.insert(payload.doctor_id.as_str());

        let ts = *block.timestamp();
        earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
        latest = Some(latest.map_or(ts, |l| l.max(ts)));
    }

    ChainSummary {
        total: blocks.len() as u64,
        count_by_status,
        earliest_timestamp: earliest,
        latest_timestamp: latest,
        distinct_patients: patients.len() as u64,
        distinct_doctors: doctors.len() as u64,
    }
}
