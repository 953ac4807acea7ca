use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Forgery-status label assigned by the prescription-analysis collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForgeryStatus {
    Original,
    Suspicious,
    Fake,
}

impl ForgeryStatus {
    /// Every status, in tag order.
    pub const ALL: [ForgeryStatus; 3] = [Self::Original, Self::Suspicious, Self::Fake];

    /// Single-byte tag used in the canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Original => 0,
            Self::Suspicious => 1,
            Self::Fake => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Suspicious => "suspicious",
            Self::Fake => "fake",
        }
    }
}

impl fmt::Display for ForgeryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForgeryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "suspicious" => Ok(Self::Suspicious),
            "fake" => Ok(Self::Fake),
            other => Err(format!("unknown forgery status: {other}")),
        }
    }
}

/// Detection confidence in basis points (0..=10000, i.e. 0.00% to 100.00%).
///
/// Kept as an integer so the canonical encoding never depends on float
/// formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct ConfidenceScore(u16);

impl ConfidenceScore {
    pub const MAX_BASIS_POINTS: u16 = 10_000;

    pub fn from_basis_points(bp: u16) -> Result<Self, TypeError> {
        if bp > Self::MAX_BASIS_POINTS {
            return Err(TypeError::ConfidenceOutOfRange(u32::from(bp)));
        }
        Ok(Self(bp))
    }

    /// Convert a percentage such as `87.35` (rounded to two decimals).
    pub fn from_percent(percent: f64) -> Result<Self, TypeError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(TypeError::ConfidenceOutOfRange(
                (percent * 100.0).clamp(0.0, u32::MAX as f64) as u32,
            ));
        }
        Self::from_basis_points((percent * 100.0).round() as u16)
    }

    pub fn basis_points(&self) -> u16 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u16> for ConfidenceScore {
    type Error = TypeError;

    fn try_from(bp: u16) -> Result<Self, Self::Error> {
        Self::from_basis_points(bp)
    }
}

impl From<ConfidenceScore> for u16 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Forgery label plus the confidence the detector reported for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForgeryVerdict {
    pub status: ForgeryStatus,
    pub confidence: ConfidenceScore,
}

impl ForgeryVerdict {
    pub fn new(status: ForgeryStatus, confidence: ConfidenceScore) -> Self {
        Self { status, confidence }
    }
}

/// The treatment record committed by one block.
///
/// The schema is fixed: adding a field changes the canonical encoding and
/// therefore requires a snapshot format version bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreatmentPayload {
    pub patient_id: String,
    pub doctor_id: String,
    pub disease: String,
    pub symptoms: String,
    pub medicine: String,
    pub dosage: String,
    pub duration: String,
    pub prescription_file: Option<String>,
    pub forgery: ForgeryVerdict,
}

impl TreatmentPayload {
    /// Deterministic byte encoding used as hash input.
    ///
    /// Layout, in order: the seven text fields, each as a `u32` big-endian
    /// length followed by UTF-8 bytes; a presence byte (0/1) and, if present,
    /// the prescription file reference encoded the same way; the status tag
    /// byte; the confidence as `u16` big-endian basis points.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        for field in [
            &self.patient_id,
            &self.doctor_id,
            &self.disease,
            &self.symptoms,
            &self.medicine,
            &self.dosage,
            &self.duration,
        ] {
            put_str(&mut out, field);
        }
        match &self.prescription_file {
            Some(file) => {
                out.push(1);
                put_str(&mut out, file);
            }
            None => out.push(0),
        }
        out.push(self.forgery.status.tag());
        out.extend_from_slice(&self.forgery.confidence.basis_points().to_be_bytes());
        out
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> TreatmentPayload {
        TreatmentPayload {
            patient_id: "P-1001".into(),
            doctor_id: "D-17".into(),
            disease: "influenza".into(),
            symptoms: "fever, cough".into(),
            medicine: "oseltamivir".into(),
            dosage: "75mg twice daily".into(),
            duration: "5 days".into(),
            prescription_file: Some("rx/P-1001-0001.png".into()),
            forgery: ForgeryVerdict::new(
                ForgeryStatus::Original,
                ConfidenceScore::from_basis_points(9_820).unwrap(),
            ),
        }
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        assert_eq!(sample().canonical_bytes(), sample().canonical_bytes());
    }

    #[test]
    fn canonical_bytes_change_with_every_field() {
        let base = sample().canonical_bytes();

        let mut p = sample();
        p.dosage = "150mg twice daily".into();
        assert_ne!(p.canonical_bytes(), base);

        let mut p = sample();
        p.prescription_file = None;
        assert_ne!(p.canonical_bytes(), base);

        let mut p = sample();
        p.forgery.status = ForgeryStatus::Fake;
        assert_ne!(p.canonical_bytes(), base);

        let mut p = sample();
        p.forgery.confidence = ConfidenceScore::from_basis_points(9_821).unwrap();
        assert_ne!(p.canonical_bytes(), base);
    }

    #[test]
    fn length_prefix_prevents_field_shifting() {
        let mut a = sample();
        a.disease = "flu".into();
        a.symptoms = "cough".into();
        let mut b = sample();
        b.disease = "flucough".into();
        b.symptoms = String::new();
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn confidence_range_is_enforced() {
        assert!(ConfidenceScore::from_basis_points(10_000).is_ok());
        assert_eq!(
            ConfidenceScore::from_basis_points(10_001),
            Err(TypeError::ConfidenceOutOfRange(10_001))
        );
        assert!(ConfidenceScore::from_percent(f64::NAN).is_err());
        assert!(ConfidenceScore::from_percent(-1.0).is_err());
    }

    #[test]
    fn confidence_from_percent_rounds_to_basis_points() {
        let score = ConfidenceScore::from_percent(87.356).unwrap();
        assert_eq!(score.basis_points(), 8_736);
        assert_eq!(score.to_string(), "87.36%");
    }

    #[test]
    fn confidence_out_of_range_fails_deserialization() {
        let result: Result<ConfidenceScore, _> = serde_json::from_str("12000");
        assert!(result.is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ForgeryStatus::Suspicious).unwrap();
        assert_eq!(json, "\"suspicious\"");
        assert_eq!("FAKE".parse::<ForgeryStatus>().unwrap(), ForgeryStatus::Fake);
    }

    #[test]
    fn payload_rejects_unknown_fields() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["insurance"] = serde_json::json!("none");
        let result: Result<TreatmentPayload, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn distinct_dosages_encode_distinctly(a in ".{0,24}", b in ".{0,24}") {
            prop_assume!(a != b);
            let mut p = sample();
            p.dosage = a;
            let mut q = sample();
            q.dosage = b;
            prop_assert_ne!(p.canonical_bytes(), q.canonical_bytes());
        }
    }
}
