//! Request-scoped domain models.

use crate::constants::{MALWARE_SCAN_RESULT, UNKNOWN_SCAN_RESULT};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Errors raised while interpreting a scanner payload.
#[derive(Debug, thiserror::Error)]
pub enum OutcomeError {
    #[error("scan result is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scan result is not a JSON object")]
    NotAnObject,
}

/// Verdict of one scan: the integer result code plus the raw scanner payload,
/// kept verbatim for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub code: i64,
    pub payload: serde_json::Value,
}

impl ScanOutcome {
    /// Parse the JSON document returned by a scan client.
    ///
    /// `scanResult` compares numerically: `1`, `1.0` and `true` all read as 1.
    /// A missing field, or one that is not a whole number or boolean, reads as
    /// [`UNKNOWN_SCAN_RESULT`].
    pub fn parse(raw: &str) -> Result<Self, OutcomeError> {
        let payload: serde_json::Value = serde_json::from_str(raw)?;
        if !payload.is_object() {
            return Err(OutcomeError::NotAnObject);
        }

        let code = payload
            .get("scanResult")
            .and_then(result_code)
            .unwrap_or(UNKNOWN_SCAN_RESULT);

        Ok(Self { code, payload })
    }

    pub fn is_malware(&self) -> bool {
        self.code == MALWARE_SCAN_RESULT
    }
}

fn result_code(value: &serde_json::Value) -> Option<i64> {
    if let Some(code) = value.as_i64() {
        return Some(code);
    }
    if let Some(flag) = value.as_bool() {
        return Some(i64::from(flag));
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| f as i64)
}

/// How the stored object should be presented when downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    #[default]
    Inline,
    Attachment,
}

impl Disposition {
    /// Value for the `Content-Disposition` header of an object named `filename`.
    pub fn header_value(&self, filename: &str) -> String {
        match self {
            Disposition::Inline => "inline".to_string(),
            Disposition::Attachment => format!("attachment; filename=\"{}\"", filename),
        }
    }
}

impl FromStr for Disposition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(Disposition::Inline),
            "attachment" => Ok(Disposition::Attachment),
            _ => Err(anyhow::anyhow!(
                "Invalid disposition '{}'. Must be 'inline' or 'attachment'",
                s
            )),
        }
    }
}

impl Display for Disposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Disposition::Inline => write!(f, "inline"),
            Disposition::Attachment => write!(f, "attachment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_and_malware_codes() {
        let clean = ScanOutcome::parse(r#"{"scanResult": 0, "foundMalwares": []}"#).unwrap();
        assert_eq!(clean.code, 0);
        assert!(!clean.is_malware());

        let infected = ScanOutcome::parse(
            r#"{"scanResult": 1, "foundMalwares": [{"malwareName": "Eicar_test_file"}]}"#,
        )
        .unwrap();
        assert_eq!(infected.code, 1);
        assert!(infected.is_malware());
        assert_eq!(
            infected.payload["foundMalwares"][0]["malwareName"],
            "Eicar_test_file"
        );
    }

    #[test]
    fn missing_code_reads_as_unknown() {
        let outcome = ScanOutcome::parse(r#"{"fileName": "a.txt"}"#).unwrap();
        assert_eq!(outcome.code, UNKNOWN_SCAN_RESULT);
        assert!(!outcome.is_malware());
    }

    #[test]
    fn float_and_boolean_codes_compare_numerically() {
        for raw in [r#"{"scanResult": 1.0}"#, r#"{"scanResult": true}"#] {
            let outcome = ScanOutcome::parse(raw).unwrap();
            assert_eq!(outcome.code, 1, "{raw}");
            assert!(outcome.is_malware(), "{raw}");
        }

        let clean = ScanOutcome::parse(r#"{"scanResult": false}"#).unwrap();
        assert_eq!(clean.code, 0);
        let clean = ScanOutcome::parse(r#"{"scanResult": 0.0}"#).unwrap();
        assert_eq!(clean.code, 0);
    }

    #[test]
    fn fractional_or_textual_codes_read_as_unknown() {
        for raw in [r#"{"scanResult": 1.5}"#, r#"{"scanResult": "1"}"#] {
            let outcome = ScanOutcome::parse(raw).unwrap();
            assert_eq!(outcome.code, UNKNOWN_SCAN_RESULT, "{raw}");
            assert!(!outcome.is_malware(), "{raw}");
        }
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            ScanOutcome::parse("not json"),
            Err(OutcomeError::Json(_))
        ));
        assert!(matches!(
            ScanOutcome::parse("[1, 2]"),
            Err(OutcomeError::NotAnObject)
        ));
    }

    #[test]
    fn disposition_header_values() {
        assert_eq!(Disposition::Inline.header_value("a.pdf"), "inline");
        assert_eq!(
            Disposition::Attachment.header_value("a.pdf"),
            "attachment; filename=\"a.pdf\""
        );
        assert_eq!(
            "Attachment".parse::<Disposition>().unwrap(),
            Disposition::Attachment
        );
        assert!("download".parse::<Disposition>().is_err());
    }
}
