//! Error taxonomy for reconciling caller records with annotated variants.
//! Every variant aborts processing of the current sample and carries enough context to diagnose.

use thiserror::Error;

use crate::data_types::callers::CallerName;
use crate::data_types::genomic_key::GenomicKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// A variant lists a caller that has no record at the derived key, usually a key-space mismatch
    #[error("sample {sample}: caller {caller} is listed for {key} but has no record at that key")]
    MissingCallerRecord {
        sample: String,
        key: GenomicKey,
        caller: CallerName
    },

    /// The allele fraction or depth of a caller record could not be coerced to a number
    #[error("sample {sample}: caller {caller} field {field}={value:?} at {key} is not a valid {expected}")]
    MalformedCallerField {
        sample: String,
        key: GenomicKey,
        caller: CallerName,
        field: String,
        value: String,
        expected: &'static str
    },

    /// A caller name outside the configured closed set
    #[error("sample {sample}: unknown caller {caller:?} ({context})")]
    UnknownCaller {
        sample: String,
        caller: String,
        context: String
    },

    /// Two different owners derived the same identity
    #[error("identity {identity} is already assigned to {existing}, cannot reuse it for {incoming}")]
    IdentityCollision {
        identity: String,
        existing: String,
        incoming: String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_caller_record() {
        let error = ReconcileError::MissingCallerRecord {
            sample: "S1".to_string(),
            key: GenomicKey::new("chr1", 100, 101, "A", "T"),
            caller: CallerName::Pindel
        };
        let msg = format!("{error}");
        assert!(msg.contains("sample S1"));
        assert!(msg.contains("pindel"));
        assert!(msg.contains("1:100-101 A>T"));
    }

    #[test]
    fn test_malformed_field() {
        let error = ReconcileError::MalformedCallerField {
            sample: "S1".to_string(),
            key: GenomicKey::new("1", 5, 6, "C", "G"),
            caller: CallerName::Vardict,
            field: "DP".to_string(),
            value: "abc".to_string(),
            expected: "depth"
        };
        let msg = format!("{error}");
        assert!(msg.contains("DP=\"abc\""));
        assert!(msg.contains("valid depth"));
    }

    #[test]
    fn test_unknown_caller() {
        let error = ReconcileError::UnknownCaller {
            sample: "S2".to_string(),
            caller: "gatk".to_string(),
            context: "listed at 1:5-6 C>G".to_string()
        };
        assert!(format!("{error}").contains("unknown caller \"gatk\""));
    }
}
