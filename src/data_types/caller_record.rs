use indexmap::IndexMap;
use serde::Serialize;

/// Field holding the allele fraction reported by a caller
pub const FIELD_ALLELE_FRACTION: &str = "AAF";
/// Field holding the read depth reported by a caller
pub const FIELD_DEPTH: &str = "DP";

/// Describes a reserved field that could not be coerced to its numeric type
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidField {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str
}

/// One caller's raw measurements for a single genomic key.
/// Values are kept as the strings the caller reported; only AAF and DP are ever interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CallerRecord {
    /// Field name to raw value, in insertion order
    fields: IndexMap<String, String>
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallerRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        }
    }
}

impl CallerRecord {
    /// Sets a field, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Sets a field only if a value is provided
    pub fn insert_opt(&mut self, field: &str, value: Option<String>) {
        if let Some(v) = value {
            self.insert(field, v);
        }
    }

    /// Returns the raw value of a field, missing markers ("." or empty) count as absent
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field)
            .map(|v| v.trim())
            .filter(|v| !is_missing_value(v))
    }

    /// Coerces the allele fraction into a non-negative, finite real.
    /// # Errors
    /// * if the field is present but is not a valid allele fraction
    pub fn allele_fraction(&self) -> Result<Option<f64>, InvalidField> {
        let Some(raw) = self.get(FIELD_ALLELE_FRACTION) else {
            return Ok(None);
        };

        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
            _ => Err(InvalidField {
                field: FIELD_ALLELE_FRACTION,
                value: raw.to_string(),
                expected: "allele fraction"
            })
        }
    }

    /// Coerces the depth into a non-negative integer.
    /// # Errors
    /// * if the field is present but is not a valid depth
    pub fn depth(&self) -> Result<Option<u64>, InvalidField> {
        let Some(raw) = self.get(FIELD_DEPTH) else {
            return Ok(None);
        };

        raw.parse::<u64>()
            .map(Some)
            .map_err(|_e| InvalidField {
                field: FIELD_DEPTH,
                value: raw.to_string(),
                expected: "depth"
            })
    }

    // getters
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// VCF style missing markers
fn is_missing_value(value: &str) -> bool {
    value.is_empty() || value == "."
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_numeric_fields() {
        let record: CallerRecord = [("AAF", "0.35"), ("DP", "80"), ("FILTER", "PASS")].into_iter().collect();
        assert_approx_eq!(record.allele_fraction().unwrap().unwrap(), 0.35);
        assert_eq!(record.depth().unwrap(), Some(80));
        assert_eq!(record.get("FILTER"), Some("PASS"));
    }

    #[test]
    fn test_missing_fields() {
        let record: CallerRecord = [("AAF", "."), ("MQ", "60")].into_iter().collect();
        assert_eq!(record.allele_fraction().unwrap(), None);
        assert_eq!(record.depth().unwrap(), None);
        assert!(CallerRecord::default().is_empty());
    }

    #[test]
    fn test_malformed_fields() {
        let record: CallerRecord = [("AAF", "high"), ("DP", "80.5")].into_iter().collect();
        let err = record.allele_fraction().unwrap_err();
        assert_eq!(err.field, FIELD_ALLELE_FRACTION);
        assert_eq!(err.value, "high");
        let err = record.depth().unwrap_err();
        assert_eq!(err.field, FIELD_DEPTH);
        assert_eq!(err.value, "80.5");

        // negative values are not valid measurements
        let record: CallerRecord = [("AAF", "-0.1"), ("DP", "-3")].into_iter().collect();
        assert!(record.allele_fraction().is_err());
        assert!(record.depth().is_err());
    }

    #[test]
    fn test_serialize_transparent() {
        let mut record = CallerRecord::default();
        record.insert("AAF", "0.4");
        record.insert_opt("DP", Some("120".to_string()));
        record.insert_opt("AD", None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, serde_json::json!({"AAF": "0.4", "DP": "120"}));
    }
}
