use serde::Serialize;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

/// The closed set of variant callers whose results can be reconciled.
/// Order here is the order of the per-caller sub-documents in the output.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, strum_macros::Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum CallerName {
    Mutect,
    Freebayes,
    Vardict,
    Scalpel,
    Platypus,
    Pindel,
    /// Structural variant caller, only part of the set when enabled for the run
    Manta
}

impl CallerName {
    /// Returns true if this caller is always part of the caller set
    pub fn is_core(&self) -> bool {
        !matches!(self, CallerName::Manta)
    }
}

/// The callers that are active for a run.
/// Every library-variant document carries one sub-document per member, in enum order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CallerSet {
    /// Active callers, sorted in enum order
    callers: Vec<CallerName>
}

impl Default for CallerSet {
    /// The six core callers
    fn default() -> Self {
        Self::new(false)
    }
}

impl CallerSet {
    /// Constructor
    /// # Arguments
    /// * `include_manta` - if true, manta is added to the six core callers
    pub fn new(include_manta: bool) -> Self {
        let callers = CallerName::iter()
            .filter(|c| c.is_core() || include_manta)
            .collect();
        Self { callers }
    }

    /// Returns true if the caller is part of this set
    pub fn contains(&self, caller: CallerName) -> bool {
        self.callers.contains(&caller)
    }

    /// Converts a raw caller label into a member of this set.
    /// Returns None if the label is not a known caller or if the caller is not enabled.
    /// # Arguments
    /// * `label` - the caller name as written in the input, surrounding whitespace is ignored
    pub fn resolve(&self, label: &str) -> Option<CallerName> {
        CallerName::from_str(label.trim()).ok()
            .filter(|&c| self.contains(c))
    }

    // getters
    pub fn callers(&self) -> &[CallerName] {
        &self.callers
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}
