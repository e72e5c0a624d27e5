use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A recorded (or expected) choice for one question.
///
/// Stored untagged, so the JSON form is either a bare option index or an
/// array of option indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

impl Answer {
    pub fn multiple<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Answer::Multiple(indices.into_iter().collect())
    }

    /// Sorted, de-duplicated view of the chosen indices.
    pub fn indices(&self) -> BTreeSet<usize> {
        match self {
            Answer::Single(idx) => BTreeSet::from([*idx]),
            Answer::Multiple(set) => set.clone(),
        }
    }

    /// An emptied multi-select counts as no answer.
    pub fn is_empty(&self) -> bool {
        matches!(self, Answer::Multiple(set) if set.is_empty())
    }

    pub fn contains(&self, option_index: usize) -> bool {
        match self {
            Answer::Single(idx) => *idx == option_index,
            Answer::Multiple(set) => set.contains(&option_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_number_or_array() {
        let single: Answer = serde_json::from_str("2").unwrap();
        assert_eq!(single, Answer::Single(2));

        let multi: Answer = serde_json::from_str("[2, 0, 2]").unwrap();
        assert_eq!(multi, Answer::multiple([0, 2]));
        assert_eq!(serde_json::to_string(&multi).unwrap(), "[0,2]");
    }

    #[test]
    fn empty_multiple_is_unanswered() {
        assert!(Answer::multiple([]).is_empty());
        assert!(!Answer::Single(0).is_empty());
    }
}
