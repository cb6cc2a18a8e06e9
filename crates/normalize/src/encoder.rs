use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Maps category labels to integer codes.
///
/// Codes follow lexicographic (byte-wise UTF-8, i.e. code point) order of the
/// distinct labels seen at fit time, so the same training data always yields
/// the same codes regardless of row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self {
            classes: unique.into_iter().collect(),
        }
    }

    /// Code for `label`, or `None` when it was not seen during fit.
    pub fn encode(&self, label: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
            .map(|idx| idx as u32)
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
