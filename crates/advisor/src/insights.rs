/// Advisory returned for ids outside the table.
pub const UNKNOWN_CLUSTER: &str = "Unknown cluster";

const ADVISORIES: [&str; 7] = [
    "Generally healthy but monitor hormone levels for any changes.",
    "Mild cycle irregularities detected. Track menstrual cycles regularly.",
    "Significant hormonal imbalances. Consult a healthcare professional.",
    "Higher risk of PCOD with metabolic symptoms. Seek medical advice.",
    "Moderate PCOD risk with some symptoms. Lifestyle changes may help manage risks.",
    "Severe PCOD risk detected. Immediate medical evaluation is recommended.",
    "Healthy reproductive cycle, maintain a balanced diet.",
];

/// Static cluster id → advisory table.
///
/// The table is independent of training data. Ids `0..=6` cover every
/// deployable cluster count; anything else, negative ids included, maps to
/// [`UNKNOWN_CLUSTER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightResolver;

impl InsightResolver {
    pub fn lookup(&self, cluster: i64) -> &'static str {
        usize::try_from(cluster)
            .ok()
            .and_then(|idx| ADVISORIES.get(idx))
            .copied()
            .unwrap_or(UNKNOWN_CLUSTER)
    }

    /// Number of ids with a dedicated advisory.
    pub fn known_clusters(&self) -> usize {
        ADVISORIES.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_map_to_their_advisory() {
        let resolver = InsightResolver;
        assert_eq!(
            resolver.lookup(0),
            "Generally healthy but monitor hormone levels for any changes."
        );
        assert_eq!(
            resolver.lookup(6),
            "Healthy reproductive cycle, maintain a balanced diet."
        );
        assert_eq!(resolver.known_clusters(), 7);
    }

    #[test]
    fn lookup_never_fails() {
        let resolver = InsightResolver;
        for id in [-1, 7, 100, i64::MIN, i64::MAX] {
            assert_eq!(resolver.lookup(id), UNKNOWN_CLUSTER);
        }
        for id in 0..7 {
            assert_ne!(resolver.lookup(id), UNKNOWN_CLUSTER);
        }
    }
}
