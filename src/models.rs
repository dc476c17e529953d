use crate::constants::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One flattened output row: flattened key -> scalar value.
pub type FlatRecord = BTreeMap<String, String>;

/// Policy applied when a grouping tag carries no identifier attribute.
///
/// The source feeds occasionally omit the `id` attribute on a grouping
/// element; whether the previous identifier should bleed into such a group
/// is a data question, so both readings are selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingIdPolicy {
    /// Keep the previous working record, identifier included.
    CarryForward,
    /// Suppress rows until the next grouping tag that carries an identifier.
    SkipGroup,
}

impl MissingIdPolicy {
    /// Returns a human-readable name for the policy.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CarryForward => "carry-forward",
            Self::SkipGroup => "skip-group",
        }
    }
}

impl From<&str> for MissingIdPolicy {
    fn from(value: &str) -> Self {
        // Trim whitespace and compare case-insensitively
        let lower = value.trim().to_lowercase();

        if SKIP_GROUP_ALIASES.contains(&lower.as_str()) {
            Self::SkipGroup
        } else if CARRY_FORWARD_ALIASES.contains(&lower.as_str()) {
            Self::CarryForward
        } else {
            // Default silently to CarryForward; callers can decide to log if needed.
            Self::CarryForward
        }
    }
}

/// Outcome of one conversion, returned by the writer and logged by the CLI.
#[derive(Debug)]
pub struct ConversionSummary {
    /// Rows in the final deduplicated table.
    pub rows: usize,
    /// Columns in the final table (union of all flattened keys).
    pub columns: usize,
    /// Intermediate chunk files written before the merge.
    pub chunks: usize,
    /// Final output path, `None` when the input held no records.
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::MissingIdPolicy;

    #[test]
    fn test_missing_id_policy_carry_forward_primary_alias() {
        let policy = MissingIdPolicy::from("carry-forward");
        assert_eq!(policy, MissingIdPolicy::CarryForward);
    }

    #[test]
    fn test_missing_id_policy_carry_forward_short_alias() {
        let policy = MissingIdPolicy::from("carry");
        assert_eq!(policy, MissingIdPolicy::CarryForward);
    }

    #[test]
    fn test_missing_id_policy_skip_group_primary_alias() {
        let policy = MissingIdPolicy::from("skip-group");
        assert_eq!(policy, MissingIdPolicy::SkipGroup);
    }

    #[test]
    fn test_missing_id_policy_skip_group_short_alias() {
        let policy = MissingIdPolicy::from("skip");
        assert_eq!(policy, MissingIdPolicy::SkipGroup);
    }

    #[test]
    fn test_missing_id_policy_case_insensitive() {
        let policy = MissingIdPolicy::from("SKIP-GROUP");
        assert_eq!(policy, MissingIdPolicy::SkipGroup);

        let policy = MissingIdPolicy::from("Carry-Forward");
        assert_eq!(policy, MissingIdPolicy::CarryForward);
    }

    #[test]
    fn test_missing_id_policy_unknown_defaults_to_carry_forward() {
        let policy = MissingIdPolicy::from("unknown-policy");
        assert_eq!(policy, MissingIdPolicy::CarryForward);
    }

    #[test]
    fn test_missing_id_policy_whitespace() {
        let policy = MissingIdPolicy::from("  skip  ");
        assert_eq!(policy, MissingIdPolicy::SkipGroup);
    }

    #[test]
    fn test_missing_id_policy_display_name() {
        assert_eq!(MissingIdPolicy::CarryForward.display_name(), "carry-forward");
        assert_eq!(MissingIdPolicy::SkipGroup.display_name(), "skip-group");
    }
}
