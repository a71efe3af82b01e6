use common::domain::{AssetPolicyClass, ReadContext};
use std::collections::HashSet;

/// Result of checking a closed buffer against its asset's policy class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessReport {
    pub distinct_tags: usize,
    pub is_complete: bool,
    pub message: String,
}

/// Count distinct EPCs in the buffer and compare against the policy minimum.
///
/// Distinctness is by EPC value only; the same tag seen by several antennas
/// or readers counts once. An incomplete report is advisory and never stops
/// the movement from being dispatched.
pub fn check_completeness(policy: AssetPolicyClass, reads: &[ReadContext]) -> CompletenessReport {
    let distinct_tags = reads
        .iter()
        .map(|read| read.epc.as_str())
        .collect::<HashSet<_>>()
        .len();

    let is_complete = distinct_tags >= policy.required_tags();
    let message = if is_complete {
        "OK".to_string()
    } else {
        match policy {
            AssetPolicyClass::Container | AssetPolicyClass::Vehicle => format!(
                "Expected {} tags for {}, found {}",
                policy.required_tags(),
                policy,
                distinct_tags
            ),
            AssetPolicyClass::Normal => "No tags found".to_string(),
        }
    };

    CompletenessReport {
        distinct_tags,
        is_complete,
        message,
    }
}
