//! Snapshot gate: skip a run whose downloaded report is byte-identical to
//! the last one processed.

/// Whether a downloaded document needs processing. A document byte-identical
/// to the last processed one cannot hold new notices.
pub fn should_process(current_hash: &str, last_hash: Option<&str>) -> bool {
    last_hash != Some(current_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_processes() {
        assert!(should_process("abc", None));
    }

    #[test]
    fn unchanged_hash_skips() {
        assert!(!should_process("abc", Some("abc")));
    }

    #[test]
    fn changed_hash_processes() {
        assert!(should_process("abd", Some("abc")));
    }
}
