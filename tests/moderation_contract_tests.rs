/// Contract tests for the moderation API surface
///
/// Note: These are unit tests that verify the wire-level contracts are
/// correct. Behavioral tests against the stores live next to the managers.

#[cfg(test)]
mod tests {
    // Staff decide payloads accept actions in any case
    #[test]
    fn test_decision_action_strings_are_case_insensitive() {
        let accepted = ["APPROVE", "approve", "Escalate", "REJECT"];
        for action in accepted {
            let normalized = action.to_lowercase();
            assert!(matches!(
                normalized.as_str(),
                "approve" | "reject" | "escalate"
            ));
        }

        assert!(!matches!("delete", "approve" | "reject" | "escalate"));
    }

    #[test]
    fn test_bearer_header_parsing() {
        let auth_header = "Bearer staff-token-123";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, Some("staff-token-123"));

        let invalid_header = "staff-token-123";
        let token = invalid_header.strip_prefix("Bearer ");
        assert_eq!(token, None);
    }

    // The review queue page size is capped server-side
    #[test]
    fn test_list_limit_clamping() {
        let requested: i64 = 5000;
        let clamped = requested.clamp(1, 200);
        assert_eq!(clamped, 200);

        let unset: Option<i64> = None;
        assert_eq!(unset.unwrap_or(50).clamp(1, 200), 50);
    }

    // Scores are clamped to [0, 100] no matter how many rules match
    #[test]
    fn test_score_clamp_bounds() {
        let accumulated: i64 = 40 * 6;
        assert_eq!(accumulated.clamp(0, 100), 100);
        assert_eq!(0i64.clamp(0, 100), 0);
        assert_eq!(73i64.clamp(0, 100), 73);
    }
}
