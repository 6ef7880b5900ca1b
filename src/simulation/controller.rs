//! Reflex controller: percept in, action sequence out

use serde::Serialize;

use crate::rules::action::Action;
use crate::rules::table::RuleTable;
use crate::simulation::perception::Percept;

/// Escape policy when no rule matches: turn, then advance
pub const FALLBACK_ACTIONS: [Action; 2] = [Action::RotateRight, Action::MoveForward];

/// Resolved action sequence and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub actions: Vec<Action>,
    /// Provenance index of the matched rule, `None` for the fallback
    pub matched_rule: Option<usize>,
}

impl Decision {
    pub fn fallback() -> Self {
        Self {
            actions: FALLBACK_ACTIONS.to_vec(),
            matched_rule: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.matched_rule.is_none()
    }
}

/// Exact-match lookup with the fallback policy; never fails
pub fn decide(percept: &Percept, table: &RuleTable) -> Decision {
    match table.get(percept) {
        Some(rule) => Decision {
            actions: rule.actions.clone(),
            matched_rule: Some(rule.index),
        },
        None => {
            tracing::debug!(percept = %percept, "No rule matched, using fallback");
            Decision::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_rule_table;

    fn percept(fields: [&str; 5]) -> Percept {
        Percept::from_fields(fields).unwrap()
    }

    #[test]
    fn test_matching_rule_returns_stored_sequence() {
        let table = parse_rule_table("0,.,.,.,0,MOVE_FORWARD\n").unwrap();
        let decision = decide(&percept(["0", ".", ".", ".", "0"]), &table);

        assert_eq!(decision.actions, vec![Action::MoveForward]);
        assert_eq!(decision.matched_rule, Some(1));
        assert!(!decision.is_fallback());
    }

    #[test]
    fn test_empty_table_falls_back() {
        let table = RuleTable::new();
        for p in Percept::all() {
            let decision = decide(&p, &table);
            assert_eq!(decision.actions, vec![Action::RotateRight, Action::MoveForward]);
            assert_eq!(decision.matched_rule, None);
        }
    }

    #[test]
    fn test_partial_match_is_not_a_match() {
        let table = parse_rule_table("0,.,.,.,0,MOVE_FORWARD\n").unwrap();
        // Same arc, different contact flag
        let decision = decide(&percept(["0", ".", ".", ".", "1"]), &table);
        assert!(decision.is_fallback());
    }

    #[test]
    fn test_provenance_survives_many_rules() {
        let csv_str = "\
# header
0,P,P,P,1,ROTATE_LEFT
1,.,.,.,0,MOVE_FORWARD
0,L,.,L,0,MOVE_FORWARD,MOVE_FORWARD
";
        let table = parse_rule_table(csv_str).unwrap();

        let d = decide(&percept(["0", "L", ".", "L", "0"]), &table);
        assert_eq!(d.matched_rule, Some(3));
        assert_eq!(d.actions, vec![Action::MoveForward, Action::MoveForward]);

        let d = decide(&percept(["0", "P", "P", "P", "1"]), &table);
        assert_eq!(d.matched_rule, Some(1));
    }
}
