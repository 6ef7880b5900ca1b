//! Percept-to-action rule storage

use std::collections::HashMap;

use crate::rules::action::Action;
use crate::simulation::perception::Percept;

/// One loaded rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// 1-based position among the table's loaded records
    pub index: usize,
    pub percept: Percept,
    /// Never empty
    pub actions: Vec<Action>,
}

/// Immutable lookup table keyed by the full percept
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    by_percept: HashMap<Percept, usize>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule, assigning the next provenance index
    ///
    /// On a duplicate key nothing is inserted and the existing rule's
    /// index is returned as the error.
    pub(crate) fn insert(
        &mut self,
        percept: Percept,
        actions: Vec<Action>,
    ) -> Result<usize, usize> {
        if let Some(&slot) = self.by_percept.get(&percept) {
            return Err(self.rules[slot].index);
        }
        let index = self.rules.len() + 1;
        self.by_percept.insert(percept, self.rules.len());
        self.rules.push(Rule {
            index,
            percept,
            actions,
        });
        Ok(index)
    }

    /// Exact-match lookup
    pub fn get(&self, percept: &Percept) -> Option<&Rule> {
        self.by_percept.get(percept).map(|&slot| &self.rules[slot])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in file order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Percepts with no rule; each of these falls back at runtime
    pub fn uncovered(&self) -> Vec<Percept> {
        Percept::all()
            .filter(|p| !self.by_percept.contains_key(p))
            .collect()
    }
}
