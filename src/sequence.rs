// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Relation, Role};

/// Reasons why turn restriction members can't be chained into a single node sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("missing 'from' member")]
    MissingFrom,

    #[error("missing 'to' member")]
    MissingTo,

    #[error("multiple '{0}' members")]
    Multiple(Role),

    #[error("'{0}' member has too few nodes")]
    TooShort(Role),

    #[error("members {0} and {1} have no common node")]
    NoSharedNode(usize, usize),

    #[error("common node of members {0} and {1} is not at their boundary")]
    NotAdjacent(usize, usize),
}

/// Node groups of a turn restriction, in from-via-...-via-to order.
///
/// After a successful [Sequence::sort], the last node of every group is the
/// first node of the following group, so the groups describe one continuous
/// path through the junction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    relation_id: i64,
    groups: Vec<Vec<i64>>,
    valid: bool,
}

/// Returns the first node of `a` which is also present in `b`.
pub fn shared_node(a: &[i64], b: &[i64]) -> Option<i64> {
    a.iter().find(|n| b.contains(n)).copied()
}

/// Checks that there are `from` and `to` groups with at least two nodes each,
/// and that no `via` group is empty.
fn check_shape(groups: &[Vec<i64>]) -> Result<(), SequenceError> {
    let (from, to) = match groups {
        [] => return Err(SequenceError::MissingFrom),
        [_] => return Err(SequenceError::MissingTo),
        [from, .., to] => (from, to),
    };

    if from.len() < 2 {
        return Err(SequenceError::TooShort(Role::From));
    }
    if to.len() < 2 {
        return Err(SequenceError::TooShort(Role::To));
    }
    if groups.iter().any(Vec::is_empty) {
        return Err(SequenceError::TooShort(Role::Via));
    }
    Ok(())
}

impl Sequence {
    /// Collects the node groups of a relation. Exactly one `from` and one `to` member
    /// with at least two nodes each are required; `via` members keep their relation order.
    pub fn new(r: &Relation) -> Result<Self, SequenceError> {
        let mut from: Option<&Vec<i64>> = None;
        let mut to: Option<&Vec<i64>> = None;
        let mut groups: Vec<Vec<i64>> = vec![];

        for m in &r.members {
            match m.role {
                Role::From if from.is_some() => return Err(SequenceError::Multiple(Role::From)),
                Role::From => from = Some(&m.nodes),
                Role::To if to.is_some() => return Err(SequenceError::Multiple(Role::To)),
                Role::To => to = Some(&m.nodes),
                Role::Via => groups.push(m.nodes.clone()),
            }
        }

        let from = from.ok_or(SequenceError::MissingFrom)?;
        let to = to.ok_or(SequenceError::MissingTo)?;

        groups.insert(0, from.clone());
        groups.push(to.clone());
        check_shape(&groups)?;

        Ok(Self::from_groups(r.id, groups))
    }

    /// Creates a sequence from already collected node groups.
    pub fn from_groups(relation_id: i64, groups: Vec<Vec<i64>>) -> Self {
        Self {
            relation_id,
            groups,
            valid: false,
        }
    }

    pub fn relation_id(&self) -> i64 {
        self.relation_id
    }

    pub fn groups(&self) -> &[Vec<i64>] {
        &self.groups
    }

    /// True once [Sequence::sort] has succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Reverses groups so that consecutive groups share their boundary node.
    ///
    /// Every group following another one may be reversed to start with the common node,
    /// but only the `from` group may be reversed to end with it - any other group
    /// would otherwise be flipped twice, once as each side of a boundary.
    pub fn sort(&mut self) -> Result<(), SequenceError> {
        self.valid = false;
        check_shape(&self.groups)?;

        for i in 0..self.groups.len().saturating_sub(1) {
            let j = i + 1;
            let common = shared_node(&self.groups[i], &self.groups[j])
                .ok_or(SequenceError::NoSharedNode(i, j))?;

            if self.groups[j].first() != Some(&common) {
                self.groups[j].reverse();
            }

            if i == 0 && self.groups[i].last() != Some(&common) {
                self.groups[i].reverse();
            }

            if self.groups[i].last() != self.groups[j].first() {
                return Err(SequenceError::NotAdjacent(i, j));
            }
        }

        self.valid = true;
        Ok(())
    }

    /// The last two nodes of the `from` group, the latter being the entry into the junction.
    ///
    /// # Panics
    ///
    /// This and the following accessors panic if the sequence has not been
    /// successfully [sorted](Sequence::sort).
    pub fn from_nodes(&self) -> [i64; 2] {
        let from = &self.groups[0];
        [from[from.len() - 2], from[from.len() - 1]]
    }

    /// Nodes of all `via` groups, without the node each group shares with its predecessor.
    pub fn via_nodes(&self) -> Vec<i64> {
        let last = self.groups.len() - 1;
        self.groups[1..last]
            .iter()
            .flat_map(|g| g[1..].iter().copied())
            .collect()
    }

    /// First node of the `to` group which is not shared with the preceding group.
    pub fn to_node(&self) -> i64 {
        self.groups[self.groups.len() - 1][1]
    }
}
