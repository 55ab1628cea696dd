// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, warn};

use crate::osm::{Profile, TurnRestriction};
use crate::{Relation, Sequence};

/// Ordered sequence of node ids, used as a key of turn restriction patterns.
///
/// Matching is done element-wise on the ids, so that e.g. `[1, 23]`
/// never matches a path going through `[12, 3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeSequence(Box<[i64]>);

impl NodeSequence {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks if this sequence occurs contiguously anywhere in the path.
    pub fn occurs_in(&self, path: &[i64]) -> bool {
        !self.0.is_empty() && path.windows(self.0.len()).any(|w| w == &*self.0)
    }

    /// Checks if the path ends with this sequence.
    pub fn is_suffix_of(&self, path: &[i64]) -> bool {
        path.ends_with(&self.0)
    }
}

impl From<Vec<i64>> for NodeSequence {
    fn from(nodes: Vec<i64>) -> Self {
        Self(nodes.into_boxed_slice())
    }
}

impl From<&[i64]> for NodeSequence {
    fn from(nodes: &[i64]) -> Self {
        Self(nodes.into())
    }
}

impl Borrow<[i64]> for NodeSequence {
    fn borrow(&self) -> &[i64] {
        &self.0
    }
}

/// Forbidden and mandatory node sequences of a single [Profile],
/// derived from turn restriction relations.
///
/// Every sequence comes from a single relation, and a relation contributes
/// either a forbidden or a mandatory sequence, never both.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RestrictionSet {
    forbidden: HashSet<NodeSequence>,
    forbidden_lengths: BTreeSet<usize>,

    /// Maps a triggering path suffix to the nodes which must immediately follow it.
    mandatory: HashMap<NodeSequence, Vec<i64>>,
    mandatory_lengths: BTreeSet<usize>,
}

impl RestrictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of forbidden sequences.
    pub fn forbidden_len(&self) -> usize {
        self.forbidden.len()
    }

    /// Number of mandatory sequences.
    pub fn mandatory_len(&self) -> usize {
        self.mandatory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forbidden.is_empty() && self.mandatory.is_empty()
    }

    /// Interprets a turn restriction relation for the given [Profile].
    ///
    /// `no_*` restrictions forbid the whole from-via-to node sequence.
    /// `only_*` restrictions make the via and to nodes mandatory once the path
    /// enters the junction through the last two nodes of the `from` member.
    ///
    /// Relations which don't apply to the profile are skipped, as are relations
    /// whose members can't be chained together (those are logged).
    /// Returns true if the relation was recorded.
    pub fn add_relation(&mut self, r: &Relation, profile: &Profile<'_>) -> bool {
        let kind = profile.restriction_kind(&r.tags);
        if kind == TurnRestriction::Inapplicable {
            debug!(
                "relation {} is not a turn restriction for the {} profile",
                r.id, profile.name
            );
            return false;
        }

        let sequence = match Sequence::new(r).and_then(|mut s| s.sort().map(|_| s)) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping turn restriction {}: {}", r.id, e);
                return false;
            }
        };

        let from = sequence.from_nodes();
        let mut continuation = sequence.via_nodes();
        continuation.push(sequence.to_node());

        match kind {
            TurnRestriction::Prohibitory => {
                let mut nodes = from.to_vec();
                nodes.extend_from_slice(&continuation);
                self.forbid(nodes);
            }

            TurnRestriction::Mandatory => self.require(from.to_vec(), continuation),

            TurnRestriction::Inapplicable => return false,
        }

        true
    }

    /// Marks a sequence of nodes as forbidden.
    pub fn forbid(&mut self, nodes: Vec<i64>) {
        if nodes.is_empty() {
            return;
        }
        self.forbidden_lengths.insert(nodes.len());
        self.forbidden.insert(nodes.into());
    }

    /// Requires `continuation` to immediately follow any path ending with `trigger`.
    pub fn require(&mut self, trigger: Vec<i64>, continuation: Vec<i64>) {
        if trigger.is_empty() || continuation.is_empty() {
            return;
        }
        self.mandatory_lengths.insert(trigger.len());
        self.mandatory.insert(trigger.into(), continuation);
    }

    /// Returns true if any forbidden sequence occurs anywhere in the path.
    pub fn forbids(&self, path: &[i64]) -> bool {
        self.forbidden_lengths.iter().any(|&len| {
            path.windows(len)
                .any(|window| self.forbidden.contains(window))
        })
    }

    /// Returns the nodes which must follow the path, as required by the longest
    /// mandatory sequence matching the end of the path. Returns an empty slice
    /// if the path doesn't end with any mandatory sequence.
    pub fn required(&self, path: &[i64]) -> &[i64] {
        self.mandatory_lengths
            .iter()
            .rev()
            .filter(|&&len| len <= path.len())
            .find_map(|&len| self.mandatory.get(&path[path.len() - len..]))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterates over all forbidden sequences, in no particular order.
    pub fn forbidden(&self) -> impl Iterator<Item = &NodeSequence> {
        self.forbidden.iter()
    }

    /// Iterates over all mandatory sequences and their continuations, in no particular order.
    pub fn mandatory(&self) -> impl Iterator<Item = (&NodeSequence, &[i64])> {
        self.mandatory.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{BICYCLE_PROFILE, BUS_PROFILE, CAR_PROFILE, FOOT_PROFILE};
    use crate::{Member, Role};

    macro_rules! tags {
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn restriction(id: i64, tags: crate::Tags, members: &[(Role, &[i64])]) -> Relation {
        Relation {
            id,
            members: members
                .iter()
                .map(|&(role, nodes)| Member {
                    role,
                    nodes: nodes.to_vec(),
                })
                .collect(),
            tags,
        }
    }

    #[test]
    fn node_sequence_matching() {
        let s = NodeSequence::from(vec![1, 23]);
        assert!(s.occurs_in(&[5, 1, 23, 7]));
        assert!(!s.occurs_in(&[12, 3]));
        assert!(!s.occurs_in(&[1, 2, 3]));
        assert!(s.is_suffix_of(&[7, 1, 23]));
        assert!(!s.is_suffix_of(&[1, 23, 7]));
    }

    #[test]
    fn forbidden_sequence_anywhere_in_path() {
        let mut r = RestrictionSet::new();
        r.forbid(vec![1, 2, 3]);

        assert!(r.forbids(&[1, 2, 3]));
        assert!(r.forbids(&[0, 1, 2, 3]));
        assert!(r.forbids(&[1, 2, 3, 4, 5]));
        assert!(!r.forbids(&[1, 2]));
        assert!(!r.forbids(&[3, 2, 1]));
        assert!(!r.forbids(&[1, 2, 4, 3]));
    }

    #[test]
    fn forbidden_sequence_ids_are_not_text() {
        let mut r = RestrictionSet::new();
        r.forbid(vec![1, 23]);

        assert!(!r.forbids(&[12, 3]));
        assert!(!r.forbids(&[11, 23]));
        assert!(r.forbids(&[11, 1, 23]));
    }

    #[test]
    fn required_longest_suffix() {
        let mut r = RestrictionSet::new();
        r.require(vec![2, 3], vec![4]);
        r.require(vec![1, 2, 3], vec![5, 6]);

        assert_eq!(r.required(&[1, 2, 3]), &[5, 6]);
        assert_eq!(r.required(&[0, 2, 3]), &[4]);
        assert_eq!(r.required(&[3]), &[] as &[i64]);
        assert_eq!(r.required(&[2, 3, 4]), &[] as &[i64]);
        assert_eq!(r.required(&[]), &[] as &[i64]);
    }

    #[test]
    fn prohibitory_relation() {
        let rel = restriction(
            -200,
            tags! {"type": "restriction", "restriction": "no_left_turn"},
            &[(Role::From, &[-8, -7]), (Role::Via, &[-7]), (Role::To, &[-3, -7])],
        );

        let mut r = RestrictionSet::new();
        assert!(r.add_relation(&rel, &CAR_PROFILE));
        assert_eq!(r.forbidden_len(), 1);
        assert_eq!(r.mandatory_len(), 0);
        assert!(r.forbids(&[-8, -7, -3]));
        assert!(!r.forbids(&[-8, -7, -62]));
    }

    #[test]
    fn mandatory_relation() {
        let rel = restriction(
            -201,
            tags! {"type": "restriction", "restriction": "only_right_turn"},
            &[(Role::From, &[-1, -2]), (Role::Via, &[-2]), (Role::To, &[-2, -3])],
        );

        let mut r = RestrictionSet::new();
        assert!(r.add_relation(&rel, &CAR_PROFILE));
        assert_eq!(r.forbidden_len(), 0);
        assert_eq!(r.mandatory_len(), 1);
        assert_eq!(r.required(&[-1, -2]), &[-3]);
        assert!(!r.forbids(&[-1, -2, -61]));
    }

    #[test]
    fn mandatory_relation_with_via_way() {
        let rel = restriction(
            1,
            tags! {"type": "restriction", "restriction": "only_straight_on"},
            &[(Role::From, &[1, 2]), (Role::Via, &[4, 3, 2]), (Role::To, &[4, 5])],
        );

        let mut r = RestrictionSet::new();
        assert!(r.add_relation(&rel, &CAR_PROFILE));
        assert_eq!(r.required(&[0, 1, 2]), &[3, 4, 5]);
    }

    #[test]
    fn exempted_relation() {
        let rel = restriction(
            -202,
            tags! {"type": "restriction", "restriction": "no_left_turn", "except": "psv;motorcar"},
            &[(Role::From, &[-3, -7]), (Role::Via, &[-3]), (Role::To, &[-3, -5])],
        );

        let mut car = RestrictionSet::new();
        assert!(!car.add_relation(&rel, &CAR_PROFILE));
        assert!(car.is_empty());

        let mut bus = RestrictionSet::new();
        assert!(!bus.add_relation(&rel, &BUS_PROFILE));

        let mut bicycle = RestrictionSet::new();
        assert!(bicycle.add_relation(&rel, &BICYCLE_PROFILE));
        assert!(bicycle.forbids(&[-7, -3, -5]));
    }

    #[test]
    fn pedestrian_restrictions_must_be_explicit() {
        let members: &[(Role, &[i64])] =
            &[(Role::From, &[1, 2]), (Role::Via, &[2]), (Role::To, &[2, 3])];

        let generic = restriction(
            1,
            tags! {"type": "restriction", "restriction": "no_right_turn"},
            members,
        );
        let mut r = RestrictionSet::new();
        assert!(!r.add_relation(&generic, &FOOT_PROFILE));

        let explicit = restriction(
            2,
            tags! {"type": "restriction", "restriction:foot": "no_straight_on"},
            members,
        );
        assert!(r.add_relation(&explicit, &FOOT_PROFILE));
        assert!(r.forbids(&[1, 2, 3]));
    }

    #[test]
    fn mode_specific_restriction_overrides_generic() {
        let rel = restriction(
            1,
            tags! {
                "type": "restriction",
                "restriction": "no_left_turn",
                "restriction:bus": "only_left_turn"
            },
            &[(Role::From, &[1, 2]), (Role::Via, &[2]), (Role::To, &[2, 3])],
        );

        let mut car = RestrictionSet::new();
        car.add_relation(&rel, &CAR_PROFILE);
        assert!(car.forbids(&[1, 2, 3]));

        let mut bus = RestrictionSet::new();
        bus.add_relation(&rel, &BUS_PROFILE);
        assert!(!bus.forbids(&[1, 2, 3]));
        assert_eq!(bus.required(&[1, 2]), &[3]);
    }

    #[test]
    fn inapplicable_relations() {
        let members: &[(Role, &[i64])] =
            &[(Role::From, &[1, 2]), (Role::Via, &[2]), (Role::To, &[2, 3])];
        let mut r = RestrictionSet::new();

        let no_kind = restriction(1, tags! {"type": "restriction"}, members);
        assert!(!r.add_relation(&no_kind, &CAR_PROFILE));

        let bad_kind = restriction(
            2,
            tags! {"type": "restriction", "restriction": "give_way"},
            members,
        );
        assert!(!r.add_relation(&bad_kind, &CAR_PROFILE));

        let dangling = restriction(
            3,
            tags! {"type": "restriction", "restriction": "no_u_turn"},
            &[(Role::From, &[1, 2]), (Role::Via, &[7]), (Role::To, &[2, 3])],
        );
        assert!(!r.add_relation(&dangling, &CAR_PROFILE));

        assert!(r.is_empty());
    }

    #[test]
    fn add_relation_twice() {
        let rel = restriction(
            -200,
            tags! {"type": "restriction", "restriction": "no_left_turn"},
            &[(Role::From, &[-8, -7]), (Role::Via, &[-7]), (Role::To, &[-7, -3])],
        );

        let mut once = RestrictionSet::new();
        once.add_relation(&rel, &CAR_PROFILE);

        let mut twice = RestrictionSet::new();
        twice.add_relation(&rel, &CAR_PROFILE);
        twice.add_relation(&rel, &CAR_PROFILE);

        assert_eq!(once, twice);
    }
}
