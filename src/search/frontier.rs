// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Partial route waiting in the [Frontier].
///
/// Candidates are never modified once queued; extending a candidate
/// creates a new one with a copy of the path.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Candidate {
    /// Nodes visited so far, starting with the start node.
    pub path: Vec<i64>,

    /// Sum of edge costs along the path.
    pub cost: f32,

    /// `cost` plus the straight-line distance from the tail to the goal.
    pub score: f32,

    /// Nodes which must be visited next, in order, due to an `only_*` turn restriction.
    pub mandatory: Vec<i64>,
}

impl Candidate {
    /// Candidate at the start node, before any edge was traversed.
    pub fn start(node: i64) -> Self {
        Self {
            path: vec![node],
            cost: 0.0,
            score: 0.0,
            mandatory: Vec::default(),
        }
    }

    /// Last node of the path.
    #[inline]
    pub fn tail(&self) -> i64 {
        // Paths are never empty
        self.path[self.path.len() - 1]
    }

    /// Node visited just before the tail, if any.
    #[inline]
    pub fn before_tail(&self) -> Option<i64> {
        self.path.len().checked_sub(2).map(|i| self.path[i])
    }
}

/// Ordering key of queued candidates: lowest score first,
/// equal scores in insertion order.
#[derive(Debug, Clone, Copy)]
struct Key {
    score: f32,
    seq: u64,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Priority queue of [Candidates](Candidate), holding at most one candidate per tail node.
#[derive(Debug, Default)]
pub(super) struct Frontier {
    queue: BTreeMap<Key, Candidate>,
    by_tail: HashMap<i64, Key>,
    next_seq: u64,
}

impl Frontier {
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes and returns the candidate with the lowest score.
    pub fn pop(&mut self) -> Option<Candidate> {
        let (_, c) = self.queue.pop_first()?;
        self.by_tail.remove(&c.tail());
        Some(c)
    }

    /// Returns the cost of the queued candidate ending at the given node.
    pub fn cost_to(&self, tail: i64) -> Option<f32> {
        self.by_tail
            .get(&tail)
            .and_then(|k| self.queue.get(k))
            .map(|c| c.cost)
    }

    /// Drops the queued candidate ending at the given node, if any.
    pub fn remove(&mut self, tail: i64) {
        if let Some(k) = self.by_tail.remove(&tail) {
            self.queue.remove(&k);
        }
    }

    /// Queues a candidate, replacing any other candidate with the same tail.
    pub fn push(&mut self, c: Candidate) {
        let tail = c.tail();
        self.remove(tail);

        let key = Key {
            score: c.score,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.by_tail.insert(tail, key);
        self.queue.insert(key, c);
    }
}
