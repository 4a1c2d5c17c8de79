//! Traversal analysis for a static ring of `n` positions.
//!
//! Pure helpers: they compute the visiting order the ring cursor produces and
//! how often each position is hit, without touching any ring state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::traversal::StepCursor;

/// Positions visited by one traversal run and the visit count per position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalRun {
    pub sequence: Vec<usize>,
    pub visits: BTreeMap<usize, usize>,
}

/// Generates traversal sequences over a fixed number of positions.
#[derive(Debug, Clone)]
pub struct Traversal {
    cursor: StepCursor,
}

impl Traversal {
    pub fn new(n: usize) -> Self {
        Self {
            cursor: StepCursor::new(n),
        }
    }

    pub fn size(&self) -> usize {
        self.cursor.size()
    }

    pub fn k(&self) -> usize {
        self.cursor.k()
    }

    /// Restarts from position 0 and records the first `length` positions.
    /// Every position appears in `visits`, unvisited ones with a count of 0.
    pub fn generate(&mut self, length: usize) -> TraversalRun {
        self.cursor.reset();

        let mut visits: BTreeMap<usize, usize> = (0..self.size()).map(|p| (p, 0)).collect();
        let mut sequence = Vec::with_capacity(length);

        for _ in 0..length {
            let Some(pos) = self.cursor.next() else {
                break;
            };
            sequence.push(pos);
            *visits.entry(pos).or_insert(0) += 1;
        }

        TraversalRun { sequence, visits }
    }

    /// Position following the last generated one.
    pub fn next(&mut self) -> Option<usize> {
        self.cursor.next()
    }
}

/// Mirrors each position around the midpoint: `v -> (n - 1) - v`.
pub fn reflect(sequence: &[usize], n: usize) -> Vec<usize> {
    sequence
        .iter()
        .map(|&v| n.saturating_sub(v + 1))
        .collect()
}

pub fn reverse(sequence: &[usize]) -> Vec<usize> {
    sequence.iter().rev().copied().collect()
}

/// Reflects then reverses a segment. Applied to a segment of length `n`,
/// this yields a later segment of the same traversal.
pub fn reflect_and_reverse(sequence: &[usize], n: usize) -> Vec<usize> {
    reverse(&reflect(sequence, n))
}
