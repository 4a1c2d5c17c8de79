//! Stepping state shared by the live ring topology and the static sequence analysis.
//!
//! Positions are visited with the cyclic `[+k, +1, -k, +1]` pattern, where
//! `k = ceil(size / 2)`. Alternating long and short jumps spreads consecutive
//! visits across the ring before any position repeats.

/// Position cursor over a ring of `size` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCursor {
    size: usize,
    k: usize,
    /// Number of `next()` calls not yet undone
    i: usize,
    current: usize,
}

/// Saved `(i, current)` pair, used to roll back a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSnapshot {
    i: usize,
    current: usize,
}

/// Half the ring size, rounded up.
pub fn half_ring(size: usize) -> usize {
    size.div_ceil(2)
}

impl StepCursor {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            k: half_ring(size),
            i: 0,
            current: 0,
        }
    }

    /// Recomputes `k` for a new ring size. The step counter and current
    /// position are kept, so stepping resumes from where it stopped.
    pub fn resize(&mut self, size: usize) {
        self.size = size;
        self.k = half_ring(size);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn steps_taken(&self) -> usize {
        self.i
    }

    /// The signed delta applied by the `i`-th call to `next()`.
    pub fn step(&self, i: usize) -> i64 {
        let k = self.k as i64;
        match i % 4 {
            1 => k,
            3 => -k,
            _ => 1,
        }
    }

    /// Advances to the next position. The very first call anchors at 0.
    /// Returns `None` on an empty ring.
    pub fn next(&mut self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }

        self.current = if self.i == 0 {
            0
        } else {
            self.offset(self.step(self.i))
        };
        self.i += 1;

        Some(self.current)
    }

    /// Undoes the most recent `next()`, restoring the position it started from.
    /// With nothing to undo the cursor stays put.
    pub fn previous(&mut self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        if self.i == 0 {
            return Some(self.current);
        }

        self.i -= 1;
        self.current = if self.i == 0 {
            0
        } else {
            self.offset(-self.step(self.i))
        };

        Some(self.current)
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            i: self.i,
            current: self.current,
        }
    }

    pub fn restore(&mut self, snapshot: CursorSnapshot) {
        self.i = snapshot.i;
        self.current = snapshot.current;
    }

    /// Clears the step counter, the next call anchors at 0 again.
    pub fn reset(&mut self) {
        self.i = 0;
        self.current = 0;
    }

    fn offset(&self, delta: i64) -> usize {
        (self.current as i64 + delta).rem_euclid(self.size as i64) as usize
    }
}
