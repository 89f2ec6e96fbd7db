//! Sample algorithms with a known growth rate.
//!
//! Each workload scales its internal problem size from the requested input
//! size so that the default sweep completes in seconds. The scale is a
//! constant factor and does not change the growth class.

use std::fmt;
use std::hint::black_box;

use clap::ValueEnum;
use serde::Deserialize;

use crate::fitting::ModelKind;
use crate::recorder::CallPath;

/// Repetitions of the inner operation for sub-linear workloads, so a single
/// run is long enough to time.
const SUBLINEAR_REPEAT: u64 = 10_000;

/// Input size divisor for the quadratic workload.
const QUADRATIC_SCALE: u64 = 16;

/// Input size divisor for the cubic workload.
const CUBIC_SCALE: u64 = 200;

/// Input size that doubles the exponential workload's iteration count.
const EXPONENTIAL_DOUBLING: f64 = 2_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    /// Fixed amount of arithmetic regardless of `n`.
    Constant,
    /// Binary search over an implicit sorted range of `n` values.
    Logarithmic,
    /// Sum of `n` values.
    #[default]
    Linear,
    /// Sort of `n` pseudo-random values.
    Linearithmic,
    /// All pairs over `n / 16` values.
    Quadratic,
    /// All triples over `n / 200` values.
    Cubic,
    /// `2^(n / 2000)` iterations.
    Exponential,
}

impl Workload {
    pub const ALL: [Workload; 7] = [
        Workload::Constant,
        Workload::Logarithmic,
        Workload::Linear,
        Workload::Linearithmic,
        Workload::Quadratic,
        Workload::Cubic,
        Workload::Exponential,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Logarithmic => "logarithmic",
            Self::Linear => "linear",
            Self::Linearithmic => "linearithmic",
            Self::Quadratic => "quadratic",
            Self::Cubic => "cubic",
            Self::Exponential => "exponential",
        }
    }

    /// The growth class this workload exhibits.
    pub fn expected(self) -> ModelKind {
        match self {
            Self::Constant => ModelKind::Constant,
            Self::Logarithmic => ModelKind::Logarithmic,
            Self::Linear => ModelKind::Linear,
            Self::Linearithmic => ModelKind::Linearithmic,
            Self::Quadratic => ModelKind::Quadratic,
            Self::Cubic => ModelKind::Cubic,
            Self::Exponential => ModelKind::Exponential,
        }
    }

    /// Call path runs of this workload are recorded under.
    pub fn call_path(self) -> CallPath {
        CallPath::from(["workload", self.as_str()])
    }

    /// Runs the workload once at input size `n` and returns a checksum.
    pub fn run(self, n: u64) -> u64 {
        let n = black_box(n);
        let out = match self {
            Self::Constant => constant(),
            Self::Logarithmic => logarithmic(n),
            Self::Linear => linear(n),
            Self::Linearithmic => linearithmic(n),
            Self::Quadratic => quadratic(n / QUADRATIC_SCALE),
            Self::Cubic => cubic(n / CUBIC_SCALE),
            Self::Exponential => exponential(n),
        };
        black_box(out)
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn constant() -> u64 {
    (0..SUBLINEAR_REPEAT).fold(0u64, |acc, i| acc.wrapping_add(black_box(i) ^ 0x5bd1))
}

fn logarithmic(n: u64) -> u64 {
    let mut found = 0u64;
    for i in 0..SUBLINEAR_REPEAT {
        let target = black_box(i.wrapping_mul(0x9e37_79b9) % n.max(1));
        let (mut lo, mut hi) = (0u64, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if mid < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        found = found.wrapping_add(lo);
    }
    found
}

fn linear(n: u64) -> u64 {
    (0..n).fold(0u64, |acc, i| acc.wrapping_add(black_box(i)))
}

fn linearithmic(n: u64) -> u64 {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut values: Vec<u64> = (0..n)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        })
        .collect();
    values.sort_unstable();
    values.first().copied().unwrap_or_default() ^ values.last().copied().unwrap_or_default()
}

fn quadratic(m: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..m {
        for j in 0..m {
            acc = acc.wrapping_add(black_box(i ^ j));
        }
    }
    acc
}

fn cubic(m: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..m {
        for j in 0..m {
            for k in 0..m {
                acc = acc.wrapping_add(black_box(i ^ j ^ k));
            }
        }
    }
    acc
}

fn exponential(n: u64) -> u64 {
    let iterations = (n as f64 / EXPONENTIAL_DOUBLING).exp2() as u64;
    (0..iterations).fold(0u64, |acc, i| acc.wrapping_add(black_box(i)))
}
