//! Constant-coefficient tridiagonal solves.
//!
//! Every axis line of a diffusion sweep solves
//!
//! ```text
//! -c1 u[i-1] + (1 + 2 c1 + c2) u[i] - c1 u[i+1] = rhs[i]
//! ```
//!
//! with zero-flux ends, where the outer neighbour is mirrored and the end
//! diagonals drop to `1 + c1 + c2`. The forward-elimination diagonal and the
//! back-substitution multipliers depend only on `n`, `c1` and `c2`, so they are
//! computed once and reused for every line and every step.

use rayon::prelude::*;

/// Precomputed Thomas factors for one axis, interleaved per substrate:
/// entry `i * substrates + s` belongs to node `i` of substrate `s`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisCoefficients {
    n: usize,
    substrates: usize,
    c1: Vec<f64>,
    denom: Vec<f64>,
    cx: Vec<f64>,
}

impl AxisCoefficients {
    /// `c1[s]` and `c2[s]` are the per-substrate coupling and decay terms.
    #[must_use]
    pub fn build(n: usize, c1: &[f64], c2: &[f64]) -> Self {
        let substrates = c1.len();
        let mut denom = vec![0.0; n * substrates];
        let mut cx = vec![0.0; n * substrates];

        for s in 0..substrates {
            let (a, b) = (c1[s], c2[s]);
            for i in 0..n {
                denom[i * substrates + s] = if n == 1 {
                    1.0 + b
                } else if i == 0 || i == n - 1 {
                    1.0 + a + b
                } else {
                    1.0 + 2.0 * a + b
                };
            }

            cx[s] = -a / denom[s];
            for i in 1..n {
                let idx = i * substrates + s;
                denom[idx] += a * cx[idx - substrates];
                cx[idx] = -a / denom[idx];
            }
        }

        Self {
            n,
            substrates,
            c1: c1.to_vec(),
            denom,
            cx,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Solves in place along `n` consecutive slabs of `slab` values each.
    ///
    /// Element `e` of every slab belongs to substrate `e % substrates`, and all
    /// elements at the same offset form one independent line. When `grain` is
    /// smaller than `slab` the lines are split into chunks of `grain` values
    /// and processed in parallel; `grain` must be a multiple of the substrate
    /// count.
    pub fn solve_slabs(&self, data: &mut [f64], slab: usize, grain: usize) {
        let n = self.n;
        if n == 0 || slab == 0 {
            return;
        }
        debug_assert_eq!(data.len(), n * slab);
        debug_assert_eq!(grain % self.substrates.max(1), 0);

        self.first(&mut data[..slab], grain);
        for i in 1..n {
            let (head, tail) = data.split_at_mut(i * slab);
            self.forward(i, &mut tail[..slab], &head[(i - 1) * slab..], grain);
        }
        for i in (0..n - 1).rev() {
            let (head, tail) = data.split_at_mut((i + 1) * slab);
            self.back(i, &mut head[i * slab..], &tail[..slab], grain);
        }
    }

    fn first(&self, cur: &mut [f64], grain: usize) {
        let kernel = |cur: &mut [f64]| {
            for (e, c) in cur.iter_mut().enumerate() {
                *c /= self.denom[e % self.substrates];
            }
        };
        if grain < cur.len() {
            cur.par_chunks_mut(grain).for_each(kernel);
        } else {
            kernel(cur);
        }
    }

    fn forward(&self, i: usize, cur: &mut [f64], prev: &[f64], grain: usize) {
        let ns = self.substrates;
        let kernel = |(cur, prev): (&mut [f64], &[f64])| {
            for (e, (c, p)) in cur.iter_mut().zip(prev).enumerate() {
                let s = e % ns;
                *c = (*c + self.c1[s] * p) / self.denom[i * ns + s];
            }
        };
        if grain < cur.len() {
            cur.par_chunks_mut(grain)
                .zip(prev.par_chunks(grain))
                .for_each(kernel);
        } else {
            kernel((cur, prev));
        }
    }

    fn back(&self, i: usize, cur: &mut [f64], next: &[f64], grain: usize) {
        let ns = self.substrates;
        let kernel = |(cur, next): (&mut [f64], &[f64])| {
            for (e, (c, x)) in cur.iter_mut().zip(next).enumerate() {
                *c -= self.cx[i * ns + e % ns] * x;
            }
        };
        if grain < cur.len() {
            cur.par_chunks_mut(grain)
                .zip(next.par_chunks(grain))
                .for_each(kernel);
        } else {
            kernel((cur, next));
        }
    }
}
