use std::{fmt, hint, num::NonZeroUsize};

use ndarray::{Array1, Array2, linalg::general_mat_vec_mul};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use crate::{BenchErr, Result};

/// The random number generator of the worker with the given `rank`.
///
/// A fixed `seed` gives every rank its own reproducible stream, no seed draws from the OS.
pub fn worker_rng(seed: Option<u64>, rank: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(rank as u64)),
        None => StdRng::from_os_rng(),
    }
}

/// The operands of `y = alpha * (A @ B) + beta * C`.
#[derive(Debug, Clone)]
pub struct Workload {
    a: Array2<f32>,
    b: Array1<f32>,
    c: Array1<f32>,
    alpha: f32,
    beta: f32,
}

impl Workload {
    /// Draws a workload of dimension `n`, every entry uniform in `[0, 1)`.
    ///
    /// # Arguments
    /// * `n` - Side of the square matrix and length of the vectors.
    /// * `alpha` - Scale of the matrix-vector product.
    /// * `beta` - Scale of the added vector.
    /// * `rng` - The random number generator to draw from.
    ///
    /// # Returns
    /// The workload, or an error if `n` is zero.
    pub fn generate<R: Rng + ?Sized>(n: usize, alpha: f32, beta: f32, rng: &mut R) -> Result<Self> {
        if n == 0 {
            return Err(BenchErr::Workload("dimension must be at least 1".into()));
        }

        let unit = Uniform::new(0.0f32, 1.0).map_err(|e| BenchErr::Workload(e.to_string()))?;

        let a = Array2::from_shape_simple_fn((n, n), || unit.sample(&mut *rng));
        let b = Array1::from_shape_simple_fn(n, || unit.sample(&mut *rng));
        let c = Array1::from_shape_simple_fn(n, || unit.sample(&mut *rng));

        Self::from_parts(a, b, c, alpha, beta)
    }

    /// Builds a workload from explicit operands.
    ///
    /// # Returns
    /// An error if `a` isn't square or the vectors don't match its side.
    pub fn from_parts(
        a: Array2<f32>,
        b: Array1<f32>,
        c: Array1<f32>,
        alpha: f32,
        beta: f32,
    ) -> Result<Self> {
        let (rows, cols) = a.dim();

        if rows != cols || b.len() != cols || c.len() != rows {
            return Err(BenchErr::Workload(format!(
                "shape mismatch: A is {rows}x{cols}, B has {}, C has {}",
                b.len(),
                c.len()
            )));
        }

        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
        })
    }

    pub fn dim(&self) -> usize {
        self.b.len()
    }

    /// Computes one GEMV into `y`, overwriting it.
    pub fn step(&self, y: &mut Array1<f32>) {
        y.assign(&self.c);
        general_mat_vec_mul(self.alpha, &self.a, &self.b, self.beta, y);
    }

    /// Computes the same GEMV `iterations` times and keeps the last result.
    pub fn run(&self, iterations: NonZeroUsize) -> GemvResult {
        let mut y = Array1::zeros(self.dim());

        for _ in 0..iterations.get() {
            // Every iteration must actually run, even though the operands never change.
            self.step(hint::black_box(&mut y));
        }

        GemvResult(y.to_vec())
    }
}

/// The flattened output vector of a GEMV run.
#[derive(Debug, Clone, PartialEq)]
pub struct GemvResult(pub Vec<f32>);

impl fmt::Display for GemvResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;

        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{value}")?;
        }

        f.write_str("]")
    }
}
