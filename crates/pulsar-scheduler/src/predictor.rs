//! Online execution-time prediction.
//!
//! An incremental linear least-squares fit over a fixed-width feature
//! vector: observations accumulate into the normal equations, which are
//! re-solved on every `add`. Prediction of zero means "unknown" and callers
//! fall back to declared execution times.

use chrono::TimeDelta;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Feature vector of one pod observation
pub type Metrics = Vec<f64>;

/// Configuration for the least-squares predictor
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Width of the padded feature vector handed to the solver. Longer
    /// inputs are truncated, shorter ones zero-padded.
    pub metric_size: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self { metric_size: 10 }
    }
}

// Tikhonov damping keeps the normal equations solvable while zero-padded
// feature columns carry no information.
const RIDGE_LAMBDA: f64 = 1e-6;
const PIVOT_EPSILON: f64 = 1e-12;

/// Execution-time estimator interface; object-safe so tests can substitute
/// fakes.
pub trait Predictor: Send + Sync {
    /// Fold one observation into the model
    fn add(&self, metrics: &[f64], actual_exec_time: TimeDelta);

    /// Estimated execution time for the given features; zero means unknown
    fn estimate_exec_time(&self, metrics: &[f64]) -> TimeDelta;
}

struct SolverState {
    /// Accumulated XᵀX, row-major
    xtx: Vec<f64>,
    /// Accumulated Xᵀy
    xty: Vec<f64>,
    /// Current least-squares solution, if solvable
    coefficients: Option<Vec<f64>>,
    observations: u64,
}

/// Least-squares predictor over padded pod metrics
pub struct LlspPredictor {
    metric_size: usize,
    state: Mutex<SolverState>,
}

impl LlspPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        let metric_size = config.metric_size;
        Self {
            metric_size,
            state: Mutex::new(SolverState {
                xtx: vec![0.0; metric_size * metric_size],
                xty: vec![0.0; metric_size],
                coefficients: None,
                observations: 0,
            }),
        }
    }

    /// Truncate to the solver width and zero-pad the remainder
    fn pad(&self, metrics: &[f64]) -> Vec<f64> {
        let mut padded = vec![0.0; self.metric_size];
        let take = metrics.len().min(self.metric_size);
        padded[..take].copy_from_slice(&metrics[..take]);
        padded
    }
}

impl Predictor for LlspPredictor {
    fn add(&self, metrics: &[f64], actual_exec_time: TimeDelta) {
        let x = self.pad(metrics);
        let y = actual_exec_time.num_nanoseconds().unwrap_or(i64::MAX) as f64;
        if x.iter().any(|v| !v.is_finite()) || !y.is_finite() {
            warn!("dropping non-finite predictor observation");
            return;
        }

        let n = self.metric_size;
        let mut state = self.state.lock();
        for i in 0..n {
            for j in 0..n {
                state.xtx[i * n + j] += x[i] * x[j];
            }
            state.xty[i] += x[i] * y;
        }
        state.observations += 1;
        let coefficients = solve_damped(n, &state.xtx, &state.xty);
        state.coefficients = coefficients;
        debug!(
            observations = state.observations,
            solved = state.coefficients.is_some(),
            "predictor model updated"
        );
    }

    fn estimate_exec_time(&self, metrics: &[f64]) -> TimeDelta {
        let x = self.pad(metrics);
        let state = self.state.lock();
        let Some(coefficients) = &state.coefficients else {
            return TimeDelta::zero();
        };
        let nanos: f64 = coefficients.iter().zip(&x).map(|(c, v)| c * v).sum();
        if !nanos.is_finite() {
            return TimeDelta::zero();
        }
        TimeDelta::nanoseconds(nanos as i64)
    }
}

/// Solve `(XᵀX + λI) w = Xᵀy` by Gaussian elimination with partial
/// pivoting. Returns `None` when the system is singular despite damping.
fn solve_damped(n: usize, xtx: &[f64], xty: &[f64]) -> Option<Vec<f64>> {
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] = xtx[i * n + j];
        }
        a[i * n + i] += RIDGE_LAMBDA * (1.0 + xtx[i * n + i].abs());
    }
    let mut b = xty.to_vec();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| {
                a[r1 * n + col]
                    .abs()
                    .total_cmp(&a[r2 * n + col].abs())
            })
            .unwrap_or(col);
        if a[pivot_row * n + col].abs() < PIVOT_EPSILON {
            return None;
        }
        if pivot_row != col {
            for j in 0..n {
                a.swap(col * n + j, pivot_row * n + j);
            }
            b.swap(col, pivot_row);
        }
        for row in (col + 1)..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row * n + j] -= factor * a[col * n + j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for j in (row + 1)..n {
            sum -= a[row * n + j] * w[j];
        }
        w[row] = sum / a[row * n + row];
        if !w[row].is_finite() {
            return None;
        }
    }
    Some(w)
}
