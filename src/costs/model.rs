//! Learned slippage fallback
//!
//! Linear model `slippage ~ order_size + market_depth + volatility` fitted by
//! ordinary least squares over a bounded buffer of observations. Until enough
//! observations exist the heuristic
//! `order_size * rate * (1 + multiplier * volatility) * (order_size / market_depth)`
//! is used instead.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

const N_FEATURES: usize = 3;

/// Relative diagonal jitter keeping the normal equations positive definite
/// when a feature is constant across the buffer.
const RIDGE: f64 = 1e-9;

/// Parameters of the slippage model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlippageModelConfig {
    /// Observations required before the fitted model replaces the heuristic
    pub min_observations: usize,
    /// Oldest observations are evicted beyond this bound
    pub max_observations: usize,
    /// Heuristic base rate
    pub heuristic_rate: f64,
    /// Heuristic volatility multiplier
    pub volatility_multiplier: f64,
    /// Heuristic size/depth factor used when depth is zero
    pub empty_depth_factor: f64,
}

impl Default for SlippageModelConfig {
    fn default() -> Self {
        Self {
            min_observations: 5,
            max_observations: 1000,
            heuristic_rate: 0.001,
            volatility_multiplier: 10.0,
            empty_depth_factor: 0.01,
        }
    }
}

/// One realized-slippage sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageObservation {
    pub order_size: f64,
    pub market_depth: f64,
    pub volatility: f64,
    pub slippage: f64,
}

impl SlippageObservation {
    fn features(&self) -> [f64; N_FEATURES] {
        [self.order_size, self.market_depth, self.volatility]
    }
}

/// Fitted coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: [f64; N_FEATURES],
}

impl LinearFit {
    fn predict(&self, features: [f64; N_FEATURES]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.iter())
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Slippage model with its own observation buffer
#[derive(Debug, Clone)]
pub struct SlippageModel {
    config: SlippageModelConfig,
    observations: VecDeque<SlippageObservation>,
    fit: Option<LinearFit>,
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self::new(SlippageModelConfig::default())
    }
}

impl SlippageModel {
    pub fn new(config: SlippageModelConfig) -> Self {
        Self {
            observations: VecDeque::with_capacity(config.max_observations.min(1024)),
            config,
            fit: None,
        }
    }

    pub fn config(&self) -> &SlippageModelConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Current fit, if the buffer is large enough and the system was solvable
    pub fn fit(&self) -> Option<&LinearFit> {
        self.fit.as_ref()
    }

    /// Whether predictions come from the fitted model rather than the heuristic
    pub fn is_trained(&self) -> bool {
        self.observations.len() >= self.config.min_observations && self.fit.is_some()
    }

    /// Record an observation and refit
    pub fn add_observation(&mut self, observation: SlippageObservation) {
        let finite = observation.order_size.is_finite()
            && observation.market_depth.is_finite()
            && observation.volatility.is_finite()
            && observation.slippage.is_finite();
        if !finite {
            debug!(?observation, "Skipping non-finite slippage observation");
            return;
        }

        self.observations.push_back(observation);
        while self.observations.len() > self.config.max_observations {
            self.observations.pop_front();
        }
        self.train();
    }

    /// Refit on the current buffer. Returns false below the observation threshold
    /// or when the normal equations cannot be solved.
    pub fn train(&mut self) -> bool {
        if self.observations.len() < self.config.min_observations {
            self.fit = None;
            return false;
        }

        self.fit = fit_ols(&self.observations);
        if let Some(fit) = &self.fit {
            debug!(
                n = self.observations.len(),
                intercept = fit.intercept,
                beta_size = fit.coefficients[0],
                beta_depth = fit.coefficients[1],
                beta_vol = fit.coefficients[2],
                "Slippage model refitted"
            );
        }
        self.fit.is_some()
    }

    /// Predict slippage, never negative
    pub fn predict(&self, order_size: f64, market_depth: f64, volatility: f64) -> f64 {
        match (&self.fit, self.observations.len() >= self.config.min_observations) {
            (Some(fit), true) => fit
                .predict([order_size, market_depth, volatility])
                .max(0.0),
            _ => self.heuristic(order_size, market_depth, volatility),
        }
    }

    /// Rule-of-thumb estimate used before the model is trained
    pub fn heuristic(&self, order_size: f64, market_depth: f64, volatility: f64) -> f64 {
        let size_to_depth = if market_depth > 0.0 {
            order_size / market_depth
        } else {
            self.config.empty_depth_factor
        };

        order_size
            * self.config.heuristic_rate
            * (1.0 + volatility * self.config.volatility_multiplier)
            * size_to_depth
    }
}

/// OLS with intercept: slopes from the centered normal equations, intercept from the means
fn fit_ols(observations: &VecDeque<SlippageObservation>) -> Option<LinearFit> {
    let n = observations.len() as f64;
    if n == 0.0 {
        return None;
    }

    let mut x_mean = [0.0; N_FEATURES];
    let mut y_mean = 0.0;
    for obs in observations {
        for (m, x) in x_mean.iter_mut().zip(obs.features()) {
            *m += x / n;
        }
        y_mean += obs.slippage / n;
    }

    let mut xtx = [0.0; N_FEATURES * N_FEATURES];
    let mut xty = [0.0; N_FEATURES];
    for obs in observations {
        let features = obs.features();
        let dy = obs.slippage - y_mean;
        for i in 0..N_FEATURES {
            let di = features[i] - x_mean[i];
            xty[i] += di * dy;
            for j in 0..N_FEATURES {
                xtx[i * N_FEATURES + j] += di * (features[j] - x_mean[j]);
            }
        }
    }

    for i in 0..N_FEATURES {
        let diag = xtx[i * N_FEATURES + i];
        xtx[i * N_FEATURES + i] += RIDGE * diag.max(1.0);
    }

    let beta = solve_cholesky(&xtx, &xty)?;
    let coefficients = [beta[0], beta[1], beta[2]];
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(x_mean.iter())
            .map(|(b, m)| b * m)
            .sum::<f64>();

    if intercept.is_finite() && coefficients.iter().all(|b| b.is_finite()) {
        Some(LinearFit {
            intercept,
            coefficients,
        })
    } else {
        None
    }
}

/// Solve `a x = b` for symmetric positive definite `a` (row-major)
fn solve_cholesky(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();

    // A = L * L'
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i * n + j] = sum.sqrt();
            } else {
                let ljj = l[j * n + j];
                if ljj.abs() < 1e-300 {
                    return None;
                }
                l[i * n + j] = sum / ljj;
            }
        }
    }

    // L * y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * y[j];
        }
        y[i] = sum / l[i * n + i];
    }

    // L' * x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }

    Some(x)
}
