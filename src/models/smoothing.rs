//exponential smoothing baselines over the raw training values
//
//smoothing parameters are picked by grid search on the one-step-ahead
//squared error of the training window.

use crate::error::Result;
use crate::features::FeatureRow;
use crate::models::{align, fit_error, train_targets, ModelPort, Prediction};

const FINE_GRID: [f64; 19] = [
    0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85,
    0.9, 0.95,
];
const COARSE_GRID: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
const SEASONAL_GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

//level only
#[derive(Debug, Clone, Default)]
pub struct SimpleExponential;

impl SimpleExponential {
    //returns (sse, final level)
    fn run(values: &[f64], alpha: f64) -> (f64, f64) {
        let mut level = values[0];
        let mut sse = 0.0;
        for &y in &values[1..] {
            sse += (y - level).powi(2);
            level = alpha * y + (1.0 - alpha) * level;
        }
        (sse, level)
    }

    pub fn forecast(values: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let Some(&last) = values.last() else {
            return Err(fit_error(SimpleExponential.name(), "needs at least 1 training value"));
        };

        let (_, level) = FINE_GRID
            .iter()
            .map(|&alpha| Self::run(values, alpha))
            .fold((f64::INFINITY, last), pick_lowest);
        Ok(vec![level; horizon])
    }
}

impl ModelPort for SimpleExponential {
    fn name(&self) -> &str {
        "Simple Exponential Smoothing"
    }

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        let values = train_targets(self.name(), train)?;
        Ok(align(test, Self::forecast(&values, test.len())?))
    }
}

//level + additive trend
#[derive(Debug, Clone, Default)]
pub struct HoltLinear;

impl HoltLinear {
    //returns (sse, (level, trend))
    fn run(values: &[f64], alpha: f64, beta: f64) -> (f64, (f64, f64)) {
        let mut level = values[0];
        let mut trend = values[1] - values[0];
        let mut sse = 0.0;
        for &y in &values[1..] {
            sse += (y - (level + trend)).powi(2);
            let next_level = alpha * y + (1.0 - alpha) * (level + trend);
            trend = beta * (next_level - level) + (1.0 - beta) * trend;
            level = next_level;
        }
        (sse, (level, trend))
    }

    pub fn forecast(values: &[f64], horizon: usize) -> Result<Vec<f64>> {
        if values.len() < 2 {
            return Err(fit_error(HoltLinear.name(), "needs at least 2 training values"));
        }

        let mut best = (f64::INFINITY, (values[values.len() - 1], 0.0));
        for &alpha in &COARSE_GRID {
            for &beta in &COARSE_GRID {
                best = pick_lowest(best, Self::run(values, alpha, beta));
            }
        }

        let (level, trend) = best.1;
        Ok((1..=horizon).map(|h| level + h as f64 * trend).collect())
    }
}

impl ModelPort for HoltLinear {
    fn name(&self) -> &str {
        "Holt Linear Trend"
    }

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        let values = train_targets(self.name(), train)?;
        Ok(align(test, Self::forecast(&values, test.len())?))
    }
}

//level + additive trend + additive weekly seasonality
#[derive(Debug, Clone)]
pub struct HoltWinters {
    pub period: usize,
}

impl Default for HoltWinters {
    fn default() -> Self {
        HoltWinters { period: 7 }
    }
}

struct HoltWintersState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

impl HoltWinters {
    fn run(&self, values: &[f64], alpha: f64, beta: f64, gamma: f64) -> (f64, HoltWintersState) {
        let m = self.period;
        let first: f64 = values[..m].iter().sum::<f64>() / m as f64;
        let second: f64 = values[m..2 * m].iter().sum::<f64>() / m as f64;

        let mut level = first;
        let mut trend = (second - first) / m as f64;
        let mut seasonal: Vec<f64> = values[..m].iter().map(|y| y - first).collect();
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate().skip(m) {
            let season = seasonal[t - m];
            sse += (y - (level + trend + season)).powi(2);

            let next_level = alpha * (y - season) + (1.0 - alpha) * (level + trend);
            trend = beta * (next_level - level) + (1.0 - beta) * trend;
            seasonal.push(gamma * (y - next_level) + (1.0 - gamma) * season);
            level = next_level;
        }

        (
            sse,
            HoltWintersState {
                level,
                trend,
                seasonal,
            },
        )
    }

    pub fn forecast(&self, values: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let m = self.period;
        if m == 0 || values.len() < 2 * m {
            return Err(fit_error(
                self.name(),
                &format!("needs at least {} training values", 2 * m),
            ));
        }

        let mut best: Option<(f64, HoltWintersState)> = None;

        for &alpha in &SEASONAL_GRID {
            for &beta in &SEASONAL_GRID {
                for &gamma in &SEASONAL_GRID {
                    let candidate = self.run(values, alpha, beta, gamma);
                    if best.as_ref().map_or(true, |(sse, _)| candidate.0 < *sse) {
                        best = Some(candidate);
                    }
                }
            }
        }

        let Some((_, state)) = best else {
            return Ok(vec![values[values.len() - 1]; horizon]);
        };

        let n = state.seasonal.len();
        Ok((1..=horizon)
            .map(|h| state.level + h as f64 * state.trend + state.seasonal[n - m + (h - 1) % m])
            .collect())
    }
}

impl ModelPort for HoltWinters {
    fn name(&self) -> &str {
        "Holt-Winters"
    }

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        let values = train_targets(self.name(), train)?;
        Ok(align(test, self.forecast(&values, test.len())?))
    }
}

fn pick_lowest<T>(best: (f64, T), candidate: (f64, T)) -> (f64, T) {
    if candidate.0 < best.0 {
        candidate
    } else {
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_ses_flat_series() {
        let preds = SimpleExponential::forecast(&[50.0; 30], 5).unwrap();
        assert_eq!(preds, vec![50.0; 5]);
    }

    #[test]
    fn test_holt_follows_linear_trend() {
        let values: Vec<f64> = (0..30).map(|i| 10.0 + 2.0 * i as f64).collect();
        let preds = HoltLinear::forecast(&values, 3).unwrap();

        assert!((preds[0] - 70.0).abs() < 1e-6);
        assert!((preds[2] - 74.0).abs() < 1e-6);
    }

    #[test]
    fn test_holt_winters_repeats_weekly_pattern() {
        let pattern = [100.0, 100.0, 100.0, 100.0, 100.0, 0.0, 0.0];
        let values: Vec<f64> = (0..56).map(|i| pattern[i % 7]).collect();
        let preds = HoltWinters::default().forecast(&values, 7).unwrap();

        for (h, p) in preds.iter().enumerate() {
            assert!((p - pattern[h]).abs() < 1e-6, "h={h} p={p}");
        }
    }

    #[test]
    fn test_short_input_is_a_fit_error() {
        assert!(matches!(
            SimpleExponential::forecast(&[], 3),
            Err(EngineError::ModelFit { .. })
        ));
        assert!(matches!(
            HoltLinear::forecast(&[5.0], 3),
            Err(EngineError::ModelFit { .. })
        ));
        assert!(matches!(
            HoltWinters::default().forecast(&[1.0; 13], 7),
            Err(EngineError::ModelFit { .. })
        ));
        assert!(matches!(
            HoltWinters { period: 0 }.forecast(&[1.0; 20], 7),
            Err(EngineError::ModelFit { .. })
        ));

        assert_eq!(SimpleExponential::forecast(&[4.0], 2).unwrap(), vec![4.0; 2]);
    }
}
