use crate::error::Result;
use crate::features::FeatureRow;
use crate::models::{fit_error, train_targets, ModelPort, Prediction};
use nalgebra::{DMatrix, DVector};

//ridge regression on standardized feature columns
//the intercept is not penalized
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    pub lambda: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        RidgeRegression { lambda: 1.0 }
    }
}

//fitted coefficients plus the column scaling learned from the training rows
#[derive(Debug, Clone)]
pub struct RidgeFit {
    means: Vec<f64>,
    scales: Vec<f64>,
    intercept: f64,
    coefficients: DVector<f64>,
}

impl RidgeFit {
    pub fn predict(&self, features: &[f64]) -> f64 {
        let scaled = features
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale);

        self.intercept
            + scaled
                .zip(self.coefficients.iter())
                .map(|(x, beta)| x * beta)
                .sum::<f64>()
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }
}

impl RidgeRegression {
    pub fn new(lambda: f64) -> Self {
        RidgeRegression { lambda }
    }

    pub fn fit(&self, train: &[FeatureRow]) -> Result<RidgeFit> {
        let targets = train_targets(self.name(), train)?;
        let rows: Vec<Vec<f64>> = train.iter().map(|r| r.to_vector()).collect();
        let n = rows.len();
        let p = FeatureRow::WIDTH;

        //column standardization; constant columns keep a unit scale
        let mut means = vec![0.0; p];
        let mut scales = vec![1.0; p];
        for j in 0..p {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n as f64;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n as f64;
            means[j] = mean;
            if var > 0.0 {
                scales[j] = var.sqrt();
            }
        }

        let y_mean = targets.iter().sum::<f64>() / n as f64;
        let x = DMatrix::from_fn(n, p, |i, j| (rows[i][j] - means[j]) / scales[j]);
        let y = DVector::from_iterator(n, targets.iter().map(|v| v - y_mean));

        //centered design, so the intercept is the target mean
        let gram = x.transpose() * &x + DMatrix::identity(p, p) * self.lambda;
        let rhs = x.transpose() * y;

        let coefficients = gram
            .cholesky()
            .ok_or_else(|| fit_error(self.name(), "normal equations are not positive definite"))?
            .solve(&rhs);

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(fit_error(self.name(), "non-finite coefficients"));
        }

        Ok(RidgeFit {
            means,
            scales,
            intercept: y_mean,
            coefficients,
        })
    }
}

impl ModelPort for RidgeRegression {
    fn name(&self) -> &str {
        "Ridge Regression"
    }

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        if self.lambda <= 0.0 {
            return Err(fit_error(self.name(), "lambda must be positive"));
        }

        let fit = self.fit(train)?;

        Ok(test
            .iter()
            .map(|row| Prediction::new(row.date, fit.predict(&row.to_vector())))
            .collect())
    }
}
