use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::params::{ParamSet, ParamValue};
use crate::models::regressor_trait::{check_fit_input, check_predict_input, Regressor};

pub const KIND: &str = "linear_regression";

/// Relative pivot size below which a direction is treated as collinear.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Ordinary least squares regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub fit_intercept: bool,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self {
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "fit_intercept" => self.fit_intercept = value.as_bool(name)?,
            _ => {
                return Err(ModelError::invalid_param(
                    name,
                    "not a LinearRegression parameter",
                ))
            }
        }
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("fit_intercept".to_string(), self.fit_intercept.into());
        params
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(&x, &y)?;
        let n_features = x.ncols();

        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| ModelError::InvalidInput("empty feature matrix".to_string()))?;
            let y_mean = y.mean().unwrap_or(0.0);
            (x_mean, y_mean)
        } else {
            (Array1::zeros(n_features), 0.0)
        };

        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let gram = xc.t().dot(&xc);
        let rhs = xc.t().dot(&yc);

        let a: Vec<Vec<f64>> = gram.outer_iter().map(|row| row.to_vec()).collect();
        let coefficients = solve_normal_equations(a, rhs.to_vec())?;

        let intercept = if self.fit_intercept {
            y_mean - x_mean.dot(&Array1::from(coefficients.clone()))
        } else {
            0.0
        };

        log::trace!(
            "LinearRegression fitted: coefficients={:?}, intercept={}",
            coefficients,
            intercept
        );

        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        check_predict_input(&x, coefficients.len())?;
        let w = Array1::from(coefficients.clone());
        Ok(x.dot(&w) + self.intercept)
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(LinearRegression {
            fit_intercept: self.fit_intercept,
            ..LinearRegression::default()
        })
    }

    fn state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Solve `a * w = b` for a symmetric positive semi-definite `a` using
/// Gaussian elimination with partial pivoting. Directions whose pivot
/// vanishes get a zero coefficient.
fn solve_normal_equations(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0f64, f64::max);
    let tol = if scale > 0.0 { scale * PIVOT_TOLERANCE } else { PIVOT_TOLERANCE };

    // (row, column) of every accepted pivot
    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut row = 0usize;

    for col in 0..n {
        if row >= n {
            break;
        }
        let (best_row, best_val) = (row..n)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, 0.0f64), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

        if best_val < tol {
            continue;
        }

        a.swap(row, best_row);
        b.swap(row, best_row);

        for r in (row + 1)..n {
            let factor = a[r][col] / a[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[r][c] -= factor * a[row][c];
            }
            b[r] -= factor * b[row];
        }

        pivots.push((row, col));
        row += 1;
    }

    let mut w = vec![0.0f64; n];
    for &(r, c) in pivots.iter().rev() {
        let tail: f64 = ((c + 1)..n).map(|j| a[r][j] * w[j]).sum();
        w[c] = (b[r] - tail) / a[r][c];
    }

    if w.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Numerical(
            "least squares solution is not finite".to_string(),
        ));
    }
    Ok(w)
}
