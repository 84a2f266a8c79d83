//! L2-regularized least squares over the comparables design matrix.
//!
//! Solves the normal equations `(XᵀX + αI)β = Xᵀy` by Cholesky, falling
//! back to SVD when the regularized system is still not positive definite.
//! Goodness of fit is in-sample R² against the training data. That is
//! optimistic and known to reward larger geohash vocabularies, but it is the
//! score the existing parameter grids were tuned against, so it stays.

use nalgebra::{DMatrix, DVector};

use crate::ModelError;

/// Default L2 regularization strength. Pure ridge, no L1 component.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// SVD solve tolerance for the rank-deficient fallback path.
const SVD_EPSILON: f64 = f64::EPSILON * 100.0;

/// Ridge regression fitter with a fixed regularization strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeRegression {
    alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl RidgeRegression {
    /// A fitter with a custom regularization strength.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FitFailure`] if `alpha` is negative or
    /// non-finite.
    pub fn with_alpha(alpha: f64) -> Result<Self, ModelError> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(ModelError::FitFailure {
                message: format!("invalid regularization strength {alpha}"),
            });
        }
        Ok(Self { alpha })
    }

    /// Fits coefficients over a design matrix and price vector.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InsufficientData`] for an empty matrix and
    /// [`ModelError::FitFailure`] for shape mismatches, non-finite inputs,
    /// or a system neither Cholesky nor SVD can solve.
    pub fn fit(
        &self,
        design: &DMatrix<f64>,
        prices: &DVector<f64>,
    ) -> Result<FittedModel, ModelError> {
        if design.nrows() == 0 {
            return Err(ModelError::InsufficientData { rows: 0 });
        }
        if design.nrows() != prices.len() {
            return Err(ModelError::FitFailure {
                message: format!(
                    "design matrix has {} rows but price vector has {}",
                    design.nrows(),
                    prices.len()
                ),
            });
        }
        if design.iter().any(|v| !v.is_finite()) || prices.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::FitFailure {
                message: "non-finite value in design matrix or price vector".to_string(),
            });
        }

        let columns = design.ncols();
        let gram = design.transpose() * design + DMatrix::identity(columns, columns) * self.alpha;
        let moment = design.transpose() * prices;

        let coefficients = Self::solve(gram, &moment)?;

        if coefficients.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::FitFailure {
                message: "solver produced non-finite coefficients".to_string(),
            });
        }

        log::debug!(
            "Fitted ridge model over {} rows x {} columns",
            design.nrows(),
            columns
        );

        Ok(FittedModel { coefficients })
    }

    fn solve(gram: DMatrix<f64>, moment: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        if let Some(cholesky) = gram.clone().cholesky() {
            return Ok(cholesky.solve(moment));
        }

        gram.svd(true, true)
            .solve(moment, SVD_EPSILON)
            .map_err(|e| ModelError::FitFailure {
                message: format!("normal equations unsolvable: {e}"),
            })
    }
}

/// A fitted coefficient vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    coefficients: DVector<f64>,
}

impl FittedModel {
    /// Predicts a price for a single encoded row.
    ///
    /// The row must have the same column count as the fitting matrix; the
    /// encoder guarantees this when the same vocabulary is threaded through.
    #[must_use]
    pub fn predict(&self, row: &DVector<f64>) -> f64 {
        self.coefficients.dot(row)
    }

    /// In-sample R²: `1 − RSS/TSS` against the training data.
    ///
    /// A constant price vector scores 1.0 when reproduced exactly and −∞
    /// otherwise, keeping failed fits comparable ("worse than any success")
    /// during parameter selection.
    #[must_use]
    pub fn r_squared(&self, design: &DMatrix<f64>, prices: &DVector<f64>) -> f64 {
        let residuals = prices - design * &self.coefficients;
        let rss = residuals.norm_squared();

        let mean = prices.mean();
        let tss: f64 = prices.iter().map(|y| (y - mean).powi(2)).sum();

        if tss == 0.0 {
            return if rss <= f64::EPSILON {
                1.0
            } else {
                f64::NEG_INFINITY
            };
        }

        1.0 - rss / tss
    }

    /// The raw coefficient vector, in design column order.
    #[must_use]
    pub const fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_linear_relationship() {
        // y = 2*x1 + 3*x2, exactly linear in the features.
        let n = 20;
        let mut design = DMatrix::<f64>::zeros(n, 2);
        let mut prices = DVector::<f64>::zeros(n);
        for i in 0..n {
            let x1 = i as f64 + 1.0;
            let x2 = ((i * i) % 7) as f64 + 1.0;
            design[(i, 0)] = x1;
            design[(i, 1)] = x2;
            prices[i] = 2.0f64.mul_add(x1, 3.0 * x2);
        }

        let model = RidgeRegression::default().fit(&design, &prices).unwrap();
        let r2 = model.r_squared(&design, &prices);
        assert!(r2 > 0.999, "r2 = {r2}");

        let row = DVector::from_vec(vec![10.0, 8.0]);
        let predicted = model.predict(&row);
        assert!((predicted - 44.0).abs() < 1.0, "predicted = {predicted}");
    }

    #[test]
    fn alpha_zero_is_ordinary_least_squares() {
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let prices = DVector::from_vec(vec![2.0, 5.0, 8.0]);

        let model = RidgeRegression::with_alpha(0.0)
            .unwrap()
            .fit(&design, &prices)
            .unwrap();

        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients()[1] - 3.0).abs() < 1e-9);
        assert!((model.r_squared(&design, &prices) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_alpha_is_rejected() {
        assert!(RidgeRegression::with_alpha(-1.0).is_err());
        assert!(RidgeRegression::with_alpha(f64::NAN).is_err());
    }

    #[test]
    fn empty_matrix_is_insufficient_data() {
        let design = DMatrix::<f64>::zeros(0, 3);
        let prices = DVector::<f64>::zeros(0);
        assert!(matches!(
            RidgeRegression::default().fit(&design, &prices),
            Err(ModelError::InsufficientData { rows: 0 })
        ));
    }

    #[test]
    fn shape_mismatch_is_fit_failure() {
        let design = DMatrix::<f64>::zeros(3, 2);
        let prices = DVector::<f64>::zeros(2);
        assert!(matches!(
            RidgeRegression::default().fit(&design, &prices),
            Err(ModelError::FitFailure { .. })
        ));
    }

    #[test]
    fn non_finite_input_is_fit_failure() {
        let design = DMatrix::from_row_slice(2, 1, &[1.0, f64::NAN]);
        let prices = DVector::from_vec(vec![1.0, 2.0]);
        let err = RidgeRegression::default().fit(&design, &prices).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn constant_prices_score_one_when_reproduced() {
        // A single constant column with alpha = 0 reproduces a constant
        // price vector exactly.
        let design = DMatrix::from_element(4, 1, 1.0);
        let prices = DVector::from_element(4, 100.0);
        let model = RidgeRegression::with_alpha(0.0)
            .unwrap()
            .fit(&design, &prices)
            .unwrap();
        assert!((model.r_squared(&design, &prices) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_prices_score_negative_infinity_when_missed() {
        let design = DMatrix::from_element(4, 1, 1.0);
        let prices = DVector::from_element(4, 100.0);
        let model = RidgeRegression::with_alpha(1_000_000.0)
            .unwrap()
            .fit(&design, &prices)
            .unwrap();
        assert_eq!(model.r_squared(&design, &prices), f64::NEG_INFINITY);
    }
}
