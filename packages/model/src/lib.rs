#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Numeric modelling for comparable-sales pricing.
//!
//! [`encoder`] turns fetched transaction records into a design matrix
//! (ordinal date, one-hot property type, one-hot geohash bucket) and
//! [`ridge`] fits an L2-regularized least squares model over it, scored by
//! in-sample R².

pub mod encoder;
pub mod ridge;

pub use encoder::{TrainingSet, Vocabulary, encode_query, encode_training};
pub use ridge::{DEFAULT_ALPHA, FittedModel, RidgeRegression};

use price_map_spatial::SpatialError;

/// Errors from encoding or fitting.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Too few comparable records to build a design matrix.
    #[error("cannot build a model from {rows} comparable records")]
    InsufficientData {
        /// How many usable records were available.
        rows: usize,
    },

    /// Numerical failure during the regression fit.
    #[error("regression fit failed: {message}")]
    FitFailure {
        /// Diagnostic detail from the solver.
        message: String,
    },

    /// Invalid coordinate or precision while bucketing.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
