#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Comparables-window price prediction.
//!
//! Drives the full pipeline for a query point: derive the search window,
//! fetch comparables from the store, encode the design matrix, fit the ridge
//! model, and score it. [`selector`] runs that pipeline over a parameter
//! grid and keeps the best-scoring candidate; [`batch`] applies prediction
//! across a labelled frame of query points.

pub mod batch;
pub mod selector;

pub use batch::{BatchPrediction, REQUIRED_COLUMNS, predict_many};
pub use selector::{Selection, select};

use price_map_database::{ComparableStore, StoreError};
use price_map_model::{ModelError, RidgeRegression, encode_query, encode_training};
use price_map_property_models::QueryPoint;
use price_map_spatial::{ModelParams, SpatialError, derive_window};
use serde::Serialize;

/// Errors from the prediction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// Invalid window parameters or coordinates.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Store fetch failure (infrastructure, not data scarcity).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encoding or fit failure for this query's data.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Every candidate in a parameter grid failed.
    #[error("no model could be formed: all {attempted} parameter candidates failed")]
    AllCandidatesFailed {
        /// How many candidates were attempted.
        attempted: usize,
    },

    /// Batch input was missing required columns.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema {
        /// Names of the absent columns.
        missing: Vec<String>,
    },
}

/// The outcome of one successful fit-and-predict run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted sale price in GBP.
    pub predicted_price: f64,
    /// In-sample R² of the fitted model.
    pub r_squared: f64,
    /// Parameters the model was fitted with.
    pub params: ModelParams,
    /// Number of comparable records the fit used.
    pub comparables_used: usize,
}

/// Predicts a price for a single query point with fixed parameters.
///
/// # Errors
///
/// Returns [`PredictError::Spatial`] for invalid parameters,
/// [`PredictError::Store`] if the fetch fails, and [`PredictError::Model`]
/// when the window holds too few comparables
/// ([`ModelError::InsufficientData`], whose message names the row count) or
/// the fit fails numerically.
pub fn predict(
    store: &dyn ComparableStore,
    query: &QueryPoint,
    params: &ModelParams,
) -> Result<Prediction, PredictError> {
    let window = derive_window(query, params)?;
    let records = store.fetch_in_window(&window)?;

    if records.is_empty() {
        return Err(ModelError::InsufficientData { rows: 0 }.into());
    }

    let training = encode_training(&records, params.geohash_precision)?;
    let model = RidgeRegression::default().fit(&training.design, &training.prices)?;
    let r_squared = model.r_squared(&training.design, &training.prices);

    let query_row = encode_query(query, params.geohash_precision, &training.vocabulary)?;
    let predicted_price = model.predict(&query_row);

    log::debug!(
        "Predicted {predicted_price:.0} from {} comparables (r2 = {r_squared:.4})",
        training.design.nrows()
    );

    Ok(Prediction {
        predicted_price,
        r_squared,
        params: *params,
        comparables_used: training.design.nrows(),
    })
}
