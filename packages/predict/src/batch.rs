//! Batch prediction over a labelled frame of query points.
//!
//! Column presence is validated up front so a malformed frame fails before
//! any row work. After that, each row is independent: a row that cannot be
//! parsed or predicted yields a sentinel (NaN price, −∞ R²) carrying the
//! reason, never aborting the rest of the batch.

use chrono::NaiveDate;
use price_map_database::{ComparableStore, Frame};
use price_map_property_models::{PropertyType, QueryPoint};
use price_map_spatial::ModelParams;
use serde::Serialize;

use crate::{PredictError, Prediction, predict, selector};

/// Columns a batch frame must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["latitude", "longitude", "date", "property_type"];

/// Per-row batch outcome, in input order.
///
/// A failed row keeps its slot with `predicted_price` NaN and `r_squared`
/// −∞; the `failure` field always explains why, so a NaN is never silent.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPrediction {
    /// Predicted price, or NaN if the row failed.
    pub predicted_price: f64,
    /// In-sample R² of the row's model, or −∞ if the row failed.
    pub r_squared: f64,
    /// Human-readable reason when the row failed.
    pub failure: Option<String>,
}

impl BatchPrediction {
    fn failed(reason: String) -> Self {
        Self {
            predicted_price: f64::NAN,
            r_squared: f64::NEG_INFINITY,
            failure: Some(reason),
        }
    }

    const fn succeeded(prediction: &Prediction) -> Self {
        Self {
            predicted_price: prediction.predicted_price,
            r_squared: prediction.r_squared,
            failure: None,
        }
    }
}

/// Predicts a price for every row of a labelled frame.
///
/// With fixed `params` each row runs one fit; with `None` each row runs a
/// grid search over [`ModelParams::default_grid`].
///
/// # Errors
///
/// Returns [`PredictError::Schema`] naming every missing required column
/// before any row is processed. Per-row failures do not error; they produce
/// sentinel values in the output.
pub fn predict_many(
    store: &dyn ComparableStore,
    frame: &Frame,
    params: Option<&ModelParams>,
) -> Result<Vec<BatchPrediction>, PredictError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| frame.column_index(c).is_none())
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(PredictError::Schema { missing });
    }

    // Presence was just validated.
    let columns: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .filter_map(|c| frame.column_index(c))
        .collect();
    let [lat_col, lon_col, date_col, type_col] = columns[..] else {
        return Err(PredictError::Schema { missing });
    };

    let grid = ModelParams::default_grid();
    let mut results = Vec::with_capacity(frame.len());

    for (i, row) in frame.rows.iter().enumerate() {
        let query = match parse_query(row, lat_col, lon_col, date_col, type_col) {
            Ok(query) => query,
            Err(reason) => {
                log::warn!("Batch row {i}: {reason}");
                results.push(BatchPrediction::failed(reason));
                continue;
            }
        };

        let outcome = params.map_or_else(
            || selector::select(store, &query, &grid).map(|s| s.best),
            |p| predict(store, &query, p),
        );

        match outcome {
            Ok(prediction) => results.push(BatchPrediction::succeeded(&prediction)),
            Err(e) => {
                log::warn!("Batch row {i} failed: {e}");
                results.push(BatchPrediction::failed(e.to_string()));
            }
        }
    }

    Ok(results)
}

fn parse_query(
    row: &[serde_json::Value],
    lat_col: usize,
    lon_col: usize,
    date_col: usize,
    type_col: usize,
) -> Result<QueryPoint, String> {
    let latitude = number_cell(row, lat_col).ok_or("unparseable latitude")?;
    let longitude = number_cell(row, lon_col).ok_or("unparseable longitude")?;

    let date_text = text_cell(row, date_col).ok_or("missing date")?;
    let date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d")
        .map_err(|e| format!("unparseable date {date_text:?}: {e}"))?;

    let type_text = text_cell(row, type_col).ok_or("missing property type")?;
    let property_type = PropertyType::from_code(&type_text)
        .ok_or_else(|| format!("unrecognized property type code {type_text:?}"))?;

    Ok(QueryPoint {
        latitude,
        longitude,
        date,
        property_type,
    })
}

fn number_cell(row: &[serde_json::Value], col: usize) -> Option<f64> {
    let value = row.get(col)?;
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

fn text_cell(row: &[serde_json::Value], col: usize) -> Option<String> {
    match row.get(col)? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other.as_f64().map(|v| v.to_string()),
    }
}
