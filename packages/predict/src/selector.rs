//! Parameter grid search.
//!
//! Fits one model per candidate triple and keeps the candidate with the
//! highest in-sample R². Candidates that cannot produce a model (too few
//! comparables, a numerical fit failure, or invalid grid parameters) are
//! recorded as skipped and never abort the search. Only when every candidate
//! fails does the selector return a typed failure.

use price_map_database::ComparableStore;
use price_map_property_models::QueryPoint;
use price_map_spatial::ModelParams;
use serde::Serialize;

use crate::{PredictError, Prediction, predict};

/// Result of a grid search: the winning prediction plus per-candidate
/// diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// The best-scoring candidate's prediction.
    pub best: Prediction,
    /// Every candidate that produced a model, with its R², in grid order.
    pub fits: Vec<(ModelParams, f64)>,
    /// Candidates that were skipped, with the reason.
    pub skipped: Vec<(ModelParams, String)>,
}

/// Searches a candidate grid and returns the best fit.
///
/// Ties break toward the first-encountered maximum: a later candidate
/// replaces the incumbent only with a strictly higher R², and grid iteration
/// order is the caller's slice order.
///
/// # Errors
///
/// Returns [`PredictError::AllCandidatesFailed`] if no candidate produces a
/// model (including an empty grid), or [`PredictError::Store`] if a fetch
/// fails for infrastructure reasons; data scarcity is a per-candidate skip,
/// a broken store is not.
pub fn select(
    store: &dyn ComparableStore,
    query: &QueryPoint,
    candidates: &[ModelParams],
) -> Result<Selection, PredictError> {
    let mut best: Option<Prediction> = None;
    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for params in candidates {
        match predict(store, query, params) {
            Ok(prediction) => {
                fits.push((*params, prediction.r_squared));
                if best.is_none_or(|b| prediction.r_squared > b.r_squared) {
                    best = Some(prediction);
                }
            }
            Err(PredictError::Store(e)) => return Err(PredictError::Store(e)),
            Err(e) => {
                log::debug!("Skipping candidate {params:?}: {e}");
                skipped.push((*params, e.to_string()));
            }
        }
    }

    let Some(best) = best else {
        return Err(PredictError::AllCandidatesFailed {
            attempted: candidates.len(),
        });
    };

    log::debug!(
        "Selected {:?} with r2 = {:.4} ({} fits, {} skipped)",
        best.params,
        best.r_squared,
        fits.len(),
        skipped.len()
    );

    Ok(Selection {
        best,
        fits,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use price_map_database::StoreError;
    use price_map_property_models::{ComparableRecord, PropertyType};
    use price_map_spatial::SearchWindow;

    struct EmptyStore;

    impl ComparableStore for EmptyStore {
        fn fetch_in_window(
            &self,
            _window: &SearchWindow,
        ) -> Result<Vec<ComparableRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct BrokenStore;

    impl ComparableStore for BrokenStore {
        fn fetch_in_window(
            &self,
            _window: &SearchWindow,
        ) -> Result<Vec<ComparableRecord>, StoreError> {
            Err(StoreError::Schema {
                message: "store offline".to_string(),
            })
        }
    }

    fn query() -> QueryPoint {
        QueryPoint {
            latitude: 52.20,
            longitude: 0.12,
            date: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            property_type: PropertyType::Detached,
        }
    }

    #[test]
    fn all_empty_candidates_fail_as_a_unit() {
        let grid = ModelParams::default_grid();
        let err = select(&EmptyStore, &query(), &grid).unwrap_err();
        assert!(matches!(
            err,
            PredictError::AllCandidatesFailed { attempted } if attempted == grid.len()
        ));
    }

    #[test]
    fn empty_grid_fails() {
        let err = select(&EmptyStore, &query(), &[]).unwrap_err();
        assert!(matches!(
            err,
            PredictError::AllCandidatesFailed { attempted: 0 }
        ));
    }

    #[test]
    fn store_failure_aborts_instead_of_skipping() {
        let grid = ModelParams::default_grid();
        let err = select(&BrokenStore, &query(), &grid).unwrap_err();
        assert!(matches!(err, PredictError::Store(_)));
    }

    #[test]
    fn invalid_grid_entries_are_skipped_not_fatal() {
        let grid = [ModelParams {
            span_km: -1.0,
            day_offset: 365,
            geohash_precision: 6,
        }];
        let err = select(&EmptyStore, &query(), &grid).unwrap_err();
        // The invalid candidate is recorded as skipped; with nothing else in
        // the grid the search still reports all-failed.
        assert!(matches!(
            err,
            PredictError::AllCandidatesFailed { attempted: 1 }
        ));
    }
}
