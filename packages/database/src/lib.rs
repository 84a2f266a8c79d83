#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB`-backed tabular store for historical property transactions.
//!
//! Provides the comparables fetch boundary consumed by the prediction
//! pipeline (the [`ComparableStore`] trait), a raw-query escape hatch, a
//! labelled-frame helper for loosely-typed tabular results, and an explicit
//! per-store window cache.
//!
//! All access is synchronous and single-threaded; `duckdb::Connection` is
//! `Send` but not `Sync` and is reused sequentially.

pub mod cache;
pub mod store;

use price_map_property_models::ComparableRecord;
use price_map_spatial::SearchWindow;
use serde::Serialize;

/// Maximum number of rows returned by any single fetch.
///
/// A result of exactly this many rows may have been truncated; callers that
/// care should narrow their window.
pub const MAX_FETCH_ROWS: usize = 50_000;

/// Errors that can occur at the store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Column/row shape mismatch in external tabular data.
    #[error("Schema error: {message}")]
    Schema {
        /// Description of the shape mismatch.
        message: String,
    },
}

/// The seam between the prediction pipeline and the tabular store.
///
/// Implemented by [`store::DuckDbStore`] for real data and by in-memory
/// stores in tests. Implementations must apply the [`MAX_FETCH_ROWS`] cap.
pub trait ComparableStore {
    /// Fetches all transactions inside the window, capped at
    /// [`MAX_FETCH_ROWS`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying fetch fails or a row does
    /// not match the documented column shape.
    fn fetch_in_window(&self, window: &SearchWindow) -> Result<Vec<ComparableRecord>, StoreError>;
}

/// A labelled tabular frame: named columns over loosely-typed rows.
///
/// The dynamic cell type is `serde_json::Value` so frames can carry mixed
/// query output and serialize directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Column names, in row order.
    pub columns: Vec<String>,
    /// Row-major cell values.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Frame {
    /// Index of a named column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Attaches column labels to raw row output, producing a [`Frame`].
///
/// # Errors
///
/// Returns [`StoreError::Schema`] if `rows` is empty or if any row's width
/// differs from `columns.len()`.
pub fn labelled(
    rows: Vec<Vec<serde_json::Value>>,
    columns: &[&str],
) -> Result<Frame, StoreError> {
    let Some(first) = rows.first() else {
        return Err(StoreError::Schema {
            message: "cannot label an empty row set".to_string(),
        });
    };

    if first.len() != columns.len() {
        return Err(StoreError::Schema {
            message: format!(
                "{} column labels for rows of width {}",
                columns.len(),
                first.len()
            ),
        });
    }

    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(StoreError::Schema {
                message: format!(
                    "row {i} has width {} but expected {}",
                    row.len(),
                    columns.len()
                ),
            });
        }
    }

    Ok(Frame {
        columns: columns.iter().map(ToString::to_string).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_matching_rows() {
        let frame = labelled(
            vec![vec![json!(1.0), json!("a")], vec![json!(2.0), json!("b")]],
            &["price", "postcode"],
        )
        .unwrap();

        assert_eq!(frame.columns, vec!["price", "postcode"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.column_index("postcode"), Some(1));
        assert_eq!(frame.column_index("missing"), None);
    }

    #[test]
    fn rejects_empty_rows() {
        let err = labelled(vec![], &["price"]).unwrap_err();
        assert!(matches!(err, StoreError::Schema { .. }));
    }

    #[test]
    fn rejects_width_mismatch() {
        let err = labelled(vec![vec![json!(1.0)]], &["price", "postcode"]).unwrap_err();
        assert!(err.to_string().contains("width 1"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = labelled(
            vec![vec![json!(1.0)], vec![json!(1.0), json!(2.0)]],
            &["price"],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Schema { .. }));
    }
}
