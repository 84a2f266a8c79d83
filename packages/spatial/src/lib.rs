#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Search window derivation and geohash bucketing.
//!
//! Converts a query point plus a `(span_km, day_offset, geohash_precision)`
//! parameter triple into the concrete spatial and temporal bounds that the
//! comparables fetch runs against, and computes the geohash bucket strings
//! used for one-hot neighborhood encoding.

use chrono::{NaiveDate, TimeDelta};
use price_map_property_models::QueryPoint;
use serde::{Deserialize, Serialize};

/// Approximate km-to-degree scale factor inherited from the early modelling
/// notebooks. It is applied twice multiplicatively when computing the box
/// side, does not correspond to a standard geodesic conversion, and ignores
/// the cos(latitude) correction for longitude. Kept as-is so previously
/// tuned span values keep selecting the same windows.
pub const KM_TO_DEGREE: f64 = 0.02 / 2.2;

/// Errors from window derivation and geohash bucketing.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// A tuning parameter or coordinate was outside its valid range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Which parameter was rejected.
        name: &'static str,
        /// The offending value, formatted for diagnostics.
        value: String,
    },
}

impl SpatialError {
    fn invalid(name: &'static str, value: impl std::fmt::Display) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }
}

/// The tunable parameter triple controlling a comparables search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Side length of the spatial search box, in km (before the approximate
    /// degree conversion).
    pub span_km: f64,
    /// Half-width of the date window, in days.
    pub day_offset: i64,
    /// Number of geohash characters used for neighborhood bucketing.
    pub geohash_precision: usize,
}

impl ModelParams {
    /// Validates that every parameter is in its usable range.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidParameter`] if `span_km` is
    /// non-positive or non-finite, `day_offset` is non-positive, or
    /// `geohash_precision` is zero. A non-positive span or offset would
    /// otherwise silently collapse the window to an empty range.
    pub fn validate(&self) -> Result<(), SpatialError> {
        if !self.span_km.is_finite() || self.span_km <= 0.0 {
            return Err(SpatialError::invalid("span_km", self.span_km));
        }
        if self.day_offset <= 0 {
            return Err(SpatialError::invalid("day_offset", self.day_offset));
        }
        if self.geohash_precision == 0 {
            return Err(SpatialError::invalid(
                "geohash_precision",
                self.geohash_precision,
            ));
        }
        Ok(())
    }

    /// The default candidate grid for parameter selection.
    ///
    /// Small by design: the selector fits one model per candidate, and each
    /// candidate costs a store fetch.
    #[must_use]
    pub fn default_grid() -> Vec<Self> {
        let mut grid = Vec::new();
        for span_km in [1.0, 2.0, 4.0] {
            for day_offset in [182, 365] {
                for geohash_precision in [5, 6] {
                    grid.push(Self {
                        span_km,
                        day_offset,
                        geohash_precision,
                    });
                }
            }
        }
        grid
    }
}

/// Concrete spatial and temporal bounds for one comparables fetch.
///
/// Derived deterministically from a [`QueryPoint`] and [`ModelParams`] by
/// [`derive_window`]. Holds the invariants `south < north`, `west < east`
/// and `earliest_date < latest_date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWindow {
    /// Northern latitude bound, degrees.
    pub north: f64,
    /// Southern latitude bound, degrees.
    pub south: f64,
    /// Eastern longitude bound, degrees.
    pub east: f64,
    /// Western longitude bound, degrees.
    pub west: f64,
    /// Earliest transfer date included.
    pub earliest_date: NaiveDate,
    /// Latest transfer date included.
    pub latest_date: NaiveDate,
}

/// Derives the spatial box and date interval for a comparables search.
///
/// The box is centered on the query point with side
/// `span_km * KM_TO_DEGREE * KM_TO_DEGREE` degrees (the factor is applied
/// twice; see [`KM_TO_DEGREE`] for why). The date interval is
/// `query date ± day_offset` days.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidParameter`] if the parameters fail
/// [`ModelParams::validate`], if the query coordinates are not usable
/// lat/lon degrees, or if the date offset overflows the calendar range.
pub fn derive_window(
    query: &QueryPoint,
    params: &ModelParams,
) -> Result<SearchWindow, SpatialError> {
    params.validate()?;

    if !query.latitude.is_finite() || query.latitude.abs() > 90.0 {
        return Err(SpatialError::invalid("latitude", query.latitude));
    }
    if !query.longitude.is_finite() || query.longitude.abs() > 180.0 {
        return Err(SpatialError::invalid("longitude", query.longitude));
    }

    let box_side = params.span_km * KM_TO_DEGREE * KM_TO_DEGREE;
    let half = box_side / 2.0;

    let offset = TimeDelta::days(params.day_offset);
    let earliest_date = query
        .date
        .checked_sub_signed(offset)
        .ok_or_else(|| SpatialError::invalid("day_offset", params.day_offset))?;
    let latest_date = query
        .date
        .checked_add_signed(offset)
        .ok_or_else(|| SpatialError::invalid("day_offset", params.day_offset))?;

    Ok(SearchWindow {
        north: query.latitude + half,
        south: query.latitude - half,
        east: query.longitude + half,
        west: query.longitude - half,
        earliest_date,
        latest_date,
    })
}

/// Computes the geohash bucket string for a coordinate at the given
/// precision (number of geohash characters).
///
/// # Errors
///
/// Returns [`SpatialError::InvalidParameter`] if the precision is zero or
/// the coordinate is outside valid lat/lon ranges.
pub fn geohash_bucket(
    latitude: f64,
    longitude: f64,
    precision: usize,
) -> Result<String, SpatialError> {
    if precision == 0 {
        return Err(SpatialError::invalid("geohash_precision", precision));
    }
    // NaN slips through the geohash crate's range checks and encodes as
    // garbage, so reject non-finite coordinates here.
    if !latitude.is_finite() || latitude.abs() > 90.0 {
        return Err(SpatialError::invalid("latitude", latitude));
    }
    if !longitude.is_finite() || longitude.abs() > 180.0 {
        return Err(SpatialError::invalid("longitude", longitude));
    }

    geohash::encode(
        geohash::Coord {
            x: longitude,
            y: latitude,
        },
        precision,
    )
    .map_err(|e| SpatialError::invalid("coordinate", format!("({latitude}, {longitude}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_map_property_models::PropertyType;

    fn query() -> QueryPoint {
        QueryPoint {
            latitude: 52.20,
            longitude: 0.12,
            date: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            property_type: PropertyType::Detached,
        }
    }

    fn params() -> ModelParams {
        ModelParams {
            span_km: 2.0,
            day_offset: 365,
            geohash_precision: 6,
        }
    }

    #[test]
    fn window_is_centered_and_ordered() {
        let w = derive_window(&query(), &params()).unwrap();
        assert!(w.south < w.north);
        assert!(w.west < w.east);
        assert!(w.earliest_date < query().date);
        assert!(query().date < w.latest_date);

        let lat_mid = f64::midpoint(w.south, w.north);
        let lon_mid = f64::midpoint(w.west, w.east);
        assert!((lat_mid - 52.20).abs() < 1e-12);
        assert!((lon_mid - 0.12).abs() < 1e-12);
    }

    #[test]
    fn window_uses_double_scale_factor() {
        let w = derive_window(&query(), &params()).unwrap();
        let expected_half = 2.0 * KM_TO_DEGREE * KM_TO_DEGREE / 2.0;
        assert!((w.north - 52.20 - expected_half).abs() < 1e-12);
    }

    #[test]
    fn non_positive_span_is_rejected() {
        let mut p = params();
        p.span_km = 0.0;
        assert!(matches!(
            derive_window(&query(), &p),
            Err(SpatialError::InvalidParameter { name: "span_km", .. })
        ));

        p.span_km = -1.0;
        assert!(derive_window(&query(), &p).is_err());
    }

    #[test]
    fn non_positive_day_offset_is_rejected() {
        let mut p = params();
        p.day_offset = 0;
        assert!(matches!(
            derive_window(&query(), &p),
            Err(SpatialError::InvalidParameter {
                name: "day_offset",
                ..
            })
        ));
    }

    #[test]
    fn zero_precision_is_rejected() {
        let mut p = params();
        p.geohash_precision = 0;
        assert!(derive_window(&query(), &p).is_err());
        assert!(geohash_bucket(52.2, 0.12, 0).is_err());
    }

    #[test]
    fn out_of_range_coordinate_is_rejected() {
        let mut q = query();
        q.latitude = 91.0;
        assert!(derive_window(&q, &params()).is_err());
        assert!(geohash_bucket(f64::NAN, 0.12, 6).is_err());
        assert!(geohash_bucket(52.2, 181.0, 6).is_err());
    }

    #[test]
    fn geohash_bucket_length_matches_precision() {
        let bucket = geohash_bucket(52.2053, 0.1218, 6).unwrap();
        assert_eq!(bucket.len(), 6);

        let coarse = geohash_bucket(52.2053, 0.1218, 4).unwrap();
        assert!(bucket.starts_with(&coarse));
    }

    #[test]
    fn default_grid_is_small_and_valid() {
        let grid = ModelParams::default_grid();
        assert_eq!(grid.len(), 12);
        for candidate in &grid {
            candidate.validate().unwrap();
        }
    }
}
