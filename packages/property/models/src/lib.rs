#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Property transaction domain types.
//!
//! This crate defines the canonical property type taxonomy and the record
//! types shared across the entire price-map system: the historical
//! transaction rows fetched from the price-paid store and the query points
//! that predictions are made for.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Property type classification from the UK price-paid dataset.
///
/// Encoded in the source data as a single-letter code. The one-hot column
/// order used by the feature encoder is fixed and matches [`PropertyType::ALL`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    /// Code "F": flat or maisonette
    Flat,
    /// Code "S": semi-detached house
    SemiDetached,
    /// Code "D": detached house
    Detached,
    /// Code "T": terraced house
    Terraced,
    /// Code "O": anything else (commercial, land, unknown)
    Other,
}

impl PropertyType {
    /// All property types, in the fixed one-hot column order `[F, S, D, T, O]`.
    pub const ALL: [Self; 5] = [
        Self::Flat,
        Self::SemiDetached,
        Self::Detached,
        Self::Terraced,
        Self::Other,
    ];

    /// The single-letter code used in the price-paid dataset.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Flat => "F",
            Self::SemiDetached => "S",
            Self::Detached => "D",
            Self::Terraced => "T",
            Self::Other => "O",
        }
    }

    /// Parses a single-letter code from the price-paid dataset.
    ///
    /// Permissive by design: an unrecognized code returns `None` rather than
    /// an error, mirroring how the feature encoder treats unknown codes as an
    /// all-zero one-hot row instead of rejecting the record.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "F" => Some(Self::Flat),
            "S" => Some(Self::SemiDetached),
            "D" => Some(Self::Detached),
            "T" => Some(Self::Terraced),
            "O" => Some(Self::Other),
            _ => None,
        }
    }
}

/// One historical property transaction from the `prices_coordinates_data`
/// table, with named fields matching the documented 15-column order.
///
/// Constructed only at the store boundary, where the column shape is
/// validated. The raw `property_type` code is kept as a string so that
/// records with unrecognized codes survive the fetch and encode as all-zero
/// one-hot rows instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableRecord {
    /// Postcode of the property.
    pub postcode: String,
    /// Sale price in GBP.
    pub price: f64,
    /// Date of transfer.
    pub date_of_transfer: NaiveDate,
    /// Raw single-letter property type code ("F", "S", "D", "T", "O").
    pub property_type: String,
    /// "Y" if the property was newly built at the time of sale.
    pub new_build_flag: String,
    /// Tenure: "F" freehold or "L" leasehold.
    pub tenure_type: String,
    /// Locality component of the address.
    pub locality: String,
    /// Town or city.
    pub town_city: String,
    /// District.
    pub district: String,
    /// County.
    pub county: String,
    /// Positional-quality indicator from the source dataset.
    pub ppd_category_type: String,
    /// Country of the coordinate reference.
    pub country: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Database row ID.
    pub db_id: i64,
}

/// The immutable input to a single price prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// The (hypothetical) sale date the prediction is for.
    pub date: NaiveDate,
    /// Property type of the property being priced.
    pub property_type: PropertyType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_codes() {
        assert_eq!(PropertyType::from_code("F"), Some(PropertyType::Flat));
        assert_eq!(PropertyType::from_code("S"), Some(PropertyType::SemiDetached));
        assert_eq!(PropertyType::from_code("D"), Some(PropertyType::Detached));
        assert_eq!(PropertyType::from_code("T"), Some(PropertyType::Terraced));
        assert_eq!(PropertyType::from_code("O"), Some(PropertyType::Other));
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(PropertyType::from_code("X"), None);
        assert_eq!(PropertyType::from_code(""), None);
    }

    #[test]
    fn code_round_trips() {
        for pt in PropertyType::ALL {
            assert_eq!(PropertyType::from_code(pt.code()), Some(pt));
        }
    }

    #[test]
    fn one_hot_order_is_stable() {
        let codes: Vec<&str> = PropertyType::ALL.iter().map(|p| p.code()).collect();
        assert_eq!(codes, vec!["F", "S", "D", "T", "O"]);
    }
}
