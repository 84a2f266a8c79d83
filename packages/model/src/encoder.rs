//! Feature encoding for the comparables regression.
//!
//! Column layout, fixed between training and prediction:
//!
//! ```text
//! [ date ordinal | F S D T O | geohash buckets... ]
//!   1 column       5 columns   vocabulary.len() columns
//! ```
//!
//! The geohash vocabulary is the ordered set of distinct buckets observed in
//! the training records, built exactly once and threaded explicitly to the
//! query encoding so both sides always agree on column count. There is no
//! intercept column.

use chrono::Datelike as _;
use nalgebra::{DMatrix, DVector};
use price_map_property_models::{ComparableRecord, PropertyType, QueryPoint};
use price_map_spatial::geohash_bucket;

use crate::ModelError;

/// Number of property-type one-hot columns.
const PROPERTY_TYPE_COLUMNS: usize = PropertyType::ALL.len();

/// Ordered set of distinct geohash buckets observed in training data.
///
/// First-seen order; positions are the one-hot column offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    buckets: Vec<String>,
}

impl Vocabulary {
    fn from_buckets(per_record: &[String]) -> Self {
        let mut buckets: Vec<String> = Vec::new();
        for bucket in per_record {
            if !buckets.iter().any(|b| b == bucket) {
                buckets.push(bucket.clone());
            }
        }
        Self { buckets }
    }

    /// One-hot column offset of a bucket, if it was observed in training.
    #[must_use]
    pub fn position(&self, bucket: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b == bucket)
    }

    /// Number of distinct buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no buckets were observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The buckets in column order.
    #[must_use]
    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }
}

/// Encoded training data: design matrix, price vector, and the geohash
/// vocabulary the matrix columns were built against.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    /// One row per usable record.
    pub design: DMatrix<f64>,
    /// Sale prices aligned with the design rows.
    pub prices: DVector<f64>,
    /// Bucket vocabulary for the geohash one-hot block.
    pub vocabulary: Vocabulary,
}

/// Encodes fetched comparables into a [`TrainingSet`] at the given geohash
/// precision.
///
/// Property-type encoding is permissive: a record with an unrecognized code
/// gets an all-zero one-hot block rather than being rejected. Records whose
/// coordinates cannot be geohashed are skipped with a warning.
///
/// # Errors
///
/// Returns [`ModelError::InsufficientData`] if no usable records remain.
pub fn encode_training(
    records: &[ComparableRecord],
    precision: usize,
) -> Result<TrainingSet, ModelError> {
    let mut usable: Vec<&ComparableRecord> = Vec::with_capacity(records.len());
    let mut buckets: Vec<String> = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        match geohash_bucket(record.latitude, record.longitude, precision) {
            Ok(bucket) => {
                usable.push(record);
                buckets.push(bucket);
            }
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping record {} with unusable coordinates: {e}", record.db_id);
            }
        }
    }

    if usable.is_empty() {
        if skipped > 0 {
            log::warn!("All {skipped} fetched records had unusable coordinates");
        }
        return Err(ModelError::InsufficientData { rows: 0 });
    }

    let vocabulary = Vocabulary::from_buckets(&buckets);
    let columns = 1 + PROPERTY_TYPE_COLUMNS + vocabulary.len();

    let mut design = DMatrix::<f64>::zeros(usable.len(), columns);
    let mut prices = DVector::<f64>::zeros(usable.len());

    for (i, (record, bucket)) in usable.iter().zip(&buckets).enumerate() {
        design[(i, 0)] = f64::from(record.date_of_transfer.num_days_from_ce());

        if let Some(pt) = PropertyType::from_code(&record.property_type) {
            design[(i, 1 + property_type_offset(pt))] = 1.0;
        }

        // Bucket came from the vocabulary's source records, so it is present.
        if let Some(offset) = vocabulary.position(bucket) {
            design[(i, 1 + PROPERTY_TYPE_COLUMNS + offset)] = 1.0;
        }

        prices[i] = record.price;
    }

    Ok(TrainingSet {
        design,
        prices,
        vocabulary,
    })
}

/// Encodes a query point as a single design row against an existing
/// training vocabulary, guaranteeing the same column count.
///
/// If the query's bucket was never observed in training, its geohash block
/// is all zero. That is legitimate: comparables are fetched from the query's
/// own neighborhood, so it can only happen when the window produced few
/// records, and the date and property-type columns still carry signal.
///
/// # Errors
///
/// Returns [`ModelError::Spatial`] if the query coordinates cannot be
/// geohashed at this precision.
pub fn encode_query(
    query: &QueryPoint,
    precision: usize,
    vocabulary: &Vocabulary,
) -> Result<DVector<f64>, ModelError> {
    let bucket = geohash_bucket(query.latitude, query.longitude, precision)?;

    let columns = 1 + PROPERTY_TYPE_COLUMNS + vocabulary.len();
    let mut row = DVector::<f64>::zeros(columns);

    row[0] = f64::from(query.date.num_days_from_ce());
    row[1 + property_type_offset(query.property_type)] = 1.0;

    if let Some(offset) = vocabulary.position(&bucket) {
        row[1 + PROPERTY_TYPE_COLUMNS + offset] = 1.0;
    } else {
        log::debug!("Query bucket {bucket} not observed in training vocabulary");
    }

    Ok(row)
}

fn property_type_offset(pt: PropertyType) -> usize {
    PropertyType::ALL
        .iter()
        .position(|candidate| *candidate == pt)
        .unwrap_or_default()
}
