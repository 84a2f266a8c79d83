//! `DuckDB` store for the `prices_coordinates_data` table.
//!
//! Spatial filtering is plain rectangular comparison on the latitude and
//! longitude columns; dates are stored as ISO-8601 text, which compares
//! correctly both in SQL and lexicographically.

use std::path::Path;

use chrono::NaiveDate;
use duckdb::Connection;
use price_map_property_models::ComparableRecord;
use price_map_spatial::SearchWindow;

use crate::{ComparableStore, MAX_FETCH_ROWS, StoreError};

/// Column list of `prices_coordinates_data`, in documented order.
const COLUMNS: &str = "postcode, price, date_of_transfer, property_type, new_build_flag, \
     tenure_type, locality, town_city, district, county, ppd_category_type, \
     country, latitude, longitude, db_id";

/// Opens (or creates) the price-paid `DuckDB` at the given path and ensures
/// the schema exists.
///
/// # Errors
///
/// Returns [`StoreError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the `prices_coordinates_data` table if it does not exist.
///
/// # Errors
///
/// Returns [`StoreError`] if the DDL fails.
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS prices_coordinates_data (
            postcode TEXT NOT NULL,
            price DOUBLE NOT NULL,
            date_of_transfer TEXT NOT NULL,
            property_type TEXT NOT NULL,
            new_build_flag TEXT NOT NULL,
            tenure_type TEXT NOT NULL,
            locality TEXT NOT NULL,
            town_city TEXT NOT NULL,
            district TEXT NOT NULL,
            county TEXT NOT NULL,
            ppd_category_type TEXT NOT NULL,
            country TEXT NOT NULL,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL,
            db_id BIGINT NOT NULL
        );",
    )?;
    Ok(())
}

/// Bulk-loads a UK price-paid CSV (with header, columns in documented order)
/// into `prices_coordinates_data`. Returns the number of rows loaded.
///
/// # Errors
///
/// Returns [`StoreError`] if the load fails (missing file, malformed CSV,
/// or column shape mismatch).
pub fn ingest_csv(conn: &Connection, csv_path: &Path) -> Result<usize, StoreError> {
    // read_csv takes a path literal, not a bound parameter.
    let escaped = csv_path.display().to_string().replace('\'', "''");
    let loaded = conn.execute(
        &format!(
            "INSERT INTO prices_coordinates_data
             SELECT {COLUMNS} FROM read_csv('{escaped}', header = true)"
        ),
        [],
    )?;
    log::info!("Loaded {loaded} rows from {}", csv_path.display());
    Ok(loaded)
}

/// A [`ComparableStore`] over an open price-paid `DuckDB` connection.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the database at `path`, ensuring the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(open(path)?))
    }

    /// The underlying connection, for raw queries and ingestion.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ComparableStore for DuckDbStore {
    fn fetch_in_window(&self, window: &SearchWindow) -> Result<Vec<ComparableRecord>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM prices_coordinates_data
             WHERE latitude > ? AND latitude < ?
               AND longitude > ? AND longitude < ?
               AND date_of_transfer > ? AND date_of_transfer < ?
             LIMIT {MAX_FETCH_ROWS}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![
            window.south,
            window.north,
            window.west,
            window.east,
            window.earliest_date.to_string(),
            window.latest_date.to_string(),
        ])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_row(row)?);
        }

        if records.len() == MAX_FETCH_ROWS {
            log::warn!(
                "Comparables fetch hit the {MAX_FETCH_ROWS}-row cap; result may be truncated"
            );
        }
        log::debug!(
            "Fetched {} comparables in ({:.5}..{:.5}, {:.5}..{:.5})",
            records.len(),
            window.south,
            window.north,
            window.west,
            window.east
        );

        Ok(records)
    }
}

fn record_from_row(row: &duckdb::Row<'_>) -> Result<ComparableRecord, StoreError> {
    let date_text: String = row.get(2)?;
    let date_of_transfer =
        NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|e| StoreError::Schema {
            message: format!("unparseable date_of_transfer {date_text:?}: {e}"),
        })?;

    Ok(ComparableRecord {
        postcode: row.get(0)?,
        price: row.get(1)?,
        date_of_transfer,
        property_type: row.get(3)?,
        new_build_flag: row.get(4)?,
        tenure_type: row.get(5)?,
        locality: row.get(6)?,
        town_city: row.get(7)?,
        district: row.get(8)?,
        county: row.get(9)?,
        ppd_category_type: row.get(10)?,
        country: row.get(11)?,
        latitude: row.get(12)?,
        longitude: row.get(13)?,
        db_id: row.get(14)?,
    })
}

/// Runs an arbitrary read query and returns loosely-typed rows, capped at
/// [`MAX_FETCH_ROWS`].
///
/// Intended for exploratory queries; the comparables fetch path uses the
/// typed [`DuckDbStore`] instead.
///
/// # Errors
///
/// Returns [`StoreError`] if preparation or execution fails.
pub fn fetch_query(
    conn: &Connection,
    sql: &str,
) -> Result<Vec<Vec<serde_json::Value>>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(column_count);
        for i in 0..column_count {
            cells.push(json_value(row.get_ref(i)?));
        }
        out.push(cells);
        if out.len() == MAX_FETCH_ROWS {
            log::warn!("Raw query hit the {MAX_FETCH_ROWS}-row cap; result may be truncated");
            break;
        }
    }

    Ok(out)
}

fn json_value(value: duckdb::types::ValueRef<'_>) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(v) => serde_json::json!(v),
        ValueRef::SmallInt(v) => serde_json::json!(v),
        ValueRef::Int(v) => serde_json::json!(v),
        ValueRef::BigInt(v) => serde_json::json!(v),
        ValueRef::UTinyInt(v) => serde_json::json!(v),
        ValueRef::USmallInt(v) => serde_json::json!(v),
        ValueRef::UInt(v) => serde_json::json!(v),
        ValueRef::UBigInt(v) => serde_json::json!(v),
        ValueRef::Float(v) => serde_json::json!(v),
        ValueRef::Double(v) => serde_json::json!(v),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        other => serde_json::Value::String(format!("{other:?}")),
    }
}
