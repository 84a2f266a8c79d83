#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the price-map toolchain.
//!
//! Wraps the prediction pipeline in four subcommands: `init` (create the
//! store schema), `ingest` (bulk-load a price-paid CSV), `predict` (single
//! query point, fixed parameters or grid search), and `batch` (a CSV of
//! query points).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use price_map_database::store::DuckDbStore;
use price_map_database::{Frame, cache::CachedStore};
use price_map_predict::{predict, predict_many, select};
use price_map_property_models::{PropertyType, QueryPoint};
use price_map_spatial::ModelParams;

#[derive(Parser)]
#[command(name = "price-map", about = "Comparable-sales property price estimation")]
struct Cli {
    /// Path to the price-paid DuckDB file
    #[arg(long, default_value = "price-paid.duckdb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store schema if it does not exist
    Init,
    /// Bulk-load a UK price-paid CSV (with header) into the store
    Ingest {
        /// CSV file with columns in the documented 15-column order
        csv: PathBuf,
    },
    /// Predict a price for a single query point
    Predict {
        /// Latitude of the property, degrees
        #[arg(long)]
        latitude: f64,
        /// Longitude of the property, degrees
        #[arg(long)]
        longitude: f64,
        /// Sale date being priced, ISO-8601 (e.g. 2020-06-15)
        #[arg(long)]
        date: NaiveDate,
        /// Property type code: F, S, D, T or O
        #[arg(long)]
        property_type: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Predict prices for a CSV of query points
    /// (columns: latitude, longitude, date, property_type)
    Batch {
        /// CSV file of query points, with header
        csv: PathBuf,
        #[command(flatten)]
        params: ParamArgs,
    },
}

/// Fixed model parameters, or grid search when `--grid` is set.
#[derive(clap::Args)]
struct ParamArgs {
    /// Side length of the spatial search box, km
    #[arg(long, default_value = "2.0")]
    span_km: f64,
    /// Half-width of the date window, days
    #[arg(long, default_value = "365")]
    day_offset: i64,
    /// Geohash characters used for neighborhood bucketing
    #[arg(long, default_value = "6")]
    geohash_precision: usize,
    /// Search the default parameter grid instead of fixed parameters
    #[arg(long)]
    grid: bool,
}

impl ParamArgs {
    fn fixed(&self) -> Option<ModelParams> {
        if self.grid {
            None
        } else {
            Some(ModelParams {
                span_km: self.span_km,
                day_offset: self.day_offset,
                geohash_precision: self.geohash_precision,
            })
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            price_map_database::store::open(&cli.db)?;
            println!("Initialized store at {}", cli.db.display());
        }
        Commands::Ingest { csv } => {
            let conn = price_map_database::store::open(&cli.db)?;
            let loaded = price_map_database::store::ingest_csv(&conn, &csv)?;
            println!("Loaded {loaded} rows");
        }
        Commands::Predict {
            latitude,
            longitude,
            date,
            property_type,
            params,
        } => {
            let property_type = PropertyType::from_code(&property_type)
                .ok_or_else(|| format!("unrecognized property type code {property_type:?}"))?;
            let query = QueryPoint {
                latitude,
                longitude,
                date,
                property_type,
            };

            let store = CachedStore::new(DuckDbStore::open(&cli.db)?);

            let prediction = match params.fixed() {
                Some(fixed) => predict(&store, &query, &fixed)?,
                None => {
                    let selection = select(&store, &query, &ModelParams::default_grid())?;
                    for (params, reason) in &selection.skipped {
                        log::info!("Skipped {params:?}: {reason}");
                    }
                    selection.best
                }
            };

            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Commands::Batch { csv, params } => {
            let store = CachedStore::new(DuckDbStore::open(&cli.db)?);
            let frame = read_query_frame(&csv)?;

            let results = predict_many(&store, &frame, params.fixed().as_ref())?;

            let failed = results.iter().filter(|r| r.failure.is_some()).count();
            println!("{}", serde_json::to_string_pretty(&results)?);
            log::info!("Predicted {} rows ({failed} failed)", results.len());
        }
    }

    Ok(())
}

/// Reads a CSV of query points into a labelled [`Frame`], cells as strings.
///
/// Numeric parsing happens in the batch predictor, which reports unparseable
/// cells as per-row failures instead of aborting the file.
fn read_query_frame(path: &std::path::Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| serde_json::Value::String(cell.to_string()))
                .collect(),
        );
    }

    let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    Ok(price_map_database::labelled(rows, &column_refs)?)
}
