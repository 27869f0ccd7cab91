//! Schema-validated price panel.
//!
//! The panel is the single input boundary of the core: a set of symbols
//! sharing one common, strictly increasing timestamp index. Alignment is the
//! upstream collaborator's job; this module fails fast when it is violated.
//!
//! A `NaN` price is tolerated as an explicit "missing observation" marker so
//! downstream stages can report execution data gaps per pair instead of
//! rejecting the whole panel.

use crate::error::StatArbError;
use polars::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::info;

/// Aligned multi-symbol price history.
#[derive(Debug, Clone)]
pub struct PricePanel {
    timestamps: Vec<i64>,
    // BTreeMap keeps symbol enumeration deterministic across runs.
    series: BTreeMap<String, Vec<f64>>,
    data_version: u64,
}

impl PricePanel {
    /// Build a panel from pre-aligned per-symbol series.
    ///
    /// # Errors
    /// `InputValidation` if timestamps are not strictly increasing, any
    /// series length differs from the index, or a price is non-positive
    /// or infinite (`NaN` is allowed as a gap marker).
    pub fn new(
        timestamps: Vec<i64>,
        series: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, StatArbError> {
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(StatArbError::InputValidation(format!(
                    "timestamps must be strictly increasing ({} followed by {})",
                    pair[0], pair[1]
                )));
            }
        }
        for (symbol, prices) in &series {
            if prices.len() != timestamps.len() {
                return Err(StatArbError::InputValidation(format!(
                    "series '{}' has {} observations but the index has {}",
                    symbol,
                    prices.len(),
                    timestamps.len()
                )));
            }
            for (i, price) in prices.iter().enumerate() {
                if price.is_nan() {
                    continue; // explicit gap
                }
                if !price.is_finite() || *price <= 0.0 {
                    return Err(StatArbError::InputValidation(format!(
                        "series '{}' has invalid price {} at index {}",
                        symbol, price, i
                    )));
                }
            }
        }

        let data_version = fingerprint(&timestamps, &series);
        Ok(Self {
            timestamps,
            series,
            data_version,
        })
    }

    /// Validate a long-format DataFrame (columns `symbol`, `timestamp`,
    /// `price`) into a panel.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, StatArbError> {
        let symbols = df
            .column("symbol")
            .map_err(|_| schema_error("symbol"))?
            .str()
            .map_err(|_| type_error("symbol", "str"))?;
        let timestamps = df
            .column("timestamp")
            .map_err(|_| schema_error("timestamp"))?
            .i64()
            .map_err(|_| type_error("timestamp", "i64"))?;
        let prices = df
            .column("price")
            .map_err(|_| schema_error("price"))?
            .f64()
            .map_err(|_| type_error("price", "f64"))?;

        let mut per_symbol: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
        for i in 0..df.height() {
            let (Some(symbol), Some(ts)) = (symbols.get(i), timestamps.get(i)) else {
                return Err(StatArbError::InputValidation(format!(
                    "null symbol or timestamp at row {}",
                    i
                )));
            };
            // Null price rows become gap markers.
            let price = prices.get(i).unwrap_or(f64::NAN);
            per_symbol.entry(symbol.to_string()).or_default().push((ts, price));
        }

        // Every symbol must carry the exact same timestamp sequence.
        let mut index: Option<Vec<i64>> = None;
        let mut series = BTreeMap::new();
        for (symbol, rows) in per_symbol {
            let ts: Vec<i64> = rows.iter().map(|(t, _)| *t).collect();
            match &index {
                None => index = Some(ts),
                Some(expected) if *expected == ts => {}
                Some(_) => {
                    return Err(StatArbError::InputValidation(format!(
                        "series '{}' is not aligned with the panel index",
                        symbol
                    )));
                }
            }
            series.insert(symbol, rows.into_iter().map(|(_, p)| p).collect());
        }

        let panel = Self::new(index.unwrap_or_default(), series)?;
        info!(
            symbols = panel.symbol_count(),
            rows = panel.len(),
            "Price panel validated"
        );
        Ok(panel)
    }

    /// Load a panel from a long-format CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, StatArbError> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file).finish()?;
        Self::from_dataframe(&df)
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, symbol: &str) -> Option<&[f64]> {
        self.series.get(symbol).map(Vec::as_slice)
    }

    /// Number of rows in the common index.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Cheap content fingerprint, used to key the scan cache.
    pub fn data_version(&self) -> u64 {
        self.data_version
    }
}

fn schema_error(column: &str) -> StatArbError {
    StatArbError::InputValidation(format!("missing required column '{}'", column))
}

fn type_error(column: &str, expected: &str) -> StatArbError {
    StatArbError::InputValidation(format!("column '{}' must be of type {}", column, expected))
}

fn fingerprint(timestamps: &[i64], series: &BTreeMap<String, Vec<f64>>) -> u64 {
    let mut hasher = DefaultHasher::new();
    timestamps.hash(&mut hasher);
    for (symbol, prices) in series {
        symbol.hash(&mut hasher);
        for price in prices {
            price.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}
