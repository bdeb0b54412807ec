use analysis_core::Bar;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Raw bars plus derived columns, struct-of-arrays. Every column has exactly
/// one value per bar; positions without enough history hold NaN.
#[derive(Debug, Clone)]
pub struct EnrichedSeries {
    dates: Vec<NaiveDate>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl EnrichedSeries {
    pub fn from_bars(bars: &[Bar]) -> Self {
        Self {
            dates: bars.iter().map(|b| b.date).collect(),
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
            volume: bars.iter().map(|b| b.volume).collect(),
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Closing price of the most recent row; NaN on an empty series.
    pub fn last_close(&self) -> f64 {
        self.close.last().copied().unwrap_or(f64::NAN)
    }

    /// Attach a derived column. Length must match the row count.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        assert_eq!(
            values.len(),
            self.len(),
            "column {name} length does not match row count"
        );
        self.columns.insert(name, values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Value of a derived column at row i; NaN when the column is missing.
    pub fn value(&self, name: &str, i: usize) -> f64 {
        self.column(name)
            .and_then(|col| col.get(i))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Last value of a derived column; NaN when missing or empty.
    pub fn last(&self, name: &str) -> f64 {
        self.column(name)
            .and_then(|col| col.last())
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Value k rows from the end (0 = last row); NaN when out of range.
    pub fn from_end(&self, name: &str, k: usize) -> f64 {
        let n = self.len();
        if k >= n {
            return f64::NAN;
        }
        self.value(name, n - 1 - k)
    }

    /// Base price field k rows from the end; NaN when out of range.
    pub fn price_from_end(&self, field: PriceField, k: usize) -> f64 {
        let n = self.len();
        if k >= n {
            return f64::NAN;
        }
        let col = match field {
            PriceField::Open => &self.open,
            PriceField::High => &self.high,
            PriceField::Low => &self.low,
            PriceField::Close => &self.close,
            PriceField::Volume => &self.volume,
        };
        col[n - 1 - k]
    }

    /// Full JSON dump with NaN mapped to null. Dates first, then base prices,
    /// then derived columns in name order.
    pub fn to_json(&self) -> Value {
        fn dump(values: &[f64]) -> Value {
            Value::Array(
                values
                    .iter()
                    .map(|v| {
                        if v.is_finite() {
                            json!(v)
                        } else {
                            Value::Null
                        }
                    })
                    .collect(),
            )
        }

        let mut out = serde_json::Map::new();
        out.insert(
            "dates".to_string(),
            json!(self
                .dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>()),
        );
        out.insert("open".to_string(), dump(&self.open));
        out.insert("high".to_string(), dump(&self.high));
        out.insert("low".to_string(), dump(&self.low));
        out.insert("close".to_string(), dump(&self.close));
        out.insert("volume".to_string(), dump(&self.volume));
        for (name, values) in &self.columns {
            out.insert(name.clone(), dump(values));
        }
        Value::Object(out)
    }
}

/// Base OHLCV field selector for positional access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}
