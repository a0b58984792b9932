use crate::config::SearchParams;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One listing as returned by the listing feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: f64,
}

impl Listing {
    /// Identity key used for enrichment and merge; also the query string
    /// the resolver autocompletes against
    pub fn full_address(&self) -> String {
        format!("{}, {} {}", self.address, self.city, self.state)
    }
}

/// Outcome of one tax lookup. `Unresolved` is the failure sentinel: a lookup
/// that broke at any step of the chain, kept distinct from a legitimate zero
/// or negative assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaxValue {
    Assessed(f64),
    Unresolved,
}

impl TaxValue {
    pub fn assessed(self) -> Option<f64> {
        match self {
            TaxValue::Assessed(v) => Some(v),
            TaxValue::Unresolved => None,
        }
    }

    pub fn is_unresolved(self) -> bool {
        matches!(self, TaxValue::Unresolved)
    }
}

/// Complete enrichment output: one entry per distinct input address
pub type TaxValueMap = HashMap<String, TaxValue>;

/// A listing joined with its enrichment outcome and stamped with the run date.
/// Exists for every input listing, resolved or not; validity filtering happens
/// downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedListing {
    pub listing: Listing,
    pub tax: TaxValue,
    pub date: NaiveDate,
}

/// Persisted row of the raw listings table, produced only for listings with a
/// positive assessed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: f64,
    pub tax_assessed_value: f64,
    pub overpriced: f64,
    pub date: NaiveDate,
}

/// One row of the per-day summary table. The adjusted statistics are `None`
/// when every overpriced value in the group was at or above the outlier
/// threshold; serialized as an empty field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub listing_count: usize,
    pub price_mean: f64,
    pub price_median: f64,
    pub tax_assessed_value_mean: f64,
    pub tax_assessed_value_median: f64,
    pub overpriced_adjusted_mean: Option<f64>,
    pub overpriced_adjusted_median: Option<f64>,
}

/// Source of candidate listings matching a search
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Fetch the full result table for one search. Missing expected columns
    /// or a non-success response are fatal; malformed rows are skipped.
    async fn fetch_listings(&self, search: &SearchParams) -> Result<Vec<Listing>>;
}

/// Per-address tax lookup. Infallible from the caller's viewpoint: every
/// internal failure collapses to `TaxValue::Unresolved`.
#[async_trait::async_trait]
pub trait TaxResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> TaxValue;
}
