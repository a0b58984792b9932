use crate::error::{Result, ScraperError};
use crate::types::{Listing, ListingRecord, MergedListing, TaxValueMap};
use chrono::NaiveDate;

/// Join listings with their enrichment results and stamp the run date.
/// Produces one merged row per input listing, sentinel-valued or not. An
/// address missing from the map means the enrichment completeness contract
/// was broken, which is a hard error rather than a row to drop.
pub fn merge_listings(
    listings: Vec<Listing>,
    taxes: &TaxValueMap,
    as_of: NaiveDate,
) -> Result<Vec<MergedListing>> {
    listings
        .into_iter()
        .map(|listing| {
            let key = listing.full_address();
            let tax = taxes
                .get(&key)
                .copied()
                .ok_or(ScraperError::EnrichmentGap(key))?;
            Ok(MergedListing {
                listing,
                tax,
                date: as_of,
            })
        })
        .collect()
}

/// Project merged rows into persistable records, keeping only listings with a
/// positive assessed value. Unresolved lookups and zero/negative assessments
/// are both unusable downstream and dropped here.
pub fn retain_assessed(merged: Vec<MergedListing>) -> Vec<ListingRecord> {
    merged
        .into_iter()
        .filter_map(|row| {
            let assessed = row.tax.assessed().filter(|v| *v > 0.0)?;
            let listing = row.listing;
            Some(ListingRecord {
                overpriced: listing.price - assessed,
                address: listing.address,
                city: listing.city,
                state: listing.state,
                zip: listing.zip,
                price: listing.price,
                tax_assessed_value: assessed,
                date: row.date,
            })
        })
        .collect()
}

/// Re-apply the positive-assessed-value rule to rows loaded back from disk.
/// Idempotent over already-filtered data.
pub fn filter_positive_assessed(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    records
        .into_iter()
        .filter(|r| r.tax_assessed_value > 0.0)
        .collect()
}
