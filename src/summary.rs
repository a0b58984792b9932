use crate::types::{DailySummary, ListingRecord};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::instrument;

/// Aggregate filtered listing records into one summary row per distinct date,
/// in ascending date order. Price and assessed-value statistics are plain
/// mean/median over the group; the overpriced statistics exclude values at or
/// above `threshold`, since a stale tax record on new construction makes a
/// listing look implausibly overpriced. An empty trimmed subset yields `None`
/// for those two statistics.
#[instrument(skip(records), fields(record_count = records.len()))]
pub fn summarize(records: &[ListingRecord], threshold: f64) -> Vec<DailySummary> {
    let mut groups: BTreeMap<NaiveDate, Vec<&ListingRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.date).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(date, group)| {
            let prices: Vec<f64> = group.iter().map(|r| r.price).collect();
            let assessed: Vec<f64> = group.iter().map(|r| r.tax_assessed_value).collect();
            let adjusted: Vec<f64> = group
                .iter()
                .map(|r| r.overpriced)
                .filter(|v| *v < threshold)
                .collect();

            DailySummary {
                date,
                listing_count: group.len(),
                price_mean: mean(&prices),
                price_median: median(&prices),
                tax_assessed_value_mean: mean(&assessed),
                tax_assessed_value_median: median(&assessed),
                overpriced_adjusted_mean: (!adjusted.is_empty()).then(|| mean(&adjusted)),
                overpriced_adjusted_median: (!adjusted.is_empty()).then(|| median(&adjusted)),
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Middle element, or the average of the two middle elements for even counts
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 200_000.0;

    fn record(date: (i32, u32, u32), price: f64, assessed: f64) -> ListingRecord {
        ListingRecord {
            address: "1 A St".to_string(),
            city: "Washington".to_string(),
            state: "DC".to_string(),
            zip: "20001".to_string(),
            price,
            tax_assessed_value: assessed,
            overpriced: price - assessed,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn trimming_excludes_outliers_from_adjusted_statistics() {
        // overpriced values: 100, 50, 300000
        let records = vec![
            record((2021, 9, 4), 500_100.0, 500_000.0),
            record((2021, 9, 4), 500_050.0, 500_000.0),
            record((2021, 9, 4), 800_000.0, 500_000.0),
        ];

        let summaries = summarize(&records, THRESHOLD);
        assert_eq!(summaries.len(), 1);
        let row = &summaries[0];
        assert_eq!(row.listing_count, 3);
        assert_eq!(row.overpriced_adjusted_mean, Some(75.0));
        assert_eq!(row.overpriced_adjusted_median, Some(75.0));

        // untrimmed mean would be pulled far away by the outlier
        let untrimmed: f64 = (100.0 + 50.0 + 300_000.0) / 3.0;
        assert!((untrimmed - 75.0).abs() > 10_000.0);
    }

    #[test]
    fn values_at_the_threshold_are_excluded() {
        let records = vec![
            record((2021, 9, 4), 700_000.0, 500_000.0), // overpriced exactly 200_000
            record((2021, 9, 4), 500_100.0, 500_000.0),
        ];
        let summaries = summarize(&records, THRESHOLD);
        assert_eq!(summaries[0].overpriced_adjusted_mean, Some(100.0));
    }

    #[test]
    fn all_outliers_yield_undefined_adjusted_statistics() {
        let records = vec![
            record((2021, 9, 4), 900_000.0, 500_000.0),
            record((2021, 9, 4), 950_000.0, 500_000.0),
        ];
        let summaries = summarize(&records, THRESHOLD);
        let row = &summaries[0];
        assert_eq!(row.listing_count, 2);
        assert_eq!(row.overpriced_adjusted_mean, None);
        assert_eq!(row.overpriced_adjusted_median, None);
        assert_eq!(row.price_mean, 925_000.0);
    }

    #[test]
    fn groups_by_date_in_ascending_order() {
        let records = vec![
            record((2021, 9, 5), 600_000.0, 550_000.0),
            record((2021, 9, 4), 500_000.0, 450_000.0),
            record((2021, 9, 5), 620_000.0, 560_000.0),
            record((2021, 9, 4), 520_000.0, 470_000.0),
            record((2021, 9, 4), 540_000.0, 490_000.0),
        ];

        let summaries = summarize(&records, THRESHOLD);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].date, NaiveDate::from_ymd_opt(2021, 9, 4).unwrap());
        assert_eq!(summaries[0].listing_count, 3);
        assert_eq!(summaries[1].date, NaiveDate::from_ymd_opt(2021, 9, 5).unwrap());
        assert_eq!(summaries[1].listing_count, 2);

        let total: usize = summaries.iter().map(|s| s.listing_count).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn empty_input_produces_no_rows() {
        assert!(summarize(&[], THRESHOLD).is_empty());
    }

    #[test]
    fn summaries_are_deterministic_across_runs() {
        let records = vec![
            record((2021, 9, 4), 500_100.0, 500_000.0),
            record((2021, 9, 4), 800_000.0, 500_000.0),
            record((2021, 9, 5), 600_000.0, 550_000.0),
        ];
        assert_eq!(summarize(&records, THRESHOLD), summarize(&records, THRESHOLD));
    }
}
