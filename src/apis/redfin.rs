use crate::config::{EnrichmentConfig, SearchParams};
use crate::constants::{
    request_headers, AUTOCOMPLETE_ENDPOINT, BELOW_THE_FOLD_ENDPOINT, EXPECTED_COLUMNS,
    GIS_CSV_ENDPOINT, INITIAL_INFO_ENDPOINT, PAYLOAD_PREFIX,
};
use crate::error::{Result, ScraperError};
use crate::types::{Listing, ListingSource, TaxResolver, TaxValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Client for the Redfin portal: the gis-csv listing feed plus the
/// autocomplete → initialInfo → belowTheFold tax-lookup chain.
pub struct RedfinApi {
    client: reqwest::Client,
}

impl RedfinApi {
    pub fn new(enrichment: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(request_headers())
            .timeout(Duration::from_secs(enrichment.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }

    /// GET a stingray endpoint and parse its prefixed JSON body. Any network,
    /// status, or parse problem is a lookup failure, not an error.
    async fn stingray_get(&self, endpoint: &str, query: &[(&str, String)]) -> Option<Value> {
        let response = self.client.get(endpoint).query(query).send().await.ok()?;
        if !response.status().is_success() {
            debug!("{} returned status {}", endpoint, response.status());
            return None;
        }
        let body = response.text().await.ok()?;
        serde_json::from_str(strip_payload_prefix(&body)).ok()
    }

    /// Step 1: autocomplete the address to an exact-match property URL
    async fn autocomplete(&self, address: &str) -> Option<String> {
        let payload = self
            .stingray_get(
                AUTOCOMPLETE_ENDPOINT,
                &[("location", address.to_string()), ("v", "2".to_string())],
            )
            .await?;
        parse_exact_match_url(&payload)
    }

    /// Step 2: resolve the property URL to a property id
    async fn initial_info(&self, url_path: &str) -> Option<u64> {
        let payload = self
            .stingray_get(INITIAL_INFO_ENDPOINT, &[("path", url_path.to_string())])
            .await?;
        parse_property_id(&payload)
    }

    /// Step 3: pull the tax history and take the most recent roll year
    async fn latest_assessment(&self, property_id: u64) -> Option<f64> {
        let payload = self
            .stingray_get(
                BELOW_THE_FOLD_ENDPOINT,
                &[
                    ("propertyId", property_id.to_string()),
                    ("accessLevel", "1".to_string()),
                ],
            )
            .await?;
        parse_latest_assessment(&payload)
    }

    async fn assessed_value_for(&self, address: &str) -> Option<f64> {
        let url_path = self.autocomplete(address).await?;
        let property_id = self.initial_info(&url_path).await?;
        self.latest_assessment(property_id).await
    }
}

#[async_trait::async_trait]
impl ListingSource for RedfinApi {
    fn source_name(&self) -> &'static str {
        "redfin"
    }

    #[instrument(skip(self, search))]
    async fn fetch_listings(&self, search: &SearchParams) -> Result<Vec<Listing>> {
        let response = self
            .client
            .get(GIS_CSV_ENDPOINT)
            .query(&search_query(search))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScraperError::Api {
                message: format!("Listing feed returned status {}", response.status()),
            });
        }

        let body = response.text().await?;
        parse_listing_csv(&body)
    }
}

#[async_trait::async_trait]
impl TaxResolver for RedfinApi {
    #[instrument(skip(self))]
    async fn resolve(&self, address: &str) -> TaxValue {
        match self.assessed_value_for(address).await {
            Some(value) => TaxValue::Assessed(value),
            None => {
                debug!("Tax lookup unresolved for '{}'", address);
                TaxValue::Unresolved
            }
        }
    }
}

/// The stingray endpoints prepend `{}&&` to every JSON body
fn strip_payload_prefix(body: &str) -> &str {
    body.strip_prefix(PAYLOAD_PREFIX).unwrap_or(body)
}

fn search_query(search: &SearchParams) -> Vec<(&'static str, String)> {
    vec![
        ("al", "1".to_string()),
        ("hoa", search.hoa.to_string()),
        ("market", search.market.clone()),
        ("max_listing_approx_size", search.max_listing_approx_size.to_string()),
        ("min_listing_approx_size", search.min_listing_approx_size.to_string()),
        ("max_num_beds", search.max_num_beds.to_string()),
        ("max_price", search.max_price.to_string()),
        ("num_baths", search.num_baths.to_string()),
        ("num_beds", search.num_beds.to_string()),
        ("num_homes", search.num_homes.to_string()),
        ("page_number", search.page_number.to_string()),
        ("region_id", search.region_id.to_string()),
        ("region_type", search.region_type.to_string()),
        ("sf", search.sf.clone()),
        ("status", search.status.clone()),
        ("uipt", search.uipt.clone()),
        ("v", "8".to_string()),
    ]
}

/// Parse the listing feed's CSV payload. Missing expected columns are fatal;
/// rows that fail to parse (short rows, non-numeric price, the trailing
/// disclaimer line) are skipped with a warning.
pub fn parse_listing_csv(body: &str) -> Result<Vec<Listing>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    let indices = column_indices(&headers)?;

    let mut listings = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable listing row {}: {}", row + 1, e);
                continue;
            }
        };
        match parse_listing_row(&record, &indices) {
            Some(listing) => listings.push(listing),
            None => warn!("Skipping malformed listing row {}", row + 1),
        }
    }
    Ok(listings)
}

/// Locate every expected column in the feed header, or fail with the full
/// list of missing ones
fn column_indices(headers: &csv::StringRecord) -> Result<[usize; 5]> {
    let mut indices = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, column) in indices.iter_mut().zip(EXPECTED_COLUMNS) {
        match headers.iter().position(|h| h == column) {
            Some(i) => *slot = i,
            None => missing.push(column.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ScraperError::MissingColumns(missing));
    }
    Ok(indices)
}

fn parse_listing_row(record: &csv::StringRecord, indices: &[usize; 5]) -> Option<Listing> {
    let [address_idx, city_idx, state_idx, zip_idx, price_idx] = *indices;
    let price = record.get(price_idx)?.trim().parse::<f64>().ok()?;
    Some(Listing {
        address: record.get(address_idx)?.to_string(),
        city: record.get(city_idx)?.to_string(),
        state: record.get(state_idx)?.to_string(),
        zip: record.get(zip_idx)?.to_string(),
        price,
    })
}

/// Autocomplete payload → exact-match property URL. Requires
/// `errorMessage == "Success"` and an `exactMatch` entry.
fn parse_exact_match_url(payload: &Value) -> Option<String> {
    if payload.get("errorMessage")?.as_str()? != "Success" {
        return None;
    }
    payload
        .get("payload")?
        .get("exactMatch")?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// initialInfo payload → property id. Requires an inner `responseCode` of 200.
fn parse_property_id(payload: &Value) -> Option<u64> {
    let inner = payload.get("payload")?;
    if inner.get("responseCode")?.as_i64()? != 200 {
        return None;
    }
    inner.get("propertyId")?.as_u64()
}

/// belowTheFold payload → assessed value from the most recent tax roll year.
/// Land and improvement components are summed, with a missing component
/// treated as zero. An empty tax history is a failed lookup.
fn parse_latest_assessment(payload: &Value) -> Option<f64> {
    let tax_info = payload
        .get("payload")?
        .get("publicRecordsInfo")?
        .get("allTaxInfo")?
        .as_array()?;
    let latest = tax_info.iter().max_by_key(|entry| {
        entry
            .get("rollYear")
            .and_then(Value::as_i64)
            .unwrap_or(i64::MIN)
    })?;
    let land = latest
        .get("taxableLandValue")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let improvement = latest
        .get("taxableImprovementValue")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    Some(land + improvement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_the_anti_json_prefix() {
        assert_eq!(strip_payload_prefix("{}&&{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_payload_prefix("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn exact_match_url_requires_success_and_exact_match() {
        let ok = json!({
            "errorMessage": "Success",
            "payload": { "exactMatch": { "url": "/DC/Washington/123-Main-St/home/1" } }
        });
        assert_eq!(
            parse_exact_match_url(&ok).as_deref(),
            Some("/DC/Washington/123-Main-St/home/1")
        );

        let no_match = json!({
            "errorMessage": "Success",
            "payload": { "sections": [] }
        });
        assert_eq!(parse_exact_match_url(&no_match), None);

        let failed = json!({
            "errorMessage": "Service Unavailable",
            "payload": { "exactMatch": { "url": "/x" } }
        });
        assert_eq!(parse_exact_match_url(&failed), None);
    }

    #[test]
    fn property_id_requires_inner_response_code() {
        let ok = json!({ "payload": { "responseCode": 200, "propertyId": 1234567, "listingId": 89 } });
        assert_eq!(parse_property_id(&ok), Some(1234567));

        let bad_code = json!({ "payload": { "responseCode": 500, "propertyId": 1234567 } });
        assert_eq!(parse_property_id(&bad_code), None);

        let malformed = json!({ "payload": { "responseCode": 200 } });
        assert_eq!(parse_property_id(&malformed), None);
    }

    #[test]
    fn latest_assessment_picks_most_recent_roll_year() {
        let payload = json!({
            "payload": { "publicRecordsInfo": { "allTaxInfo": [
                { "rollYear": 2019, "taxableLandValue": 100000.0, "taxableImprovementValue": 200000.0 },
                { "rollYear": 2021, "taxableLandValue": 150000.0, "taxableImprovementValue": 250000.0 },
                { "rollYear": 2020, "taxableLandValue": 120000.0, "taxableImprovementValue": 220000.0 }
            ] } }
        });
        assert_eq!(parse_latest_assessment(&payload), Some(400_000.0));
    }

    #[test]
    fn missing_assessment_components_count_as_zero() {
        let payload = json!({
            "payload": { "publicRecordsInfo": { "allTaxInfo": [
                { "rollYear": 2021, "taxableLandValue": 150000.0 }
            ] } }
        });
        assert_eq!(parse_latest_assessment(&payload), Some(150_000.0));
    }

    #[test]
    fn empty_tax_history_is_a_failed_lookup() {
        let payload = json!({ "payload": { "publicRecordsInfo": { "allTaxInfo": [] } } });
        assert_eq!(parse_latest_assessment(&payload), None);
    }

    #[test]
    fn parses_listing_csv_and_ignores_extra_columns() {
        let body = "SALE TYPE,ADDRESS,CITY,STATE OR PROVINCE,ZIP OR POSTAL CODE,PRICE,BEDS\n\
                    MLS Listing,123 Main St,Washington,DC,20001,550000,3\n\
                    MLS Listing,9 Oak Ave,Arlington,VA,22201,625000,2\n";
        let listings = parse_listing_csv(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].address, "123 Main St");
        assert_eq!(listings[0].price, 550_000.0);
        assert_eq!(listings[0].full_address(), "123 Main St, Washington DC");
        assert_eq!(listings[1].zip, "22201");
    }

    #[test]
    fn missing_columns_abort_with_the_full_list() {
        let body = "ADDRESS,CITY\n123 Main St,Washington\n";
        let err = parse_listing_csv(body).unwrap_err();
        match err {
            ScraperError::MissingColumns(missing) => {
                assert_eq!(
                    missing,
                    vec!["STATE OR PROVINCE", "ZIP OR POSTAL CODE", "PRICE"]
                );
            }
            other => panic!("expected MissingColumns, got {other}"),
        }
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let body = "ADDRESS,CITY,STATE OR PROVINCE,ZIP OR POSTAL CODE,PRICE\n\
                    123 Main St,Washington,DC,20001,550000\n\
                    9 Oak Ave,Arlington,VA,22201,not-a-price\n\
                    Data deemed reliable but not guaranteed.\n";
        let listings = parse_listing_csv(body).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].address, "123 Main St");
    }

    #[test]
    fn search_query_carries_the_full_parameter_bag() {
        let query = search_query(&SearchParams::default());
        let lookup = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(lookup("region_id").as_deref(), Some("2965"));
        assert_eq!(lookup("market").as_deref(), Some("dc"));
        assert_eq!(lookup("max_price").as_deref(), Some("800000"));
        assert_eq!(lookup("uipt").as_deref(), Some("1,2,3,4,5,6,7,8"));
        assert_eq!(lookup("v").as_deref(), Some("8"));
    }
}
