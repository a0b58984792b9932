use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};

/// Paginated search endpoint returning a CSV payload of listings
pub const GIS_CSV_ENDPOINT: &str = "https://www.redfin.com/stingray/api/gis-csv";

// Resolver chain endpoints, keyed by address, then property URL, then property id
pub const AUTOCOMPLETE_ENDPOINT: &str = "https://www.redfin.com/stingray/do/location-autocomplete";
pub const INITIAL_INFO_ENDPOINT: &str = "https://www.redfin.com/stingray/api/home/details/initialInfo";
pub const BELOW_THE_FOLD_ENDPOINT: &str =
    "https://www.redfin.com/stingray/api/home/details/belowTheFold";

/// Anti-JSON prefix the stingray endpoints prepend to every JSON body
pub const PAYLOAD_PREFIX: &str = "{}&&";

/// Columns the listing feed must carry; anything else in the payload is ignored
pub const EXPECTED_COLUMNS: [&str; 5] = [
    "ADDRESS",
    "CITY",
    "STATE OR PROVINCE",
    "ZIP OR POSTAL CODE",
    "PRICE",
];

/// Browser-like headers applied to every portal call
pub fn request_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; CrOS x86_64 13982.82.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.157 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.redfin.com"));
    headers.insert(
        REFERER,
        HeaderValue::from_static("https://www.redfin.com/city/12839/DC/Washington-DC"),
    );
    headers
}
