pub mod error;

pub use error::{GeocodeError, Result};

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

const MAX_QUERY_LEN: usize = 200;

/// Latitude/longitude resolved for a free-text address.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimResult {
    fn into_coordinates(self) -> Result<Coordinates> {
        let lat: f64 = self
            .lat
            .parse()
            .map_err(|_| GeocodeError::InvalidCoordinates(format!("lat '{}'", self.lat)))?;
        let lng: f64 = self
            .lon
            .parse()
            .map_err(|_| GeocodeError::InvalidCoordinates(format!("lon '{}'", self.lon)))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(GeocodeError::InvalidCoordinates(format!("{lat},{lng}")));
        }
        Ok(Coordinates {
            lat,
            lng,
            display_name: self.display_name,
        })
    }
}

pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Resolve a free-text address to coordinates. Zero results is an error.
    pub async fn search(&self, query: &str) -> Result<Coordinates> {
        let query = validate_query(query)?;
        let endpoint = format!("{}/search", self.base_url);

        let resp = self
            .client
            .get(&endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let coords = parse_response(query, &body)?;
        debug!(query, lat = coords.lat, lng = coords.lng, "Geocoded location");
        Ok(coords)
    }
}

fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(GeocodeError::InvalidInput("empty location".to_string()));
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(GeocodeError::InvalidInput(format!(
            "location too long (max {MAX_QUERY_LEN} chars)"
        )));
    }
    Ok(query)
}

fn parse_response(query: &str, body: &str) -> Result<Coordinates> {
    let results: Vec<NominatimResult> = serde_json::from_str(body)
        .map_err(|e| GeocodeError::InvalidCoordinates(format!("malformed response: {e}")))?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NoResults(query.to_string()))?
        .into_coordinates()
}
