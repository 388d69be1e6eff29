use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{GeodataProvider, SearchBias};
use crate::config::GeodataConfig;
use crate::models::{AccessibilityFlags, PlaceRecord};
use crate::{BarrierFreeError, Result};

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,places.accessibilityOptions";

/// Google Places API (New) text search client
pub struct GooglePlacesClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

/// Request body for `places:searchText`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<LocationBias>,
}

#[derive(Debug, Serialize)]
struct LocationBias {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

/// Search response; `places` is omitted entirely when nothing matched
#[derive(Debug, Deserialize)]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<ApiPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    id: String,
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    accessibility_options: Option<AccessibilityOptions>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessibilityOptions {
    wheelchair_accessible_parking: Option<bool>,
    wheelchair_accessible_entrance: Option<bool>,
    wheelchair_accessible_restroom: Option<bool>,
    wheelchair_accessible_seating: Option<bool>,
}

impl From<ApiPlace> for PlaceRecord {
    fn from(place: ApiPlace) -> Self {
        let options = place.accessibility_options.unwrap_or_default();
        let (latitude, longitude) = place
            .location
            .map_or((0.0, 0.0), |l| (l.latitude, l.longitude));

        PlaceRecord {
            display_name: place
                .display_name
                .map(|name| name.text)
                .unwrap_or_else(|| place.id.clone()),
            id: place.id,
            formatted_address: place.formatted_address.unwrap_or_default(),
            latitude,
            longitude,
            accessibility: AccessibilityFlags {
                entrance: options.wheelchair_accessible_entrance,
                parking: options.wheelchair_accessible_parking,
                restroom: options.wheelchair_accessible_restroom,
                seating: options.wheelchair_accessible_seating,
            },
        }
    }
}

fn search_body(query: &str, bias: Option<SearchBias>) -> SearchTextRequest<'_> {
    SearchTextRequest {
        text_query: query,
        max_result_count: 1,
        location_bias: bias.map(|b| LocationBias {
            circle: Circle {
                center: LatLng {
                    latitude: b.latitude,
                    longitude: b.longitude,
                },
                radius: b.radius_m,
            },
        }),
    }
}

impl GooglePlacesClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &GeodataConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BarrierFreeError::config("Geodata API key is missing"))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("BarrierFree/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BarrierFreeError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeodataProvider for GooglePlacesClient {
    #[instrument(skip(self), fields(query = %query))]
    async fn text_search(
        &self,
        query: &str,
        bias: Option<SearchBias>,
    ) -> Result<Option<PlaceRecord>> {
        let url = format!("{}/places:searchText", self.base_url);
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&search_body(query, bias))
            .send()
            .await
            .map_err(|e| BarrierFreeError::resolution(format!("Places request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Places API returned {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => BarrierFreeError::resolution(
                    "Places API rejected the request. Please check the Google Maps API key.",
                ),
                429 => BarrierFreeError::resolution("Places API rate limit exceeded"),
                _ => BarrierFreeError::resolution(format!(
                    "Places API error {status}: {error_text}"
                )),
            });
        }

        let search: SearchTextResponse = response.json().await.map_err(|e| {
            BarrierFreeError::resolution(format!("Failed to parse Places response: {e}"))
        })?;

        let record = search.places.into_iter().next().map(PlaceRecord::from);

        match &record {
            Some(place) => info!(
                "Resolved '{}' to '{}' in {:.3}s",
                query,
                place.display_name,
                start_time.elapsed().as_secs_f64()
            ),
            None => debug!("No Places result for '{}'", query),
        }

        Ok(record)
    }
}
