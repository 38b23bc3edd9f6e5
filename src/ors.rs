//! openrouteservice HTTP adapter for route geometries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::{ProviderRoute, RouteProvider, RouteRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeRoutes {
    pub target_count: u32,
    pub weight_factor: f64,
    pub share_factor: f64,
}

impl Default for AlternativeRoutes {
    fn default() -> Self {
        Self {
            target_count: 3,
            weight_factor: 1.4,
            share_factor: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrsConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub alternatives: AlternativeRoutes,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/ors".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            timeout_secs: 10,
            alternatives: AlternativeRoutes::default(),
        }
    }
}

impl OrsConfig {
    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/json",
            self.base_url.trim_end_matches('/'),
            self.profile
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::blocking::Client,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OrsConfig {
        &self.config
    }

    fn body_for<'a>(&'a self, request: &RouteRequest) -> DirectionsBody<'a> {
        DirectionsBody {
            coordinates: [request.origin.to_lon_lat(), request.destination.to_lon_lat()],
            format: "json",
            instructions: false,
            alternative_routes: request
                .want_alternatives
                .then_some(&self.config.alternatives),
        }
    }
}

impl RouteProvider for OrsClient {
    #[tracing::instrument(skip(self), fields(url = %self.config.directions_url()))]
    fn routes_for(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, ProviderError> {
        let mut builder = self
            .client
            .post(self.config.directions_url())
            .json(&self.body_for(request));
        if let Some(key) = &self.config.api_key {
            builder = builder.header(reqwest::header::AUTHORIZATION, key);
        }

        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let text = response.text()?;
        let body: DirectionsResponse = serde_json::from_str(&text)
            .map_err(|err| ProviderError::MalformedBody(err.to_string()))?;

        let routes = body.routes.unwrap_or_default();
        if routes.is_empty() {
            return Err(ProviderError::EmptyRoutes);
        }
        debug!(count = routes.len(), "provider returned routes");

        Ok(routes
            .into_iter()
            .map(|route| ProviderRoute {
                geometry: route.geometry,
                distance_m: route.summary.as_ref().and_then(|s| s.distance),
                duration_secs: route.summary.as_ref().and_then(|s| s.duration),
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct DirectionsBody<'a> {
    coordinates: [[f64; 2]; 2],
    format: &'static str,
    instructions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alternative_routes: Option<&'a AlternativeRoutes>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    routes: Option<Vec<DirectionsRoute>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    geometry: String,
    summary: Option<DirectionsSummary>,
}

// The provider omits zero-valued summary fields.
#[derive(Debug, Deserialize)]
struct DirectionsSummary {
    distance: Option<f64>,
    duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;

    fn request(want_alternatives: bool) -> RouteRequest {
        RouteRequest {
            origin: Coordinate::new(36.1126, -115.1767),
            destination: Coordinate::new(36.1699, -115.1398),
            want_alternatives,
        }
    }

    #[test]
    fn test_directions_url() {
        let config = OrsConfig {
            base_url: "https://api.example.org/".to_string(),
            ..OrsConfig::default()
        };
        assert_eq!(
            config.directions_url(),
            "https://api.example.org/v2/directions/driving-car/json"
        );
    }

    #[test]
    fn test_body_single_route() {
        let client = OrsClient::new(OrsConfig::default()).unwrap();
        let json = serde_json::to_value(client.body_for(&request(false))).unwrap();
        assert_eq!(json["coordinates"][0][0], -115.1767);
        assert_eq!(json["coordinates"][0][1], 36.1126);
        assert_eq!(json["format"], "json");
        assert_eq!(json["instructions"], false);
        assert!(json.get("alternative_routes").is_none());
    }

    #[test]
    fn test_body_with_alternatives() {
        let client = OrsClient::new(OrsConfig::default()).unwrap();
        let json = serde_json::to_value(client.body_for(&request(true))).unwrap();
        assert_eq!(json["alternative_routes"]["target_count"], 3);
        assert_eq!(json["alternative_routes"]["weight_factor"], 1.4);
        assert_eq!(json["alternative_routes"]["share_factor"], 0.6);
    }

    #[test]
    fn test_response_tolerates_missing_summary_fields() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{"routes":[{"geometry":"_p~iF~ps|U","summary":{"distance":12.5}},{"geometry":"abc"}]}"#,
        )
        .unwrap();
        let routes = body.routes.unwrap();
        assert_eq!(routes[0].summary.as_ref().unwrap().distance, Some(12.5));
        assert_eq!(routes[0].summary.as_ref().unwrap().duration, None);
        assert!(routes[1].summary.is_none());
    }
}
