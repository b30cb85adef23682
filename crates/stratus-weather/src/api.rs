//! OpenWeather API client: current conditions and direct geocoding.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::WeatherError;
use crate::types::Snapshot;

const WEATHER_BASE: &str = "https://api.openweathermap.org";
const GEO_BASE: &str = "http://api.openweathermap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Payload blocks the SDK never reads; excluded from the response upfront.
const EXCLUDED_BLOCKS: &str = "minutely,hourly,daily,alerts";

/// HTTP client for the two upstream endpoints, bound to one API credential.
pub struct OwmClient {
    client: reqwest::Client,
    api_key: String,
    weather_base: String,
    geo_base: String,
}

impl OwmClient {
    pub fn new(api_key: &str) -> Result<Self, WeatherError> {
        Self::with_base_urls(api_key, WEATHER_BASE, GEO_BASE)
    }

    /// Build a client against alternate endpoints, primarily a mock server
    /// in tests.
    pub fn with_base_urls(
        api_key: &str,
        weather_base: &str,
        geo_base: &str,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            weather_base: weather_base.trim_end_matches('/').to_string(),
            geo_base: geo_base.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions for a coordinate pair.
    pub async fn current_weather(&self, lat: f64, lon: f64) -> Result<Observation, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.weather_base);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
                ("exclude", EXCLUDED_BLOCKS),
            ])
            .query(&[("lat", lat), ("lon", lon)])
            .send()
            .await?;

        let payload: WeatherPayload = Self::decode(response).await?;
        Observation::from_payload(payload)
    }

    /// Resolve a city name to coordinates.
    ///
    /// Fails with [`WeatherError::InvalidCity`] when the geocoder has no
    /// match for the name.
    pub async fn geocode(&self, city: &str) -> Result<(f64, f64), WeatherError> {
        let url = format!("{}/geo/1.0/direct", self.geo_base);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .query(&[("limit", 1u32)])
            .send()
            .await?;

        let matches: Vec<GeoMatch> = Self::decode(response).await?;
        match matches.first() {
            Some(hit) => Ok((hit.lat, hit.lon)),
            None => {
                tracing::debug!(city, "geocoder returned no match");
                Err(WeatherError::InvalidCity(city.to_string()))
            }
        }
    }

    /// Map upstream status codes onto the error taxonomy, then decode the
    /// body.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WeatherError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => WeatherError::Unauthorized { body },
            StatusCode::NOT_FOUND => WeatherError::NotFound(body),
            _ => WeatherError::Upstream {
                status: status.as_u16(),
                body,
            },
        })
    }
}

/// Decoded current-conditions observation, independent of the wire layout
/// and not yet bound to a location key.
#[derive(Debug, Clone)]
pub struct Observation {
    pub weather_main: String,
    pub weather_description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub visibility: i64,
    pub wind_speed: f64,
    pub observed_at: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub timezone_offset: i32,
}

impl Observation {
    fn from_payload(payload: WeatherPayload) -> Result<Self, WeatherError> {
        let condition = payload
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Decode("payload carries no weather condition".into()))?;

        Ok(Self {
            weather_main: condition.main,
            weather_description: condition.description,
            temperature: payload.main.temp,
            feels_like: payload.main.feels_like,
            visibility: payload.visibility,
            wind_speed: payload.wind.speed,
            observed_at: payload.dt,
            sunrise: payload.sys.sunrise,
            sunset: payload.sys.sunset,
            timezone_offset: payload.timezone,
        })
    }

    /// Bind the observation to a location, producing the cacheable snapshot.
    pub fn into_snapshot(self, city: &str, lat: f64, lon: f64) -> Snapshot {
        Snapshot {
            city: city.to_string(),
            lat,
            lon,
            weather_main: self.weather_main,
            weather_description: self.weather_description,
            temperature: self.temperature,
            feels_like: self.feels_like,
            visibility: self.visibility,
            wind_speed: self.wind_speed,
            observed_at: self.observed_at,
            sunrise: self.sunrise,
            sunset: self.sunset,
            timezone_offset: self.timezone_offset,
            name: city.to_string(),
        }
    }
}

/// Raw `/data/2.5/weather` payload, reduced to the fields the SDK keeps.
#[derive(Debug, Deserialize)]
struct WeatherPayload {
    weather: Vec<ConditionPayload>,
    main: MainPayload,
    // Occasionally absent upstream; zero then reads as "not reported".
    #[serde(default)]
    visibility: i64,
    wind: WindPayload,
    dt: i64,
    sys: SysPayload,
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainPayload {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct WindPayload {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct SysPayload {
    sunrise: i64,
    sunset: i64,
}

/// One `/geo/1.0/direct` match.
#[derive(Debug, Deserialize)]
struct GeoMatch {
    lat: f64,
    lon: f64,
}
