//! Domain types: the cached observation and its serialized report shape.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One immutable weather observation for a location.
///
/// A refresh builds a new `Snapshot` that replaces the old one in the cache
/// as a whole; snapshots are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Location key the observation is cached under.
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    /// Condition group, e.g. "Clouds".
    pub weather_main: String,
    /// Condition detail, e.g. "overcast clouds".
    pub weather_description: String,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Perceived temperature in °C.
    pub feels_like: f64,
    /// Visibility in meters.
    pub visibility: i64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Observation instant (Unix timestamp, UTC).
    pub observed_at: i64,
    pub sunrise: i64,
    pub sunset: i64,
    /// UTC offset of the location in seconds.
    pub timezone_offset: i32,
    /// Display name of the location.
    pub name: String,
}

impl Snapshot {
    /// The observation instant as a UTC datetime.
    pub fn observed_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.observed_at, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// The observation instant in the location's local time.
    pub fn observed_at_local(&self) -> NaiveDateTime {
        (self.observed_at_utc() + TimeDelta::seconds(i64::from(self.timezone_offset))).naive_utc()
    }

    /// The nested document shape handed to external consumers.
    pub fn report(&self) -> WeatherReport {
        WeatherReport {
            weather: ConditionSummary {
                main: self.weather_main.clone(),
                description: self.weather_description.clone(),
            },
            temperature: TemperatureReading {
                temp: self.temperature,
                feels_like: self.feels_like,
            },
            visibility: self.visibility,
            wind: WindReading {
                speed: self.wind_speed,
            },
            datetime: self.observed_at,
            sys: SunTimes {
                sunrise: self.sunrise,
                sunset: self.sunset,
            },
            timezone: self.timezone_offset,
            name: self.name.clone(),
        }
    }

    /// Rebuild a snapshot from its report shape.
    ///
    /// The report does not carry coordinates, so they are re-attached from
    /// context along with the cache key.
    pub fn from_report(report: WeatherReport, city: &str, lat: f64, lon: f64) -> Self {
        Self {
            city: city.to_string(),
            lat,
            lon,
            weather_main: report.weather.main,
            weather_description: report.weather.description,
            temperature: report.temperature.temp,
            feels_like: report.temperature.feels_like,
            visibility: report.visibility,
            wind_speed: report.wind.speed,
            observed_at: report.datetime,
            sunrise: report.sys.sunrise,
            sunset: report.sys.sunset,
            timezone_offset: report.timezone,
            name: report.name,
        }
    }
}

/// Serialized observation document.
///
/// Field nesting matches what downstream consumers parse:
/// `weather.main`, `temperature.temp`, `wind.speed`, `sys.sunrise`, and so
/// on. All instants stay integer Unix timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub weather: ConditionSummary,
    pub temperature: TemperatureReading,
    pub visibility: i64,
    pub wind: WindReading,
    pub datetime: i64,
    pub sys: SunTimes,
    pub timezone: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub main: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            city: "Saint Petersburg".to_string(),
            lat: 59.938732,
            lon: 30.316229,
            weather_main: "Clouds".to_string(),
            weather_description: "overcast clouds".to_string(),
            temperature: -3.2,
            feels_like: -8.1,
            visibility: 10000,
            wind_speed: 4.7,
            observed_at: 1_700_000_000,
            sunrise: 1_699_960_000,
            sunset: 1_699_990_000,
            timezone_offset: 10800,
            name: "Saint Petersburg".to_string(),
        }
    }

    #[test]
    fn test_report_round_trip_reproduces_every_field() {
        let snapshot = sample();
        let report = snapshot.report();
        let rebuilt =
            Snapshot::from_report(report, &snapshot.city, snapshot.lat, snapshot.lon);
        assert_eq!(rebuilt, snapshot);
    }

    #[test]
    fn test_report_json_shape() {
        let value = serde_json::to_value(sample().report()).unwrap();
        assert_eq!(value["weather"]["main"], "Clouds");
        assert_eq!(value["weather"]["description"], "overcast clouds");
        assert_eq!(value["temperature"]["temp"], -3.2);
        assert_eq!(value["temperature"]["feels_like"], -8.1);
        assert_eq!(value["visibility"], 10000);
        assert_eq!(value["wind"]["speed"], 4.7);
        assert_eq!(value["datetime"], 1_700_000_000i64);
        assert_eq!(value["sys"]["sunrise"], 1_699_960_000i64);
        assert_eq!(value["sys"]["sunset"], 1_699_990_000i64);
        assert_eq!(value["timezone"], 10800);
        assert_eq!(value["name"], "Saint Petersburg");
    }

    #[test]
    fn test_report_json_parses_back() {
        let json = serde_json::to_string(&sample().report()).unwrap();
        let parsed: WeatherReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample().report());
    }

    #[test]
    fn test_observed_at_local_applies_utc_offset() {
        let snapshot = sample();
        let utc = snapshot.observed_at_utc();
        let local = snapshot.observed_at_local();
        assert_eq!(local - utc.naive_utc(), TimeDelta::seconds(10800));
    }
}
