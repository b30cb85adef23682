use anyhow::{bail, Context, Result};

use stratus_core::{CacheSettings, Config};
use stratus_weather::{CacheConfig, CredentialRegistry, WeatherSdk};

#[tokio::main]
async fn main() -> Result<()> {
    stratus_core::init()?;

    let (config, _validation) = Config::load_validated().context("Failed to load configuration")?;

    let mut args = std::env::args().skip(1);
    let city = args.next().unwrap_or_else(|| config.default_city.clone());
    let coords = match (args.next(), args.next()) {
        (Some(lat), Some(lon)) => Some((
            lat.parse::<f64>().context("Latitude must be a number")?,
            lon.parse::<f64>().context("Longitude must be a number")?,
        )),
        (Some(_), None) => bail!("Usage: stratus [CITY [LAT LON]]"),
        _ => None,
    };

    let Some(api_key) = config.resolved_api_key() else {
        bail!(
            "No API credential configured; set STRATUS_API_KEY or api_key in {}",
            config.config_dir.join("config.toml").display()
        );
    };

    let sdk = WeatherSdk::new(&api_key, &cache_config(&config.cache))?;

    let snapshot = match coords {
        Some((lat, lon)) => sdk.weather_at(&city, lat, lon).await,
        None => sdk.weather(&city).await,
    }
    .with_context(|| format!("Failed to fetch weather for {city}"))?;

    println!("{}", serde_json::to_string_pretty(&snapshot.report())?);
    println!(
        "Observed {} local time ({})",
        snapshot.observed_at_local(),
        snapshot.name
    );

    // Stops any background refresher before the runtime winds down.
    CredentialRegistry::global().shutdown().await;

    Ok(())
}

fn cache_config(settings: &CacheSettings) -> CacheConfig {
    CacheConfig {
        ttl_seconds: settings.ttl_seconds,
        history_capacity: settings.history_capacity,
        polling_enabled: settings.polling_enabled,
        poll_interval_seconds: settings.poll_interval_seconds,
    }
}
