use std::sync::Arc;

use anyhow::Result;
use brisa_weather::{codes, Renderer, SearchError, Storage, WeatherRecord, WeatherService};

/// Plain terminal renderer for one-shot lookups.
struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn show_loading(&self) {
        println!("Looking up the weather...");
    }

    fn show_error(&self, error: &SearchError) {
        eprintln!("{}", error.user_message());
    }

    fn show_record(&self, record: &WeatherRecord) {
        let info = codes::lookup(record.current.weather_code);

        println!();
        println!("{}  {}", info.icon, record.location.display_name());
        if record.stale {
            println!("(offline - showing previously saved data)");
        }
        println!(
            "{} - {:.0}°C (feels like {:.0}°C)",
            info.description,
            record.current.temperature_c,
            record.current.apparent_temperature_c
        );
        println!(
            "Humidity {}%  Wind {:.0} km/h {}  Pressure {:.0} hPa  Clouds {}%",
            record.current.humidity_pct,
            record.current.wind_speed_kmh,
            record.current.wind_compass().abbreviation(),
            record.current.pressure_hpa,
            record.current.cloud_cover_pct
        );

        println!();
        for day in &record.forecast {
            let day_info = codes::lookup(day.weather_code);
            println!(
                "{}  {}  {:.0}° / {:.0}°",
                day.date.format("%a %d/%m"),
                day_info.icon,
                day.temp_max_c,
                day.temp_min_c
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    brisa_core::init()?;

    let (config, _validation) = brisa_core::Config::load_validated()?;
    let storage = Arc::new(Storage::open(config.data_dir.join("brisa.db"))?);
    let service = WeatherService::new(storage, &config)?;

    tracing::info!("Brisa started");

    let renderer = TerminalRenderer;
    let query: Vec<String> = std::env::args().skip(1).collect();

    if query.is_empty() {
        match service.restore_last_search().await {
            Ok(Some(record)) => renderer.show_record(&record),
            Ok(None) => println!("Usage: brisa <city name>"),
            Err(error) => renderer.show_error(&error),
        }
        return Ok(());
    }

    service
        .search_and_render(&query.join(" "), &renderer)
        .await;

    Ok(())
}
