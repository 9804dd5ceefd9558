//! Run the enhanced search (or a single detail lookup) against the live APIs and print JSON.
//! Usage:
//!   cargo run --bin search_probe -- search "<query>" [country]
//!   cargo run --bin search_probe -- detail <movie|series> <tmdb_id> [country]
//! Requires TMDB_API_KEY and RAPIDAPI_KEY in the environment (.env supported).
//! Without a country the location is resolved through the usual geolocation chain.

use anyhow::{Context, Result};
use bingefast::catalog::Catalog;
use bingefast::config::Config;
use bingefast::enhance::SearchService;
use bingefast::geo::GeoContext;
use bingefast::models::{Location, MediaKind};
use bingefast::ranking::rank_and_filter;
use bingefast::streaming::StreamingClient;
use bingefast::tmdb::TmdbClient;
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin search_probe -- search \"<query>\" [country]");
    eprintln!("       cargo run --bin search_probe -- detail <movie|series> <tmdb_id> [country]");
    std::process::exit(1);
}

fn geo_for(country: Option<&String>, config: &Config) -> Result<GeoContext> {
    match country {
        Some(c) => Ok(GeoContext::fixed(Location {
            country: c.to_uppercase(),
            region: None,
            region_preference: None,
        })),
        None => GeoContext::from_http(&config.default_country, config.upstream_timeout),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }
    let config = Config::from_env()?;
    let tmdb = Arc::new(TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.upstream_timeout,
    )?);

    match args[1].as_str() {
        "search" => {
            let geo = Arc::new(geo_for(args.get(3), &config)?);
            let streaming = Arc::new(StreamingClient::new(
                config.rapidapi_key.clone(),
                config.upstream_timeout,
            )?);
            let service = SearchService::new(tmdb, streaming, geo.clone(), config.search_freshness);
            let titles = service
                .search(&args[2])
                .await
                .context("search failed")?;
            let location = geo.location().await;
            let ranked = rank_and_filter(
                titles,
                location.region_preference.as_ref(),
                &Default::default(),
            );
            println!("location: {}", serde_json::to_string(location)?);
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        "detail" => {
            let kind: MediaKind = args[2].parse()?;
            let id: i32 = args
                .get(3)
                .unwrap_or_else(|| usage())
                .parse()
                .context("tmdb_id must be an integer")?;
            let geo = Arc::new(geo_for(args.get(4), &config)?);
            let catalog = Catalog::new(tmdb, geo, config.catalog_freshness);
            let title = catalog.details(kind, id).await?;
            println!("{}", serde_json::to_string_pretty(&title)?);
        }
        _ => usage(),
    }

    Ok(())
}
