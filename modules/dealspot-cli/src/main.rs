//! Operator CLI for the listing engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use dealspot_common::dates::format_listing_date;
use dealspot_common::{
    Config, DistanceCeiling, GeoPoint, ListingDefinition, ListingType, QueryLocation, SearchQuery,
    SortStrategy, StatusFilter,
};
use dealspot_domains::listings::validate_definition;
use dealspot_domains::{ListingService, PgBusinessLookup, PgListingStore};
use geocode_client::NominatimClient;

#[derive(Parser)]
#[command(name = "dealspot")]
#[command(about = "Schedule and discover time-bounded restaurant deals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Print the dates a listing definition expands to (no database needed)
    Expand {
        /// JSON file holding one listing definition
        definition: PathBuf,
    },

    /// Create a listing from a JSON definition
    Add { definition: PathBuf },

    /// Replace a listing's definition and regenerate its occurrences
    Edit { id: Uuid, definition: PathBuf },

    /// Delete a listing
    Delete { id: Uuid },

    /// List a business's listings with their current status
    Business {
        id: Uuid,

        /// active, scheduled, ended or all
        #[arg(long, default_value = "all")]
        status: String,
    },

    /// Search for deals near a location
    Search(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Free-text location to geocode when no coordinates are given
    #[arg(long, conflicts_with = "lat")]
    location: Option<String>,

    /// Search the coming days instead of today
    #[arg(long)]
    future: bool,

    /// meal or happy_hour
    #[arg(long = "type")]
    listing_type: Option<String>,

    #[arg(long)]
    max_price: Option<f64>,

    #[arg(long)]
    dietary: Option<String>,

    /// Maximum distance, or "all"
    #[arg(long, default_value = "all")]
    max_distance: String,

    #[arg(long)]
    keywords: Option<String>,

    /// distance, price, timeLeft or dateAdded
    #[arg(long, default_value = "distance")]
    sort: String,
}

impl SearchArgs {
    fn into_query(self) -> Result<SearchQuery> {
        let location = match (self.lat, self.lng, self.location) {
            (Some(lat), Some(lng), _) => QueryLocation::Coordinates(GeoPoint::new(lat, lng)),
            (_, _, Some(text)) => QueryLocation::Text(text),
            _ => anyhow::bail!("either --lat/--lng or --location is required"),
        };

        let listing_type = self
            .listing_type
            .as_deref()
            .map(str::parse::<ListingType>)
            .transpose()?;

        Ok(SearchQuery {
            listing_type,
            future: self.future,
            location,
            price_ceiling: self.max_price,
            dietary: self.dietary,
            distance: self.max_distance.parse::<DistanceCeiling>()?,
            keywords: self.keywords,
            sort: SortStrategy::from_name(&self.sort),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dealspot=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Commands::Expand { definition } = &cli.command {
        return expand(definition);
    }

    let config = Config::from_env()?;
    config.log_redacted();

    let store = PgListingStore::connect(&config.database_url, 10).await?;

    if let Commands::Migrate = cli.command {
        store.migrate().await?;
        info!("Migrations complete");
        return Ok(());
    }

    let geocoder = NominatimClient::new(
        &config.geocoding_base_url,
        &config.geocoding_user_agent,
        config.geocoding_timeout,
    )?;
    let businesses = PgBusinessLookup::new(store.pool().clone());
    let service = ListingService::new(
        Arc::new(store),
        Arc::new(businesses),
        Arc::new(geocoder),
        config.discovery()?,
    );

    match cli.command {
        Commands::Add { definition } => {
            let id = service.add_listing(&read_definition(&definition)?).await?;
            println!("{id}");
        }
        Commands::Edit { id, definition } => {
            service.edit_listing(id, &read_definition(&definition)?).await?;
        }
        Commands::Delete { id } => service.delete_listing(id).await?,
        Commands::Business { id, status } => {
            let listings = service
                .listings_by_business(id, status.parse::<StatusFilter>()?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }
        Commands::Search(args) => {
            let results = service.search(&args.into_query()?).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Migrate | Commands::Expand { .. } => {}
    }

    Ok(())
}

fn read_definition(path: &Path) -> Result<ListingDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn expand(path: &Path) -> Result<()> {
    let definition = read_definition(path)?;
    let expansion = validate_definition(&definition)?;
    for date in &expansion.dates {
        println!(
            "{} {}-{}",
            format_listing_date(*date),
            expansion.start_time.format("%H:%M"),
            expansion.end_time.format("%H:%M"),
        );
    }
    info!(occurrences = expansion.len(), "Expanded definition");
    Ok(())
}
