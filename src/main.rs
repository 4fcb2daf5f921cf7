use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;

use flint::config::Config;
use flint::db::{seed, Database};
use flint::portal::{ClientError, PropertyPortal};
use flint::types::SearchFilters;

#[derive(Parser, Debug)]
#[command(name = "flint")]
#[command(about = "Property listing portal: API server and resilient API client")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./flint.yaml, then $XDG_CONFIG_HOME/flint/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the API server
  Serve {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    bind: Option<String>,
  },
  /// Create the schema and load the demo listings
  Seed,
  /// List all properties
  Properties(ClientArgs),
  /// Show one property with history and nearby schools
  Property {
    id: String,
    #[command(flatten)]
    client: ClientArgs,
  },
  /// Search properties by address phrase
  Search {
    query: String,
    #[arg(long = "type")]
    property_type: Option<String>,
    #[arg(long)]
    min_price: Option<String>,
    #[arg(long)]
    max_price: Option<String>,
    #[arg(long)]
    bedrooms: Option<String>,
    #[arg(long)]
    bathrooms: Option<String>,
    #[command(flatten)]
    client: ClientArgs,
  },
  /// Sale history of a property
  History {
    id: i64,
    #[command(flatten)]
    client: ClientArgs,
  },
  /// Suburb market insights
  Insights {
    #[arg(long)]
    suburb: Option<String>,
    #[command(flatten)]
    client: ClientArgs,
  },
  /// Schools, optionally filtered by suburb and postcode
  Schools {
    #[arg(long)]
    suburb: Option<String>,
    #[arg(long)]
    postcode: Option<String>,
    #[command(flatten)]
    client: ClientArgs,
  },
  /// API health check
  Health(ClientArgs),
  /// Aggregate property statistics
  Stats(ClientArgs),
  /// Properties, insights, schools and stats in one call
  Overview(ClientArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct ClientArgs {
  /// API base URL (overrides client.base_url)
  #[arg(long)]
  api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = flint::logging::init(&config.logging)?;

  match args.command {
    Command::Serve { bind } => flint::api::serve(&config, bind.as_deref()).await,
    Command::Seed => seed_database(&config),
    Command::Properties(client) => print_json(&portal(&config, &client)?.all_properties().await),
    Command::Property { id, client } => {
      let portal = portal(&config, &client)?;
      match portal.property_by_id(&id).await {
        Ok(detail) => print_json(&detail),
        Err(e @ ClientError::InvalidIdentifier(_)) => Err(eyre!("{}", e)),
        Err(e) => Err(eyre!("Failed to fetch property {}: {}", id, e)),
      }
    }
    Command::Search {
      query,
      property_type,
      min_price,
      max_price,
      bedrooms,
      bathrooms,
      client,
    } => {
      let filters = SearchFilters {
        property_type,
        min_price,
        max_price,
        bedrooms,
        bathrooms,
      };
      let results = portal(&config, &client)?
        .search_properties(&query, &filters)
        .await;
      print_json(&results)
    }
    Command::History { id, client } => {
      print_json(&portal(&config, &client)?.property_history(id).await)
    }
    Command::Insights { suburb, client } => print_json(
      &portal(&config, &client)?
        .market_insights(suburb.as_deref())
        .await,
    ),
    Command::Schools {
      suburb,
      postcode,
      client,
    } => print_json(
      &portal(&config, &client)?
        .schools(suburb.as_deref(), postcode.as_deref())
        .await,
    ),
    Command::Health(client) => print_json(&portal(&config, &client)?.health_check().await),
    Command::Stats(client) => print_json(&portal(&config, &client)?.property_stats().await),
    Command::Overview(client) => {
      let portal = portal(&config, &client)?;
      let overview = portal.overview().await;
      tracing::info!(stats = ?portal.performance_stats(), "Overview fetched");
      print_json(&overview)
    }
  }
}

fn portal(config: &Config, args: &ClientArgs) -> Result<PropertyPortal> {
  let mut client = config.client.clone();
  if let Some(url) = &args.api_url {
    client.base_url = url.clone();
  }
  PropertyPortal::new(&client).map_err(|e| eyre!("Failed to create API client: {}", e))
}

fn seed_database(config: &Config) -> Result<()> {
  let path = config.database_path()?;
  let db = Database::open(&path)?;
  seed::load_demo_data(db.conn())?;
  tracing::info!(path = %path.display(), "Loaded demo data");
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let json =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to encode output: {}", e))?;
  println!("{}", json);
  Ok(())
}
