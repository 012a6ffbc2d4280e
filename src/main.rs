use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emrcost::calculator::EmrCostCalculator;
use emrcost::config::{self, Config};
use emrcost::emr::EmrClient;

#[derive(Parser)]
#[command(name = "emrcost")]
#[command(
    about = "Compute the cost of EMR clusters from instance runtimes and a price table",
    long_about = "emrcost reconciles each EMR instance's observed runtime against a\nconfigured price table.\n\nModes:\n  - total:   cost of every cluster created inside a date window\n  - cluster: cost of a single cluster, broken down by group role\n\nSpot groups are billed at their bid price; on-demand groups use the\n[prices] table from the config file. Partial hours bill as full hours."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (holds the [prices] table)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Total EMR cost for all clusters created inside a date window
    Total {
        /// AWS region the clusters were launched in
        #[arg(long)]
        region: String,
        /// Count clusters created after this day
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_cli_date)]
        created_after: NaiveDate,
        /// Count clusters created before this day
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_cli_date)]
        created_before: NaiveDate,
        /// Static AWS access key id (default credential chain otherwise)
        #[arg(long, requires = "aws_secret_access_key")]
        aws_access_key_id: Option<String>,
        /// Static AWS secret access key
        #[arg(long, requires = "aws_access_key_id")]
        aws_secret_access_key: Option<String>,
    },
    /// Cost of a single cluster, broken down by group role
    Cluster {
        /// AWS region the cluster was launched in
        #[arg(long)]
        region: String,
        /// Cluster id (e.g. j-1234567890ABC)
        #[arg(long)]
        cluster_id: String,
        /// Static AWS access key id (default credential chain otherwise)
        #[arg(long, requires = "aws_secret_access_key")]
        aws_access_key_id: Option<String>,
        /// Static AWS secret access key
        #[arg(long, requires = "aws_access_key_id")]
        aws_secret_access_key: Option<String>,
    },
    /// Write a starter config file with a sample price table
    Init {
        /// Output path for the config file
        #[arg(short, long, default_value = ".emrcost.toml")]
        output: PathBuf,
    },
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("incorrect date format {value:?}, should be YYYY-MM-DD"))
}

fn render_total(total: f64, output: &str) -> String {
    if output == "json" {
        serde_json::json!({ "total": total }).to_string()
    } else {
        total.to_string()
    }
}

async fn build_emr_client(
    region: String,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
) -> EmrClient {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_sdk_emr::config::Region::new(region));
    if let (Some(id), Some(secret)) = (access_key_id, secret_access_key) {
        loader = loader.credentials_provider(aws_sdk_emr::config::Credentials::new(
            id, secret, None, None, "emrcost-cli",
        ));
    }
    let sdk_config = loader.load().await;
    EmrClient::new(&sdk_config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Total {
            region,
            created_after,
            created_before,
            aws_access_key_id,
            aws_secret_access_key,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let prices = config.price_table();
            if prices.is_empty() {
                warn!("Price table is empty; any on-demand group will fail cost resolution");
            }
            info!("Retrieving cost in region {}", region);
            let client = build_emr_client(region, aws_access_key_id, aws_secret_access_key).await;
            let calculator = EmrCostCalculator::new(&client, &prices);
            let total = calculator
                .get_total_cost_by_dates(created_after, created_before)
                .await
                .context("failed to compute total cost for the date window")?;
            println!("{}", render_total(total, &cli.output));
        }
        Commands::Cluster {
            region,
            cluster_id,
            aws_access_key_id,
            aws_secret_access_key,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let prices = config.price_table();
            if prices.is_empty() {
                warn!("Price table is empty; any on-demand group will fail cost resolution");
            }
            info!("Retrieving cost in region {}", region);
            let client = build_emr_client(region, aws_access_key_id, aws_secret_access_key).await;
            let calculator = EmrCostCalculator::new(&client, &prices);
            let report = calculator
                .get_cluster_cost(&cluster_id)
                .await
                .with_context(|| format!("failed to compute cost for cluster {cluster_id}"))?;
            if report.provisional {
                warn!("Cluster {} has running instances; cost is an estimate", cluster_id);
            }
            if cli.output == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (key, cost) in &report.costs {
                    println!("{key}: {cost}");
                }
            }
        }
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
    }

    Ok(())
}
