//! Seed data script: populates the database with a small demo marketplace.
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - an admin, two approved vendors and two customers
//! - categories and products with images and variants
//! - storefront banners
//! - one paid order, one review and one buyer/seller conversation

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::info;

use iwanyu_api::{config, db, services::seed};

#[derive(Parser)]
#[command(name = "seed-data", about = "Populate the Iwanyu database with demo data", version)]
struct Cli {
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        help = "Delete existing rows before seeding (pass `--reset false` to keep them)"
    )]
    reset: bool,
    #[arg(long, help = "Database URL; defaults to DATABASE_URL or the configured database_url")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Iwanyu Seed Data ===");

    let mut cfg = config::load_config().context("failed to load configuration")?;
    if let Some(url) = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
    {
        cfg.database_url = url;
    }

    info!("Connecting to database: {}", cfg.redacted_database_url());
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;
    info!("Schema is up to date");

    if cli.reset {
        info!("Clearing existing data...");
        seed::clear_all(&pool).await?;
    }

    info!("Creating demo data...");
    let summary = seed::seed_demo(&pool, &cfg.default_currency).await?;
    info!(
        users = summary.users,
        vendors = summary.vendors,
        categories = summary.categories,
        products = summary.products,
        variants = summary.variants,
        images = summary.images,
        banners = summary.banners,
        orders = summary.orders,
        payments = summary.payments,
        reviews = summary.reviews,
        conversations = summary.conversations,
        messages = summary.messages,
        "seed complete"
    );

    info!("");
    info!("Demo accounts:");
    for account in seed::demo_accounts() {
        info!("  {:<24} {:<12} {:?}", account.email, account.password, account.role);
    }
    info!("");
    info!("Try: curl http://localhost:8080/api/products");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}
