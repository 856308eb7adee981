//! Provision an organization.
//!
//! Orgs are created by operators, never by devices. Run against the same
//! DATABASE_URL the API uses:
//!
//!   provision_org --slug acme --name "Acme Gems"

use anyhow::Result;
use clap::Parser;
use facet_core::Config;
use facet_db::OrgRepository;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "provision_org", about = "Create an organization")]
struct Args {
    /// URL-safe identifier used in storage paths and API requests
    #[arg(long)]
    slug: String,

    /// Display name
    #[arg(long)]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.slug.is_empty() || args.slug.contains('/') {
        anyhow::bail!("Slug must be non-empty and must not contain '/'");
    }

    let config = Config::from_env()?;
    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL is not set");
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;

    let orgs = OrgRepository::new(pool);
    let org = orgs.create(&args.slug, &args.name).await?;

    println!("Created organization {} (slug '{}')", org.id, org.slug);

    Ok(())
}
