//! Create an admin account, or reset the password of an existing one

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use labloan_server::{config::AppConfig, repository::Repository, services::auth::AuthService};

#[derive(Parser, Debug)]
#[command(
    name = "provision-admin",
    about = "Create or reset a lab loan admin account",
    version
)]
struct Cli {
    /// Login name
    #[arg(long)]
    username: String,
    /// Display name recorded as approver; defaults to the username
    #[arg(long)]
    name: Option<String>,
    /// Password (at least 8 characters)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
    /// Override the configured database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labloan_server=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    let database_url = cli.database_url.unwrap_or(config.database.url);

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let auth = AuthService::new(Repository::new(pool), config.auth);
    let name = cli.name.unwrap_or_else(|| cli.username.clone());
    let admin = auth
        .provision_admin(&cli.username, &name, &cli.password)
        .await
        .context("Failed to provision admin")?;

    println!("Admin '{}' ({}) is ready", admin.username, admin.name);
    Ok(())
}
