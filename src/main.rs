use dotenvy::dotenv;
use fundraiser::{
    config::{database, settings},
    core::{board, report, repository::SeaOrmStore},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load settings, defaults when config.toml is absent
    let app_settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    let fetch_settings = app_settings.fetch_settings();

    // 4. Connect and make sure the tables exist
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Print the public fundraiser board
    let store = SeaOrmStore::new(db);
    let cards = board::fundraiser_board(&store, &store, &fetch_settings).await?;

    if cards.is_empty() {
        info!("No verified donation requests yet.");
    }
    for card in &cards {
        println!("{}", report::format_card_summary(card));

        let detail =
            report::generate_request_report(store.connection(), card.request.id, Some(3)).await?;
        for donation in &detail.recent_donations {
            println!("    {}", report::format_donation_summary(donation));
        }
    }

    Ok(())
}
