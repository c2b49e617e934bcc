use anyhow::Result;

use gaji_core::database::init_database;
use gaji_core::{Config, PayrollCore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    println!("🚀 Starting Gaji payroll core...");

    // Load configuration
    let config = Config::from_env()?;
    println!(
        "📋 Configuration loaded (environment: {})",
        config.environment
    );

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    println!("✅ Database initialized");

    let core = PayrollCore::new(pool);
    // Keep the wiring honest even though the binary only boots the core;
    // callers embed PayrollCore as a library.
    let _ = (&core.runs, &core.claims);

    log::info!(
        "Payroll core ready (timezone default: {})",
        config.default_timezone
    );
    println!("✅ Payroll core ready");

    Ok(())
}
