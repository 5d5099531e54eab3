//! Promotes an existing account to platform admin.
//!
//! Usage: `grant_admin <email> [--revoke]`

use anyhow::{Context, anyhow};
use testimonial_pro::connect_database;
use testimonial_pro::db::{find_identity_by_email, set_user_admin};
use testimonial_pro::env::{AppConfig, load_environment};
use testimonial_pro::error::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = std::env::args().skip(1);
    let email = args
        .next()
        .ok_or_else(|| anyhow!("usage: grant_admin <email> [--revoke]"))?;
    let revoke = matches!(args.next().as_deref(), Some("--revoke"));

    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }
    let config = AppConfig::from_env();

    let pool = connect_database(&config.database_url).await?;

    let identity = find_identity_by_email(&pool, &email.trim().to_lowercase())
        .await?
        .with_context(|| format!("No account registered for {}", email))?;

    set_user_admin(&pool, &identity.id, !revoke).await?;

    if revoke {
        println!("Revoked admin access for {} ({})", identity.email, identity.id);
    } else {
        println!("Granted admin access to {} ({})", identity.email, identity.id);
    }

    Ok(())
}
