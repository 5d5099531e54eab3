use std::path::Path;

use tracing::{info, warn};

/// Send + Sync so it can be held across the startup awaits.
pub type EnvError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_DATABASE_URL: &str = "sqlite://testimonial_pro.db?mode=rwc";
const DEFAULT_SITE_URL: &str = "http://localhost:8000";

pub fn load_environment() -> Result<(), EnvError> {
    let env_files = if is_production_profile() {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), EnvError> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

fn is_production_profile() -> bool {
    matches!(
        dotenvy::var("ROCKET_PROFILE").as_deref(),
        Ok("production") | Ok("release")
    )
}

/// Settings the application reads on top of Rocket's own figment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub site_url: String,
    pub production: bool,
    pub otlp_endpoint: Option<String>,
    pub honeycomb_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let site_url = dotenvy::var("SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_string());

        Self {
            database_url: dotenvy::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            site_url: site_url.trim_end_matches('/').to_string(),
            production: is_production_profile(),
            otlp_endpoint: non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            honeycomb_api_key: non_empty_var("HONEYCOMB_API_KEY"),
        }
    }

    pub fn deployment_environment(&self) -> &'static str {
        if self.production {
            "production"
        } else {
            "development"
        }
    }

    /// Public URL customers use to reach an owner's submission form.
    pub fn collection_link(&self, user_id: &str) -> String {
        format!("{}/collect/{}", self.site_url, user_id)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            production: false,
            otlp_endpoint: None,
            honeycomb_api_key: None,
        }
    }
}
