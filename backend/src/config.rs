use anyhow::Context;

use crate::db;
use crate::service::Store;

/// Settings shared by the api server and the bot, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs on a private in-memory database.
    pub database_url: Option<String>,
    /// Prefix of every image path.
    pub base_url: String,
    pub api_bind: String,
    pub cors_origin: String,
    pub tgbot_token: Option<String>,
    /// Fill an empty database with the bundled menu.
    pub seed: bool,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let seed = match get("SEED", "true").to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => anyhow::bail!("SEED should be a boolean, got {other}"),
        };
        let log_level = get("LOG_LEVEL", "info")
            .parse()
            .context("LOG_LEVEL should be one of trace, debug, info, warn, error")?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            base_url: get("BASE_URL", "http://localhost:3000/"),
            api_bind: get("API_BIND", "127.0.0.1:8080"),
            cors_origin: get("CORS_ORIGIN", "http://localhost:3000"),
            tgbot_token: lookup("TGBOT_TOKEN"),
            seed,
            log_level,
        })
    }

    pub fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn open_store(&self) -> anyhow::Result<Store> {
        let pool = match &self.database_url {
            Some(url) => db::connect(url).await?,
            None => {
                tracing::warn!("DATABASE_URL not set, using an in-memory database");
                db::connect_in_memory().await?
            }
        };
        if self.seed {
            db::seed(&pool, &db::Seed::bundled()?).await?;
        }
        Ok(Store::new(pool))
    }

    pub fn setup_logging(&self) -> anyhow::Result<()> {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(self.log_level)
            .with_ansi(true)
            .with_file(false)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber).context("fail to setup logging")
    }
}
