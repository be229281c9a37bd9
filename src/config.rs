use std::time::Duration;

use eyre::{Context, Result};

/// Process configuration, loaded once at startup from the environment
/// (after `dotenv-flow` has populated it from `.env`/`.env.prod`).
pub struct Settings {
    pub port: u16,
    pub endpoint: String,
    pub mediator_invite: Option<String>,
    pub enable_store: bool,
    pub repo_uri: Option<String>,
    pub repo_key: Option<String>,
    pub poll_interval: Duration,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let port: u16 = std::env::var("PORT")
            .context("PORT must be set")?
            .parse()
            .context("PORT must be a valid port number")?;
        let endpoint = std::env::var("ENDPOINT").context("ENDPOINT must be set")?;
        let mediator_invite = std::env::var("MEDIATOR_INVITE").ok();
        let enable_store = std::env::var("ENABLE_STORE").is_ok();
        let repo_uri = std::env::var("REPO_URI").ok();
        let repo_key = std::env::var("REPO_KEY").ok();

        if enable_store && repo_uri.is_none() {
            eyre::bail!("REPO_URI is required when ENABLE_STORE is set");
        }
        if enable_store && repo_key.is_none() {
            eyre::bail!("REPO_KEY is required when ENABLE_STORE is set");
        }

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            port,
            endpoint,
            mediator_invite,
            enable_store,
            repo_uri,
            repo_key,
            poll_interval: Duration::from_secs(poll_interval_secs),
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `std::env` is process-global; serialize tests that touch it so they
    // don't stomp on each other when run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in ["PORT", "ENDPOINT", "MEDIATOR_INVITE", "ENABLE_STORE", "REPO_URI", "REPO_KEY", "POLL_INTERVAL", "LOG_LEVEL"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn minimal_config_defaults_poll_interval_and_log_level() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("PORT", "8000");
        std::env::set_var("ENDPOINT", "https://mediator.example.com");

        let settings = Settings::from_env().expect("minimal config should be valid");

        assert_eq!(settings.port, 8000);
        assert_eq!(settings.endpoint, "https://mediator.example.com");
        assert!(settings.mediator_invite.is_none());
        assert!(!settings.enable_store);
        assert_eq!(settings.poll_interval, Duration::from_secs(20));
        assert_eq!(settings.log_level, "info");

        clear_env();
    }

    #[test]
    fn missing_port_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("ENDPOINT", "https://mediator.example.com");

        assert!(Settings::from_env().is_err());

        clear_env();
    }

    #[test]
    fn enable_store_without_repo_uri_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("PORT", "8000");
        std::env::set_var("ENDPOINT", "https://mediator.example.com");
        std::env::set_var("ENABLE_STORE", "1");
        std::env::set_var("REPO_KEY", "some-key");

        assert!(Settings::from_env().is_err());

        clear_env();
    }

    #[test]
    fn enable_store_with_repo_uri_and_key_is_accepted() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("PORT", "8000");
        std::env::set_var("ENDPOINT", "https://mediator.example.com");
        std::env::set_var("ENABLE_STORE", "1");
        std::env::set_var("REPO_URI", "sqlite://test.db");
        std::env::set_var("REPO_KEY", "some-key");
        std::env::set_var("POLL_INTERVAL", "5");

        let settings = Settings::from_env().expect("fully configured store should be valid");

        assert!(settings.enable_store);
        assert_eq!(settings.repo_uri.as_deref(), Some("sqlite://test.db"));
        assert_eq!(settings.poll_interval, Duration::from_secs(5));

        clear_env();
    }
}
