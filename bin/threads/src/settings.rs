//! Runtime settings, read from `THREADS_*` environment variables (a `.env`
//! file is loaded first).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database_url", "sqlite:threads.db?mode=rwc")?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080_i64)?
            .set_default("max_connections", 5_i64)?
            .add_source(config::Environment::with_prefix("THREADS").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_environment() {
        // THREADS_* is not set by the test harness
        let settings = Settings::load().unwrap();
        assert!(!settings.database_url.is_empty());
        assert!(settings.port > 0);
        assert!(settings.max_connections >= 1);
    }
}
