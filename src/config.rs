use crate::source::CsvSource;

pub const DEFAULT_CSV: &str = "salaries.csv";

/// Runtime configuration loaded from environment variables.
///
/// | Env Var      | Default        |
/// |--------------|----------------|
/// | `SALARY_CSV` | `salaries.csv` |
/// | `HOST`       | `0.0.0.0`      |
/// | `PORT`       | `3000`         |
///
/// Binaries call `dotenvy::dotenv()` first so a `.env` file can supply
/// these. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub source: CsvSource,
    pub host: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            source: CsvSource::parse(DEFAULT_CSV),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = DashboardConfig::default();

        let source = lookup("SALARY_CSV")
            .map(|s| CsvSource::parse(&s))
            .unwrap_or(defaults.source);

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16, got `{raw}`"))?,
            None => defaults.port,
        };

        Ok(DashboardConfig { source, host, port })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("SALARY_CSV", "https://example.com/s.csv"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.source, CsvSource::Url("https://example.com/s.csv".into()));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_bad_port() {
        let err = DashboardConfig::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
