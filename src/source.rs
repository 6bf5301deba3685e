use crate::error::LoadError;
use crate::record::{parse_records, SalaryRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the salary CSV lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum CsvSource {
    File(PathBuf),
    Url(String),
}

impl CsvSource {
    /// `http://` and `https://` locations are URLs, anything else a path.
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            CsvSource::Url(location.to_string())
        } else {
            CsvSource::File(PathBuf::from(location))
        }
    }

    /// Retrieve the raw CSV text. Blocking; called once per session.
    pub fn fetch(&self) -> Result<String, LoadError> {
        tracing::info!(source = %self, "fetching salary CSV");

        match self {
            CsvSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| LoadError::fetch(self.to_string(), e))
            }
            CsvSource::Url(url) => {
                let response = reqwest::blocking::get(url)
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| LoadError::fetch(url.as_str(), e))?;

                response.text().map_err(|e| LoadError::fetch(url.as_str(), e))
            }
        }
    }

    /// Fetch and parse in one step.
    pub fn load(&self) -> Result<Vec<SalaryRecord>, LoadError> {
        let text = self.fetch()?;
        parse_records(&text)
    }
}

impl fmt::Display for CsvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvSource::File(path) => write!(f, "{}", path.display()),
            CsvSource::Url(url) => f.write_str(url),
        }
    }
}
