use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Largest `$top` the API accepts
pub const MAX_PAGE_SIZE: usize = 1000;

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`
pub fn clamp_page_size(page_size: usize) -> usize {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Trim a nullable string option; blank values mean "not set"
fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Raw configuration as supplied by a host application
///
/// Field names follow the host's camelCase convention. Unset or blank
/// `filter` / `targetGlobalId` mean "no filter" / "no target".
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigureOptions {
    pub dataset_id: String,
    pub base_url: String,
    pub api_key: String,
    pub filter: Option<String>,
    pub target_global_id: Option<String>,
    /// Clear the cached local grid origin when applied
    pub reset_origin: bool,
}

/// Effective, normalized data source configuration
///
/// Built whole from [`ConfigureOptions`]; never patched field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionConfig {
    pub dataset_id: String,
    pub base_url: String,
    pub api_key: String,
    filter: Option<String>,
    target_global_id: Option<String>,
}

impl IngestionConfig {
    pub fn new(
        dataset_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into().trim().to_string(),
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            filter: None,
            target_global_id: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<&str>) -> Self {
        self.filter = normalize_optional(filter);
        self
    }

    pub fn with_target_global_id(mut self, target: Option<&str>) -> Self {
        self.target_global_id = normalize_optional(target);
        self
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn target_global_id(&self) -> Option<&str> {
        self.target_global_id.as_deref()
    }

    /// Dataset endpoint: `{base_url}/{dataset_id}`
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.dataset_id)
    }
}

impl From<&ConfigureOptions> for IngestionConfig {
    fn from(options: &ConfigureOptions) -> Self {
        IngestionConfig::new(&options.dataset_id, &options.base_url, &options.api_key)
            .with_filter(options.filter.as_deref())
            .with_target_global_id(options.target_global_id.as_deref())
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("parcelgrid/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Settings handed to the HTTP transport
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_output() -> PathBuf {
    PathBuf::from("parcels.geojson")
}

/// Settings read from `parcelgrid.toml`
#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub target_global_id: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub max_features: Option<usize>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            dataset_id: None,
            base_url: None,
            api_key: None,
            filter: None,
            target_global_id: None,
            page_size: default_page_size(),
            max_features: None,
            output: default_output(),
            http: HttpConfig::default(),
        }
    }
}

impl FileConfig {
    /// Read an explicit config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// First parseable config file from the standard search locations
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::from_path(&path) {
                Ok(config) => return Some(config),
                Err(e) => warn!(path = %path.display(), "Skipping config file: {:#}", e),
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("parcelgrid.toml"),
        PathBuf::from(".parcelgrid.toml"),
    ];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("parcelgrid").join("config.toml"));
        paths.push(config_dir.join("parcelgrid.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".parcelgrid.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_blank_optionals_normalize_to_none() {
        let options = ConfigureOptions {
            dataset_id: " parcels ".to_string(),
            base_url: "https://gis.example.org/api/".to_string(),
            api_key: "k".to_string(),
            filter: Some("   ".to_string()),
            target_global_id: Some(String::new()),
            reset_origin: false,
        };
        let config = IngestionConfig::from(&options);

        assert_eq!(config.filter(), None);
        assert_eq!(config.target_global_id(), None);
        assert_eq!(config.endpoint(), "https://gis.example.org/api/parcels");
    }

    #[test]
    fn test_configure_options_from_host_json() {
        let json = r#"{
            "datasetId": "cadastre",
            "baseUrl": "https://gis.example.org/api",
            "apiKey": "secret",
            "filter": "PNU eq '1111010100'",
            "targetGlobalId": "{ABC}",
            "resetOrigin": true
        }"#;
        let options: ConfigureOptions = serde_json::from_str(json).unwrap();
        assert!(options.reset_origin);

        let config = IngestionConfig::from(&options);
        assert_eq!(config.filter(), Some("PNU eq '1111010100'"));
        assert_eq!(config.target_global_id(), Some("{ABC}"));
    }

    #[test]
    fn test_configure_options_defaults() {
        let options: ConfigureOptions = serde_json::from_str(r#"{"datasetId": "d"}"#).unwrap();
        assert_eq!(options.api_key, "");
        assert_eq!(options.filter, None);
        assert!(!options.reset_origin);
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(250), 250);
        assert_eq!(clamp_page_size(50_000), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_file_config_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
dataset_id = "cadastre"
api_key = "secret"
page_size = 500

[http]
timeout_secs = 5
"#
        )
        .unwrap();

        let config = FileConfig::from_path(file.path()).unwrap();
        assert_eq!(config.dataset_id.as_deref(), Some("cadastre"));
        assert_eq!(config.page_size, 500);
        assert_eq!(config.max_features, None);
        assert_eq!(config.output, PathBuf::from("parcels.geojson"));
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.http.user_agent.starts_with("parcelgrid/"));
    }

    #[test]
    fn test_file_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = \"many\"").unwrap();
        assert!(FileConfig::from_path(file.path()).is_err());
    }
}
