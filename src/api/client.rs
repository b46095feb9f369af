use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::{HttpConfig, IngestionConfig};
use crate::error::FetchError;

/// Cooperative cancellation handle shared between a caller and a running fetch
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One page request: dataset endpoint plus ordered query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

impl PageRequest {
    /// Build the query for one page
    ///
    /// `$skip` is omitted on the first page and `$filter` when no filter is set.
    pub fn new(config: &IngestionConfig, top: usize, skip: usize) -> Self {
        let mut query = vec![
            ("api_key", config.api_key.clone()),
            ("$format", "geojson".to_string()),
            ("$top", top.to_string()),
        ];
        if skip > 0 {
            query.push(("$skip", skip.to_string()));
        }
        if let Some(filter) = config.filter() {
            query.push(("$filter", filter.to_string()));
        }

        Self {
            url: config.endpoint(),
            query,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Source of raw page bodies
///
/// Implementations should give up with [`FetchError::Cancelled`] once the
/// flag is raised, including while a request is in flight where possible.
pub trait PageTransport {
    fn fetch_page(&self, request: &PageRequest, cancel: &CancelFlag) -> Result<Value, FetchError>;
}

/// Blocking HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageTransport for HttpTransport {
    fn fetch_page(&self, request: &PageRequest, cancel: &CancelFlag) -> Result<Value, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let response = self
            .client
            .get(&request.url)
            .query(&request.query)
            .send()?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::transport(status.as_u16(), body));
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Feature records of a response body
///
/// Accepts a FeatureCollection-like object or a bare array; anything else
/// has no features.
pub fn response_features(body: &Value) -> &[Value] {
    match body {
        Value::Array(features) => features,
        Value::Object(map) => map
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> IngestionConfig {
        IngestionConfig::new("parcels", "https://gis.example.org/api", "secret")
    }

    #[test]
    fn test_first_page_query() {
        let request = PageRequest::new(&config(), 1000, 0);

        assert_eq!(request.url, "https://gis.example.org/api/parcels");
        assert_eq!(
            request.query,
            vec![
                ("api_key", "secret".to_string()),
                ("$format", "geojson".to_string()),
                ("$top", "1000".to_string()),
            ]
        );
        assert_eq!(request.param("$skip"), None);
    }

    #[test]
    fn test_later_page_with_filter() {
        let config = config().with_filter(Some("JIBUN eq '12-3'"));
        let request = PageRequest::new(&config, 500, 1500);

        assert_eq!(request.param("$skip"), Some("1500"));
        assert_eq!(request.param("$top"), Some("500"));
        assert_eq!(request.param("$filter"), Some("JIBUN eq '12-3'"));
    }

    #[test]
    fn test_response_features_shapes() {
        let collection = json!({"type": "FeatureCollection", "features": [{}, {}]});
        let bare = json!([{}, {}, {}]);
        let other = json!({"message": "ok"});

        assert_eq!(response_features(&collection).len(), 2);
        assert_eq!(response_features(&bare).len(), 3);
        assert!(response_features(&other).is_empty());
        assert!(response_features(&json!("text")).is_empty());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_http_transport_respects_prior_cancellation() {
        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = transport.fetch_page(&PageRequest::new(&config(), 10, 0), &cancel);
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
