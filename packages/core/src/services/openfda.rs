//! OpenFDA drug-label lookup client.
//!
//! Queries the drug label endpoint by brand name and flattens the first
//! matching label into a [`DrugInfo`] record. Every failure mode (network,
//! non-2xx status, malformed body, empty result set) comes back as
//! [`ApiError::Upstream`] so the HTTP layer can map it to a structured 502
//! payload instead of a server fault.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Flattened drug-label record returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugInfo {
    pub name: String,
    pub manufacturer: String,
    pub warnings: Vec<String>,
    pub purpose: Vec<String>,
}

/// Lookup seam so handlers and tests can swap the real client for a stub.
#[async_trait]
pub trait DrugInfoProvider {
    async fn get_drug_info(&self, name: &str) -> Result<DrugInfo, ApiError>;
}

#[derive(Clone)]
pub struct OpenFdaClient {
    base_url: String,
    http: Client,
}

impl OpenFdaClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ---- OpenFDA response shapes (only the fields we read) ----

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<LabelResult>,
}

#[derive(Debug, Deserialize)]
struct LabelResult {
    #[serde(default)]
    openfda: OpenFdaFields,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    purpose: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenFdaFields {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    manufacturer_name: Vec<String>,
}

#[async_trait]
impl DrugInfoProvider for OpenFdaClient {
    async fn get_drug_info(&self, name: &str) -> Result<DrugInfo, ApiError> {
        let url = format!("{}/drug/label.json", self.base_url);
        let search = format!("openfda.brand_name:\"{}\"", name);

        let response = self
            .http
            .get(&url)
            .query(&[("search", search.as_str()), ("limit", "1")])
            .send()
            .await
            .map_err(|err| ApiError::upstream(format!("OpenFDA request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(ApiError::upstream(format!(
                "OpenFDA API error: {}",
                response.status().as_u16()
            )));
        }

        let body = response
            .json::<LabelResponse>()
            .await
            .map_err(|err| ApiError::upstream(format!("OpenFDA response malformed: {}", err)))?;

        let label = body.results.into_iter().next().ok_or_else(|| {
            ApiError::upstream(format!("no drug label found for '{}'", name))
        })?;

        let resolved_name = label
            .openfda
            .brand_name
            .into_iter()
            .next()
            .unwrap_or_else(|| name.to_string());
        let manufacturer = label
            .openfda
            .manufacturer_name
            .into_iter()
            .next()
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(DrugInfo {
            name: resolved_name,
            manufacturer,
            warnings: label.warnings,
            purpose: label.purpose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LABEL_JSON: &str = r#"{
        "results": [{
            "openfda": {
                "brand_name": ["Aspirin"],
                "manufacturer_name": ["Bayer"]
            },
            "warnings": ["Keep out of reach of children"],
            "purpose": ["Pain reliever"]
        }]
    }"#;

    async fn client_for(server: &MockServer) -> OpenFdaClient {
        OpenFdaClient::new(server.uri())
    }

    #[tokio::test]
    async fn parses_first_label_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(LABEL_JSON, "application/json"))
            .mount(&server)
            .await;

        let info = client_for(&server)
            .await
            .get_drug_info("Aspirin")
            .await
            .unwrap();

        assert_eq!(info.name, "Aspirin");
        assert_eq!(info.manufacturer, "Bayer");
        assert_eq!(info.warnings, vec!["Keep out of reach of children"]);
        assert_eq!(info.purpose, vec!["Pain reliever"]);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_drug_info("NoSuchDrug")
            .await
            .unwrap_err();

        match err {
            ApiError::Upstream(msg) => assert!(msg.contains("404"), "got: {}", msg),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_result_set_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"results": []}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_drug_info("Mystery")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "text/plain"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_drug_info("Aspirin")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
