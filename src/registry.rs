use crate::bearer_token::BearerToken;
use crate::config::RegistryConfig;
use crate::image_reference::ImageReference;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Certificate, Client, Request};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use tracing::{debug, info};

static MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to create request: {0}")]
    RequestConstruction(#[source] reqwest::Error),
    #[error("request for {document} failed: {source}")]
    Transport {
        document: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse {document} json {body}: {source}")]
    Decode {
        document: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Registry(String),
}

/// Looks up the digest an image tag currently points to.
pub trait DigestResolver {
    async fn resolve_digest(&self, reference: &ImageReference) -> Result<String, RegistryError>;
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: BearerToken,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct ManifestResponse {
    #[serde(default)]
    config: ManifestConfig,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestConfig {
    #[serde(default)]
    digest: String,
}

pub fn create_client(config: &RegistryConfig) -> Result<Client> {
    info!("Initializing registry HTTP client");
    // System certificates are loaded automatically with rustls-tls-native-roots
    let mut client_builder =
        Client::builder().user_agent(concat!("dockerchk/", env!("CARGO_PKG_VERSION")));

    for file_path in &config.ca_certificate_paths {
        let file_content = fs::read(file_path)
            .with_context(|| format!("Failed to read file {}", file_path.display()))?;
        let cert = Certificate::from_pem(&file_content).context("Failed to parse certificate")?;
        client_builder = client_builder.add_root_certificate(cert);
    }

    client_builder.build().context("Failed to build HTTP client")
}

pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(client: Client, config: RegistryConfig) -> Self {
        Self { client, config }
    }

    pub async fn fetch_bearer_token(&self, repository: &str) -> Result<BearerToken, RegistryError> {
        let scope = format!("repository:{}:pull", repository);
        let request = self
            .client
            .get(&self.config.auth_url)
            .query(&[("scope", scope.as_str()), ("service", self.config.service.as_str())])
            .build()
            .map_err(RegistryError::RequestConstruction)?;

        debug!("Requesting bearer token with scope {}", scope);
        let body = self.send(request, "bearer token").await?;
        let response: TokenResponse = decode("token", &body)?;
        check_errors(response.errors)?;

        Ok(response.token)
    }

    /// Returns the raw manifest body. The status code is not inspected, only the json
    /// payload decides whether the registry accepted the request.
    pub async fn fetch_manifest(
        &self,
        reference: &ImageReference,
        token: &BearerToken,
    ) -> Result<String, RegistryError> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.config.registry_url,
            reference.repository,
            urlencoding::encode(&reference.tag)
        );
        let request = self
            .client
            .get(&url)
            .header(ACCEPT, MANIFEST_V2_MEDIA_TYPE)
            .header(AUTHORIZATION, token.authorization_header())
            .build()
            .map_err(RegistryError::RequestConstruction)?;

        debug!("Fetching docker manifest from URL {}", url);
        self.send(request, "manifest").await
    }

    async fn send(&self, request: Request, document: &'static str) -> Result<String, RegistryError> {
        let transport_error = |source| RegistryError::Transport { document, source };
        let response = self
            .client
            .execute(request)
            .await
            .map_err(transport_error)?;

        response.text().await.map_err(transport_error)
    }
}

impl DigestResolver for RegistryClient {
    async fn resolve_digest(&self, reference: &ImageReference) -> Result<String, RegistryError> {
        let token = self.fetch_bearer_token(&reference.repository).await?;
        let manifest = self.fetch_manifest(reference, &token).await?;
        let response: ManifestResponse = decode("manifest", &manifest)?;
        check_errors(response.errors)?;

        debug!(
            "Registry reports digest {} for {}",
            response.config.digest, reference
        );
        Ok(response.config.digest)
    }
}

fn decode<T: DeserializeOwned>(document: &'static str, body: &str) -> Result<T, RegistryError> {
    serde_json::from_str(body).map_err(|source| RegistryError::Decode {
        document,
        body: body.to_string(),
        source,
    })
}

fn check_errors(errors: Option<Vec<ApiError>>) -> Result<(), RegistryError> {
    match errors {
        Some(errors) if !errors.is_empty() => Err(RegistryError::Registry(
            errors
                .iter()
                .map(|e| e.code.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )),
        _ => Ok(()),
    }
}
