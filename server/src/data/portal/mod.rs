//! Portal identity service client
//!
//! The portal backend is the authority on which applications exist and who
//! owns them. The meter consults it through the `AppDirectory` trait; this
//! client is the production implementation over the backend HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::PortalConfig;
use crate::core::constants::PORTAL_HTTP_TIMEOUT_SECS;
use crate::data::error::DataError;
use crate::data::traits::AppDirectory;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

/// Portal application record as returned by the backend API.
///
/// Only the identifier is consumed here; the backend returns more fields.
#[derive(Debug, Deserialize)]
struct PortalApp {
    id: String,
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PORTAL_HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, PortalError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(response)
    }

    async fn get_apps(&self, path: &str) -> Result<Vec<String>, PortalError> {
        let response = self.get(path).await?;
        if !response.status().is_success() {
            return Err(PortalError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            });
        }
        let apps: Vec<PortalApp> = response.json().await?;
        Ok(apps.into_iter().map(|app| app.id).collect())
    }
}

#[async_trait]
impl AppDirectory for PortalClient {
    async fn portal_app_exists(&self, app_id: &str) -> Result<bool, DataError> {
        let response = self
            .get(&format!("v1/portal_apps/{app_id}"))
            .await
            .map_err(DataError::from)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(PortalError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            }
            .into()),
        }
    }

    async fn portal_app_ids(&self) -> Result<Vec<String>, DataError> {
        Ok(self.get_apps("v1/portal_apps").await?)
    }

    async fn user_portal_app_ids(&self, user_id: &str) -> Result<Vec<String>, DataError> {
        Ok(self
            .get_apps(&format!("v1/users/{user_id}/portal_apps"))
            .await?)
    }
}
