use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted, immutable-after-registration cluster credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub api_server_url: String,
    pub bearer_token: String,
    pub ca_cert_data: Option<String>,
}

impl ClusterConfig {
    /// Validates the draft before registration. `apiServerUrl`/`bearerToken`
    /// non-empty; assigns a fresh id.
    pub fn new_draft(
        name: impl Into<String>,
        description: impl Into<String>,
        api_server_url: impl Into<String>,
        bearer_token: impl Into<String>,
        ca_cert_data: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            api_server_url: api_server_url.into(),
            bearer_token: bearer_token.into(),
            ca_cert_data,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_server_url.trim().is_empty() {
            return Err("apiServerUrl must not be empty".to_string());
        }
        url::Url::parse(&self.api_server_url)
            .map_err(|e| format!("apiServerUrl is not a valid URL: {}", e))?;
        if self.bearer_token.trim().is_empty() {
            return Err("bearerToken must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Connected,
    Error,
    Unknown,
}

/// Persisted, mutable runtime snapshot of a registered cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub api_server_url: String,
    pub version: String,
    pub status: ClusterStatus,
    pub created_at: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
    pub node_count: u32,
    pub namespace_count: u32,
    pub pod_count: u32,
}

impl ClusterInfo {
    pub fn unknown(config: &ClusterConfig) -> Self {
        let now = Utc::now();
        Self {
            id: config.id,
            name: config.name.clone(),
            description: config.description.clone(),
            api_server_url: config.api_server_url.clone(),
            version: String::new(),
            status: ClusterStatus::Unknown,
            created_at: now,
            last_checked: now,
            node_count: 0,
            namespace_count: 0,
            pod_count: 0,
        }
    }
}

/// Raw inventory numbers gathered by a liveness probe, before being folded
/// into a `ClusterInfo`.
#[derive(Clone, Debug, Default)]
pub struct ClusterInventory {
    pub version: String,
    pub node_count: u32,
    pub namespace_count: u32,
    pub pod_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(api_server_url: &str, bearer_token: &str) -> ClusterConfig {
        ClusterConfig::new_draft("prod", "production cluster", api_server_url, bearer_token, None)
    }

    #[test]
    fn validate_rejects_empty_api_server_url() {
        assert!(draft("", "token").validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_api_server_url() {
        assert!(draft("not a url", "token").validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_bearer_token() {
        assert!(draft("https://10.0.0.1:6443", "").validate().is_err());
    }

    #[test]
    fn validate_accepts_a_well_formed_config() {
        assert!(draft("https://10.0.0.1:6443", "sa-token").validate().is_ok());
    }
}
