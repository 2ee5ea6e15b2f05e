use std::time::Duration;

use kube::config::AuthInfo;
use kube::{Client, Config};
use secrecy::SecretString;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::models::ClusterConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An opaque per-cluster client handle. Holding one never implies the
/// cluster is reachable — only that a client was successfully constructed
/// from the stored credentials.
#[derive(Clone)]
pub struct KubernetesClientHandle {
    pub client: Client,
}

/// Builds `KubernetesClientHandle`s strictly from `ClusterConfig` fields.
/// Any ambient "pick up kubeconfig from the environment" behavior is
/// deliberately never invoked — `Config` is hand-assembled so the only
/// inputs are `apiServerUrl`, `bearerToken`, and `caCertData`.
pub struct ClientFactory;

impl ClientFactory {
    pub fn build(cluster_config: &ClusterConfig) -> Result<KubernetesClientHandle> {
        let uri = cluster_config
            .api_server_url
            .parse()
            .map_err(|e| CoreError::ConnectionFailed(format!("invalid apiServerUrl: {}", e)))?;

        let mut config = Config::new(uri);
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(REQUEST_TIMEOUT);
        config.auth_info = AuthInfo {
            token: Some(SecretString::from(cluster_config.bearer_token.clone())),
            ..Default::default()
        };

        match &cluster_config.ca_cert_data {
            Some(ca) => {
                use base64::Engine;
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(ca)
                    .map_err(|e| CoreError::ConnectionFailed(format!("invalid caCertData: {}", e)))?;
                config.root_cert = Some(vec![decoded]);
                config.accept_invalid_certs = false;
            }
            None => {
                debug!(cluster_id = %cluster_config.id, "no caCertData supplied, trusting all certs");
                config.accept_invalid_certs = true;
            }
        }

        let client = Client::try_from(config)
            .map_err(|e| CoreError::ConnectionFailed(format!("failed to build client: {}", e)))?;

        Ok(KubernetesClientHandle { client })
    }
}
