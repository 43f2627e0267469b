// Availability zone lookup through the instance metadata service (IMDSv2)

use reqwest::Client;
use tracing::debug;

use crate::config::DiscoveryConfig;
use crate::models::Placement;
use shared::{Result, ServiceError};

const TOKEN_PATH: &str = "/latest/api/token";
const ZONE_PATH: &str = "/latest/meta-data/placement/availability-zone";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const TOKEN_TTL_SECONDS: &str = "60";

#[derive(Debug, Clone)]
pub struct ZoneDiscovery {
    endpoint: String,
    http_client: Client,
}

impl ZoneDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::Discovery(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Fetch a session token, then the zone this instance runs in.
    pub async fn placement(&self) -> Result<Placement> {
        let token = self
            .http_client
            .put(format!("{}{}", self.endpoint, TOKEN_PATH))
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ServiceError::Discovery(format!("token request failed: {}", e)))?
            .text()
            .await
            .map_err(|e| ServiceError::Discovery(format!("token read failed: {}", e)))?;

        let zone = self
            .http_client
            .get(format!("{}{}", self.endpoint, ZONE_PATH))
            .header(TOKEN_HEADER, token.trim())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ServiceError::Discovery(format!("zone request failed: {}", e)))?
            .text()
            .await
            .map_err(|e| ServiceError::Discovery(format!("zone read failed: {}", e)))?;

        let zone = zone.trim();
        if zone.is_empty() {
            return Err(ServiceError::Discovery("empty availability zone".to_string()));
        }

        debug!("Discovered availability zone {}", zone);
        Ok(Placement::from_zone(zone))
    }
}
