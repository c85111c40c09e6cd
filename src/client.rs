//! Backend data-source clients.
//!
//! [`BanBackend`] is the trait seam between the core and the dashboard
//! backend: four read-only fetchers plus the two commands. The core only
//! ever talks to this trait, so tests script an in-memory implementation and
//! the production build wires up [`HttpBanBackend`].

use crate::error::{ActionError, FetchError};
use crate::model::{BanRecord, BanStats, FirewallRule, HistoryPage, HistoryTimeRange};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

/// Maximum response-body length carried inside a status error.
const STATUS_BODY_LIMIT: usize = 200;

/// Abstract backend contract.
///
/// All reads are independent queries and may be issued concurrently within
/// one refresh cycle. The backend owns the wire format; implementations
/// translate it into the crate's models.
#[async_trait]
pub trait BanBackend: Send + Sync {
    /// Fetch currently active jail bans for one host.
    async fn live_bans(&self, agent_id: &str) -> Result<Vec<BanRecord>, FetchError>;

    /// Fetch current firewall rules for one host.
    async fn firewall_rules(&self, agent_id: &str) -> Result<Vec<FirewallRule>, FetchError>;

    /// Fetch summary counters, optionally scoped to one host.
    async fn ban_stats(&self, agent_id: Option<&str>) -> Result<BanStats, FetchError>;

    /// Fetch one page of aggregated history events.
    async fn history_events(
        &self,
        agent_id: Option<&str>,
        range: HistoryTimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, FetchError>;

    /// Lift a jail ban. The backend is the source of truth for whether the
    /// ban still exists.
    async fn unban(&self, agent_id: &str, ip_address: &str, jail_name: &str)
    -> Result<(), ActionError>;

    /// Convert a temporary ban into a permanent firewall deny rule.
    ///
    /// Duplicate suppression is the backend's job; callers must simply not
    /// re-offer the action for addresses already covered.
    async fn escalate_to_firewall(
        &self,
        agent_id: &str,
        ip_address: &str,
    ) -> Result<(), ActionError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// REST client against the dashboard backend.
pub struct HttpBanBackend {
    base_url: String,
    client: reqwest::Client,
}

/// `{"bans": [...]}` envelope.
#[derive(Debug, Deserialize)]
struct LiveBansResponse {
    #[serde(default)]
    bans: Vec<BanRecord>,
}

/// `{"rules": [...]}` envelope.
#[derive(Debug, Deserialize)]
struct FirewallRulesResponse {
    #[serde(default)]
    rules: Vec<FirewallRule>,
}

/// `{"success": bool, "error": "..."}` command result.
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnbanRequest<'a> {
    agent_id: &'a str,
    ip_address: &'a str,
    jail_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EscalateRequest<'a> {
    agent_id: &'a str,
    ip_address: &'a str,
}

impl HttpBanBackend {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("banwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "backend GET");
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_command<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ActionError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "backend POST");
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(FetchError::from)?;
        let status = resp.status();
        let text = resp.text().await.map_err(FetchError::from)?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            }
            .into());
        }
        let outcome: CommandResponse = serde_json::from_str(&text).map_err(FetchError::from)?;
        if outcome.success {
            Ok(())
        } else {
            Err(ActionError::Rejected(
                outcome.error.unwrap_or_else(|| "unspecified reason".to_string()),
            ))
        }
    }
}

#[async_trait]
impl BanBackend for HttpBanBackend {
    async fn live_bans(&self, agent_id: &str) -> Result<Vec<BanRecord>, FetchError> {
        let resp: LiveBansResponse = self
            .get_json("/api/fail2ban/bans", &[("agentId", agent_id.to_string())])
            .await?;
        Ok(resp.bans)
    }

    async fn firewall_rules(&self, agent_id: &str) -> Result<Vec<FirewallRule>, FetchError> {
        let resp: FirewallRulesResponse = self
            .get_json("/api/firewall/rules", &[("agentId", agent_id.to_string())])
            .await?;
        Ok(resp.rules)
    }

    async fn ban_stats(&self, agent_id: Option<&str>) -> Result<BanStats, FetchError> {
        let mut query = Vec::new();
        if let Some(agent) = agent_id {
            query.push(("agentId", agent.to_string()));
        }
        self.get_json("/api/fail2ban/stats", &query).await
    }

    async fn history_events(
        &self,
        agent_id: Option<&str>,
        range: HistoryTimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, FetchError> {
        let mut query = vec![
            ("timeRange", range.as_query().to_string()),
            ("page", page.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(agent) = agent_id {
            query.push(("agentId", agent.to_string()));
        }
        self.get_json("/api/fail2ban/history", &query).await
    }

    async fn unban(
        &self,
        agent_id: &str,
        ip_address: &str,
        jail_name: &str,
    ) -> Result<(), ActionError> {
        self.post_command(
            "/api/fail2ban/unban",
            &UnbanRequest {
                agent_id,
                ip_address,
                jail_name,
            },
        )
        .await
    }

    async fn escalate_to_firewall(
        &self,
        agent_id: &str,
        ip_address: &str,
    ) -> Result<(), ActionError> {
        self.post_command(
            "/api/firewall/escalate",
            &EscalateRequest {
                agent_id,
                ip_address,
            },
        )
        .await
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= STATUS_BODY_LIMIT {
        body.to_string()
    } else {
        let mut end = STATUS_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body[..end].to_string()
    }
}
