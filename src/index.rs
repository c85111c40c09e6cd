//! In-memory index of permanently blocked addresses.
//!
//! Caches the firewall's DENY rules for the selected host so correlation can
//! answer "is this ban already escalated?" without a backend round trip per
//! record.
//!
//! The index is rebuilt wholesale on each refresh, never patched in place:
//! firewall rule sets are small and polled infrequently, and wholesale
//! rebuilds cannot leave a half-applied update behind.

use crate::client::BanBackend;
use crate::model::{AgentId, FirewallRule, RuleAction};
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Set of concretely denied IP addresses, scoped to one host.
///
/// Only DENY rules whose address parses as a single IP populate the index;
/// CIDR masks and wildcard entries are skipped so they can never suppress
/// the escalate action for an individual ban.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallRuleIndex {
    agent_id: AgentId,
    blocked: HashSet<IpAddr>,
}

impl FirewallRuleIndex {
    /// An empty index for the given host.
    ///
    /// The safe fallback when the rules fetch fails: with an empty index no
    /// ban is wrongly presented as already escalated.
    pub fn empty(agent_id: impl Into<AgentId>) -> Self {
        Self {
            agent_id: agent_id.into(),
            blocked: HashSet::new(),
        }
    }

    /// Build the index from a fetched rule list.
    ///
    /// Rules belonging to a different host are ignored.
    pub fn from_rules(agent_id: impl Into<AgentId>, rules: &[FirewallRule]) -> Self {
        let agent_id = agent_id.into();
        let blocked: HashSet<IpAddr> = rules
            .iter()
            .filter(|r| r.agent_id == agent_id && r.action == RuleAction::Deny)
            .filter_map(|r| r.ip_address.parse().ok())
            .collect();
        debug!(agent = %agent_id, count = blocked.len(), "firewall rule index built");
        Self { agent_id, blocked }
    }

    /// Fetch the current rules and rebuild.
    ///
    /// Never fails: any fetch error degrades to an empty index, leaving
    /// every ban escalatable rather than poisoning the whole refresh cycle.
    pub async fn rebuild(backend: &dyn BanBackend, agent_id: &str) -> Self {
        match backend.firewall_rules(agent_id).await {
            Ok(rules) => Self::from_rules(agent_id, &rules),
            Err(e) => {
                warn!(agent = %agent_id, error = %e, code = e.error_code(), "firewall rules fetch failed, using empty index");
                Self::empty(agent_id)
            }
        }
    }

    /// Whether a permanent deny rule covers the given address.
    ///
    /// Unparseable input is simply not a member.
    pub fn membership(&self, ip_address: &str) -> bool {
        ip_address
            .parse::<IpAddr>()
            .map(|ip| self.blocked.contains(&ip))
            .unwrap_or(false)
    }

    /// Host the index was built for.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Number of indexed addresses.
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    /// Whether the index holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}
