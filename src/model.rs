//! Domain models for the ban correlation view.
//!
//! Wire types mirror the backend's camelCase JSON. All timestamps are UTC.
//! Temporary jail bans ([`BanRecord`]) and permanent firewall rules
//! ([`FirewallRule`]) arrive from independent endpoints and are joined into
//! [`CorrelatedBan`]s by the correlation pass.

use crate::subtab::SubtabStateMachine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Identifier of a monitored host (agent), as issued by the backend.
pub type AgentId = String;

/// Remaining time at or below which a ban is classified CRITICAL.
pub const CRITICAL_WINDOW_SECS: i64 = 5 * 60;

/// Remaining time at or below which a ban is classified WARNING.
pub const WARNING_WINDOW_SECS: i64 = 15 * 60;

/// A temporary jail ban as reported by the intrusion-prevention backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    /// Banned address in canonical textual form.
    pub ip_address: String,
    /// Jail whose rules triggered the ban.
    pub jail_name: String,
    /// Failed attempts that led to the ban.
    #[serde(default)]
    pub failure_count: u32,
    /// Times this IP has been banned historically (at least 1).
    #[serde(default = "default_ban_count")]
    pub ban_count: u32,
    /// When the ban was applied.
    pub banned_at: DateTime<Utc>,
    /// Configured ban length in seconds; 0 means permanent.
    #[serde(default)]
    pub ban_duration_seconds: u64,
    /// Backend-computed remaining seconds. May be stale or absent.
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
    /// Backend-side expiry flag.
    #[serde(default)]
    pub is_expired: bool,
    /// Host the ban belongs to.
    pub agent_id: AgentId,
}

fn default_ban_count() -> u32 {
    1
}

impl BanRecord {
    /// Remaining seconds as used for sorting and classification.
    ///
    /// An absent value reads as 0, which sorts the record first. Permanent
    /// bans report no remaining time, so they surface at the top of the view.
    pub fn effective_remaining(&self) -> i64 {
        self.remaining_seconds.unwrap_or(0)
    }

    /// Whether this ban never decays (zero configured duration).
    pub fn is_permanent(&self) -> bool {
        self.ban_duration_seconds == 0
    }
}

/// Action of a firewall rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    /// Traffic from the address is dropped.
    Deny,
    /// Traffic from the address is allowed.
    Allow,
    /// Anything else the firewall reports (log, reject variants, ...).
    #[serde(other)]
    #[default]
    Other,
}

/// A firewall rule as reported by the backend.
///
/// Only DENY rules with a concrete (non-wildcard) address participate in
/// correlation; see [`crate::index::FirewallRuleIndex`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    /// Address or mask the rule applies to.
    pub ip_address: String,
    /// Rule action.
    #[serde(default)]
    pub action: RuleAction,
    /// Host the rule belongs to.
    pub agent_id: AgentId,
}

/// Three-tier classification of a ban's remaining time, used to prioritize
/// operator attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrgencyClass {
    /// Ban lapses within five minutes.
    Critical,
    /// Ban lapses within fifteen minutes.
    Warning,
    /// No time pressure (includes permanent bans).
    Safe,
}

impl UrgencyClass {
    /// Classify from remaining seconds.
    ///
    /// Permanent bans are always [`UrgencyClass::Safe`] regardless of the
    /// reported remaining time.
    pub fn from_remaining(remaining_secs: i64, permanent: bool) -> Self {
        if permanent {
            UrgencyClass::Safe
        } else if remaining_secs <= CRITICAL_WINDOW_SECS {
            UrgencyClass::Critical
        } else if remaining_secs <= WARNING_WINDOW_SECS {
            UrgencyClass::Warning
        } else {
            UrgencyClass::Safe
        }
    }

    /// Stable lowercase label for logging and styling.
    pub fn name(&self) -> &'static str {
        match self {
            UrgencyClass::Critical => "critical",
            UrgencyClass::Warning => "warning",
            UrgencyClass::Safe => "safe",
        }
    }
}

impl std::fmt::Display for UrgencyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A ban prepared for display: expiry-filtered, classified, labeled.
///
/// Produced by [`crate::projector::project`].
#[derive(Debug, Clone)]
pub struct ProjectedBan {
    /// The underlying ban.
    pub record: BanRecord,
    /// Remaining-time classification.
    pub urgency: UrgencyClass,
    /// Human-readable remaining time ("4m 30s", "permanent").
    pub remaining_label: String,
}

/// A projected ban joined with firewall membership.
///
/// Produced by [`crate::correlate::correlate`].
#[derive(Debug, Clone)]
pub struct CorrelatedBan {
    /// The underlying ban.
    pub record: BanRecord,
    /// Remaining-time classification.
    pub urgency: UrgencyClass,
    /// Human-readable remaining time.
    pub remaining_label: String,
    /// Whether a permanent firewall deny rule already covers this address.
    pub in_firewall: bool,
}

impl CorrelatedBan {
    /// Whether the escalate-to-firewall action should be offered.
    ///
    /// Never offered once the address is already covered by a deny rule.
    pub fn escalation_available(&self) -> bool {
        !self.in_firewall
    }
}

/// Aggregated per-IP ban history rollup (not a single raw log line).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// The address the rollup covers.
    pub ip_address: String,
    /// Jail most recently involved.
    pub jail_name: String,
    /// Total failed attempts observed.
    #[serde(default)]
    pub failure_count: u32,
    /// Times the address was banned in the window.
    #[serde(default)]
    pub ban_count: u32,
    /// Times the address was unbanned in the window.
    #[serde(default)]
    pub unban_count: u32,
    /// Host the events belong to.
    pub agent_id: AgentId,
    /// Display name of that host.
    #[serde(default)]
    pub agent_hostname: String,
    /// When the rollup was reported.
    pub reported_at: DateTime<Utc>,
}

/// One page of history events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Events on this page.
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    /// 1-based page number.
    #[serde(default)]
    pub page: u32,
    /// Total page count.
    #[serde(default)]
    pub pages: u32,
    /// Total events across all pages.
    #[serde(default)]
    pub total: u64,
}

/// Summary counters for the active view header.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanStats {
    /// Currently active bans.
    #[serde(default)]
    pub active_bans: u64,
    /// Bans ever recorded.
    #[serde(default)]
    pub total_bans: u64,
    /// Addresses banned more than once.
    #[serde(default)]
    pub repeat_offenders: u64,
    /// Bans escalated to permanent firewall rules.
    #[serde(default)]
    pub escalated_count: u64,
}

/// Preset windows for the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryTimeRange {
    /// Past hour.
    LastHour,
    /// Past 24 hours.
    #[default]
    LastDay,
    /// Past 7 days.
    LastWeek,
    /// Past 30 days.
    LastMonth,
}

impl HistoryTimeRange {
    /// Query token understood by the backend.
    pub fn as_query(&self) -> &'static str {
        match self {
            HistoryTimeRange::LastHour => "1h",
            HistoryTimeRange::LastDay => "24h",
            HistoryTimeRange::LastWeek => "7d",
            HistoryTimeRange::LastMonth => "30d",
        }
    }
}

/// Per-session view context: which host is selected, which subtab is open,
/// and which history window applies.
///
/// Created when the page is entered, mutated only through the console facade,
/// discarded on navigation away. There is deliberately no hidden module
/// state; everything a reload needs is snapshotted from here.
#[derive(Debug)]
pub struct ViewContext {
    /// Selected host, if any.
    pub agent_id: Option<AgentId>,
    /// Subtab selection state machine.
    pub subtabs: SubtabStateMachine,
    /// Window for the history subtab.
    pub time_range: HistoryTimeRange,
    /// 1-based page requested on the history subtab.
    pub history_page: u32,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self {
            agent_id: None,
            subtabs: SubtabStateMachine::default(),
            time_range: HistoryTimeRange::default(),
            history_page: 1,
        }
    }
}
