//! banwatch - ban correlation and escalation core.
//!
//! The presentation-agnostic heart of a host-intrusion-monitoring
//! dashboard's fail2ban/firewall view. It reconciles two independently
//! polled data sources - temporary jail bans and permanent firewall deny
//! rules - into one coherent view, debounces reload triggers, makes stale
//! in-flight responses inert when the operator switches hosts mid-fetch,
//! and drives the idempotent escalate-to-firewall workflow.
//!
//! The rendering layer binds to [`BanConsole`]; everything behind it is
//! plain functions and small state machines, unit-testable without a UI.
//!
//! ```no_run
//! use banwatch::{BanConsole, ConsoleConfig, Subtab};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ConsoleConfig::default();
//! let console = BanConsole::new(&config)?;
//! console.on_host_context_changed(Some("agent-1".to_string()));
//! console.on_subtab_selected(Subtab::Active);
//! let _view = console.current_view();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod console;
mod correlate;
mod error;
mod escalate;
mod index;
mod model;
mod projector;
mod refresh;
mod subtab;

pub use client::{BanBackend, HttpBanBackend};
pub use config::{BackendConfig, ConsoleConfig, HistoryConfig, RefreshConfig, ValidationError};
pub use console::BanConsole;
pub use correlate::correlate;
pub use error::{ActionError, FetchError};
pub use escalate::{EscalationOutcome, EscalationWorkflow};
pub use index::FirewallRuleIndex;
pub use model::{
    AgentId, BanRecord, BanStats, CorrelatedBan, FirewallRule, HistoryEvent, HistoryPage,
    HistoryTimeRange, ProjectedBan, RuleAction, UrgencyClass, ViewContext,
    CRITICAL_WINDOW_SECS, WARNING_WINDOW_SECS,
};
pub use projector::project;
pub use refresh::{RefreshCoordinator, ReloadReason, ViewState};
pub use subtab::{Subtab, SubtabStateMachine, SubtabTransition};
