//! Shell-facing console facade.
//!
//! The one object the surrounding dashboard binds to: context mutators
//! (`on_host_context_changed`, `on_subtab_selected`, ...), the command
//! surface (`escalate`, `unban`) and the read side (`current_view`). Owns
//! the session's [`ViewContext`]; there is no module-global state, so two
//! consoles can coexist in one process.
//!
//! Context mutators bump the shared epoch under the context write lock,
//! which atomically invalidates in-flight reloads, then schedule a fresh
//! reload through the coordinator's debounce.

use crate::client::{BanBackend, HttpBanBackend};
use crate::config::ConsoleConfig;
use crate::error::ActionError;
use crate::escalate::{EscalationOutcome, EscalationWorkflow};
use crate::model::{AgentId, HistoryTimeRange};
use crate::refresh::{RefreshCoordinator, ReloadReason, SharedView, ViewState};
use crate::subtab::{Subtab, SubtabTransition};
use std::sync::Arc;
use tracing::{debug, info};

/// The fail2ban/firewall view core, wired and ready for a rendering layer.
pub struct BanConsole {
    backend: Arc<dyn BanBackend>,
    shared: Arc<SharedView>,
    coordinator: Arc<RefreshCoordinator>,
    escalation: EscalationWorkflow,
}

impl BanConsole {
    /// Build a console talking HTTP to the configured backend.
    pub fn new(config: &ConsoleConfig) -> anyhow::Result<Self> {
        if let Err(errors) = config.validate() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("invalid configuration: {joined}");
        }
        let backend: Arc<dyn BanBackend> = Arc::new(HttpBanBackend::new(
            config.backend.base_url.clone(),
            config.request_timeout(),
        ));
        Ok(Self::with_backend(config, backend))
    }

    /// Build a console over an arbitrary backend implementation.
    pub fn with_backend(config: &ConsoleConfig, backend: Arc<dyn BanBackend>) -> Self {
        let shared = Arc::new(SharedView::default());
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&shared),
            config.debounce(),
            config.history.page_size,
        ));
        let escalation = EscalationWorkflow::new(
            Arc::clone(&backend),
            Arc::clone(&shared),
            Arc::clone(&coordinator),
        );
        info!(debounce_ms = config.refresh.debounce_ms, "ban console ready");
        Self {
            backend,
            shared,
            coordinator,
            escalation,
        }
    }

    /// The dashboard selected a different monitored host (or none).
    ///
    /// Selecting the already-selected host is a no-op.
    pub fn on_host_context_changed(&self, agent_id: Option<AgentId>) {
        {
            let mut ctx = self.shared.ctx.write();
            if ctx.agent_id == agent_id {
                return;
            }
            ctx.agent_id = agent_id.clone();
            ctx.history_page = 1;
            self.shared.bump_epoch();
        }
        info!(
            agent = agent_id.as_deref().unwrap_or("none"),
            "host context changed"
        );
        self.coordinator.request_reload(ReloadReason::HostChanged);
    }

    /// The user switched subtabs. Re-selecting the current one never fetches.
    pub fn on_subtab_selected(&self, subtab: Subtab) {
        let entered = {
            let mut ctx = self.shared.ctx.write();
            match ctx.subtabs.switch_to(subtab) {
                SubtabTransition::AlreadyCurrent => false,
                SubtabTransition::Entered(_) => {
                    self.shared.bump_epoch();
                    true
                }
            }
        };
        if entered {
            debug!(subtab = subtab.name(), "subtab entered");
            self.coordinator.request_reload(ReloadReason::SubtabChanged);
        }
    }

    /// Change the history window. Reloads only when the history subtab is
    /// showing; the active view does not depend on the window.
    pub fn set_history_time_range(&self, range: HistoryTimeRange) {
        let reload = {
            let mut ctx = self.shared.ctx.write();
            if ctx.time_range == range {
                return;
            }
            ctx.time_range = range;
            ctx.history_page = 1;
            if ctx.subtabs.current() == Subtab::History {
                self.shared.bump_epoch();
                true
            } else {
                false
            }
        };
        if reload {
            self.coordinator
                .request_reload(ReloadReason::TimeRangeChanged);
        }
    }

    /// Request a different history page (1-based).
    pub fn on_history_page_selected(&self, page: u32) {
        let page = page.max(1);
        let reload = {
            let mut ctx = self.shared.ctx.write();
            if ctx.history_page == page {
                return;
            }
            ctx.history_page = page;
            if ctx.subtabs.current() == Subtab::History {
                self.shared.bump_epoch();
                true
            } else {
                false
            }
        };
        if reload {
            self.coordinator.request_reload(ReloadReason::PageChanged);
        }
    }

    /// The user hit refresh.
    pub fn trigger_manual_refresh(&self) {
        self.coordinator.request_reload(ReloadReason::Manual);
    }

    /// What the rendering layer should paint right now.
    pub fn current_view(&self) -> ViewState {
        self.shared.view.read().clone()
    }

    /// Currently selected host, if any.
    pub fn selected_agent(&self) -> Option<AgentId> {
        self.shared.ctx.read().agent_id.clone()
    }

    /// Escalate a banned address on the selected host to a permanent block.
    pub async fn escalate(&self, ip_address: &str) -> Result<EscalationOutcome, ActionError> {
        let agent = self.selected_agent().ok_or(ActionError::NoAgentSelected)?;
        self.escalation.escalate(&agent, ip_address).await
    }

    /// Lift a jail ban on the selected host.
    ///
    /// On success a reload is scheduled; on failure nothing changes locally.
    pub async fn unban(&self, ip_address: &str, jail_name: &str) -> Result<(), ActionError> {
        let agent = self.selected_agent().ok_or(ActionError::NoAgentSelected)?;
        self.backend.unban(&agent, ip_address, jail_name).await?;
        info!(agent = %agent, ip = %ip_address, jail = %jail_name, "ban lifted");
        self.coordinator.request_reload(ReloadReason::UnbanApplied);
        Ok(())
    }
}
