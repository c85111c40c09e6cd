//! Escalate-to-firewall workflow.
//!
//! Converts a temporary jail ban into a permanent firewall deny rule. The
//! backend owns duplicate suppression; this side's obligation is to not
//! re-issue the command for an address the index already covers, and to
//! schedule a reload on success so the next correlation pass reflects the
//! new rule. Failure mutates nothing.

use crate::client::BanBackend;
use crate::error::ActionError;
use crate::refresh::{RefreshCoordinator, ReloadReason, SharedView};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an escalation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// The backend accepted the command; a reload has been scheduled.
    Escalated,
    /// The address was already covered by a deny rule; nothing was issued.
    AlreadyEscalated,
}

/// Drives the escalate command against the backend.
pub struct EscalationWorkflow {
    backend: Arc<dyn BanBackend>,
    shared: Arc<SharedView>,
    coordinator: Arc<RefreshCoordinator>,
}

impl EscalationWorkflow {
    pub(crate) fn new(
        backend: Arc<dyn BanBackend>,
        shared: Arc<SharedView>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            backend,
            shared,
            coordinator,
        }
    }

    /// Escalate one banned address to a permanent firewall block.
    ///
    /// Idempotent from the caller's perspective: an address already in the
    /// index is a safe no-op. On success a reload is scheduled so the view
    /// picks up the new rule; on failure the displayed state is untouched
    /// and the backend's reason is surfaced.
    pub async fn escalate(
        &self,
        agent_id: &str,
        ip_address: &str,
    ) -> Result<EscalationOutcome, ActionError> {
        {
            let index = self.shared.index.read();
            if index.agent_id() == agent_id && index.membership(ip_address) {
                debug!(agent = %agent_id, ip = %ip_address, "escalation skipped, rule already present");
                return Ok(EscalationOutcome::AlreadyEscalated);
            }
        }

        self.backend
            .escalate_to_firewall(agent_id, ip_address)
            .await?;
        info!(agent = %agent_id, ip = %ip_address, "ban escalated to firewall");
        self.coordinator.request_reload(ReloadReason::EscalationApplied);
        Ok(EscalationOutcome::Escalated)
    }
}
