//! Reload scheduling, debouncing, and the stale-response guard.
//!
//! Rapid triggers (a user flipping the host selector twice within one
//! network round trip, a tab switch racing a manual refresh) must collapse
//! into exactly one authoritative final state, never a stale overwrite.
//! Three mechanisms enforce that:
//!
//! - **Debounce**: a trigger arms a timer task for the quiet window; any
//!   trigger arriving before it fires aborts and re-arms it. One reload
//!   executes per window no matter the call volume. An already *executing*
//!   reload is never aborted; the epoch guard makes it inert instead.
//! - **Epoch tagging**: every context mutation bumps an atomic epoch. A
//!   reload snapshots the epoch with the context at fetch-issue time and the
//!   apply step discards the result if the epoch has moved on. This is the
//!   cancellation substitute: late responses become no-ops.
//! - **Single writer**: shared view state is written only inside
//!   [`RefreshCoordinator::apply_with`]; everything else reads.

use crate::client::BanBackend;
use crate::correlate::correlate;
use crate::index::FirewallRuleIndex;
use crate::model::{
    AgentId, BanStats, CorrelatedBan, HistoryPage, HistoryTimeRange, ViewContext,
};
use crate::projector::project;
use crate::subtab::Subtab;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What prompted a reload. Logging only; all reasons schedule identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// The selected host changed.
    HostChanged,
    /// A different subtab was entered.
    SubtabChanged,
    /// The history time range changed.
    TimeRangeChanged,
    /// A different history page was requested.
    PageChanged,
    /// The user asked for a refresh.
    Manual,
    /// An escalation succeeded and the view must reflect the new rule.
    EscalationApplied,
    /// An unban succeeded.
    UnbanApplied,
}

impl ReloadReason {
    /// Stable label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostChanged => "host_changed",
            Self::SubtabChanged => "subtab_changed",
            Self::TimeRangeChanged => "time_range_changed",
            Self::PageChanged => "page_changed",
            Self::Manual => "manual",
            Self::EscalationApplied => "escalation_applied",
            Self::UnbanApplied => "unban_applied",
        }
    }
}

/// What the rendering layer should currently paint.
///
/// "No host selected", "no active bans" (an `ActiveBans` with an empty list)
/// and "data unavailable" are three distinct states and are never conflated.
#[derive(Debug, Clone, Default)]
pub enum ViewState {
    /// No host chosen yet. A valid empty state, not an error.
    #[default]
    NoAgentSelected,
    /// The active-bans view.
    ActiveBans {
        /// Host the data belongs to.
        agent_id: AgentId,
        /// Correlated bans in display order.
        bans: Vec<CorrelatedBan>,
        /// Summary counters, absent when the stats fetch failed.
        stats: Option<BanStats>,
        /// Set when part of the cycle failed and the shell should show a
        /// non-fatal "data may be stale" banner.
        degraded: bool,
    },
    /// The history view.
    History {
        /// Host the data belongs to.
        agent_id: AgentId,
        /// Current page of events.
        page: HistoryPage,
        /// Set when the shown page is last-known-good after a failed fetch.
        degraded: bool,
    },
    /// No data to show and no last-known-good to fall back on. The shell
    /// renders this with a manual-retry affordance.
    Unavailable {
        /// Human-readable failure description.
        reason: String,
    },
}

/// State shared between the console facade, the coordinator, and the
/// escalation workflow.
#[derive(Debug, Default)]
pub(crate) struct SharedView {
    /// Session context. Mutated only by the facade's context mutators.
    pub(crate) ctx: RwLock<ViewContext>,
    /// Current view. Written only by the coordinator's apply step.
    pub(crate) view: RwLock<ViewState>,
    /// Firewall index for the selected host. Written only by the apply step.
    pub(crate) index: RwLock<FirewallRuleIndex>,
    /// Context epoch; bumped on every in-flight-invalidating mutation.
    epoch: AtomicU64,
}

impl SharedView {
    /// Bump the epoch, invalidating every in-flight reload.
    ///
    /// Callers must hold the `ctx` write lock so a reload can never snapshot
    /// a new context with an old tag.
    pub(crate) fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current epoch.
    pub(crate) fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// Debounces and executes reloads; sole writer of the shared view.
pub struct RefreshCoordinator {
    backend: Arc<dyn BanBackend>,
    shared: Arc<SharedView>,
    debounce: Duration,
    history_page_size: u32,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        backend: Arc<dyn BanBackend>,
        shared: Arc<SharedView>,
        debounce: Duration,
        history_page_size: u32,
    ) -> Self {
        Self {
            backend,
            shared,
            debounce,
            history_page_size,
            pending: Mutex::new(None),
        }
    }

    /// Schedule a reload after the quiet window.
    ///
    /// A call arriving while a timer is pending aborts and restarts it; at
    /// most one reload executes per quiet window.
    pub fn request_reload(self: &Arc<Self>, reason: ReloadReason) {
        let mut pending = self.pending.lock();
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        debug!(reason = reason.as_str(), "reload scheduled");
        let this = Arc::clone(self);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            // Detach execution so a later trigger only ever aborts the
            // timer, not a reload that already started fetching.
            let exec = Arc::clone(&this);
            tokio::spawn(async move {
                exec.run_reload(reason).await;
            });
        }));
    }

    /// Execute one reload cycle for the context current right now.
    pub(crate) async fn run_reload(&self, reason: ReloadReason) {
        let (tag, agent, subtab, range, page) = {
            let ctx = self.shared.ctx.read();
            (
                self.shared.current_epoch(),
                ctx.agent_id.clone(),
                ctx.subtabs.current(),
                ctx.time_range,
                ctx.history_page,
            )
        };
        debug!(reason = reason.as_str(), tag, subtab = subtab.name(), "reload running");

        let Some(agent) = agent else {
            self.apply_with(tag, |view, index| {
                *view = ViewState::NoAgentSelected;
                *index = FirewallRuleIndex::default();
            });
            return;
        };

        match subtab {
            Subtab::Active => self.reload_active(tag, &agent).await,
            Subtab::History => self.reload_history(tag, &agent, range, page).await,
        }
    }

    /// Active view: bans, rules and stats fetched concurrently, joined, then
    /// correlated, so correlation never sees a half-refreshed cycle.
    async fn reload_active(&self, tag: u64, agent: &str) {
        let (bans, rules, stats) = tokio::join!(
            self.backend.live_bans(agent),
            self.backend.firewall_rules(agent),
            self.backend.ban_stats(Some(agent)),
        );

        let mut degraded = false;

        let index = match rules {
            Ok(rules) => FirewallRuleIndex::from_rules(agent, &rules),
            Err(e) => {
                warn!(agent = %agent, error = %e, code = e.error_code(), "firewall rules fetch failed, correlating against empty index");
                degraded = true;
                FirewallRuleIndex::empty(agent)
            }
        };

        let stats = match stats {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(agent = %agent, error = %e, code = e.error_code(), "ban stats fetch failed");
                degraded = true;
                None
            }
        };

        match bans {
            Ok(list) => {
                let correlated = correlate(project(list), &index);
                let agent = agent.to_string();
                self.apply_with(tag, move |view, idx| {
                    *idx = index;
                    *view = ViewState::ActiveBans {
                        agent_id: agent,
                        bans: correlated,
                        stats,
                        degraded,
                    };
                });
            }
            Err(e) => {
                warn!(agent = %agent, error = %e, code = e.error_code(), "live bans fetch failed");
                let agent = agent.to_string();
                let reason = e.to_string();
                self.apply_with(tag, move |view, idx| {
                    *idx = index;
                    match view {
                        // Last-known-good for the same host stays up, flagged.
                        ViewState::ActiveBans {
                            agent_id, degraded, ..
                        } if *agent_id == agent => {
                            *degraded = true;
                        }
                        _ => {
                            *view = ViewState::Unavailable { reason };
                        }
                    }
                });
            }
        }
    }

    async fn reload_history(&self, tag: u64, agent: &str, range: HistoryTimeRange, page: u32) {
        match self
            .backend
            .history_events(Some(agent), range, page, self.history_page_size)
            .await
        {
            Ok(events) => {
                let agent = agent.to_string();
                self.apply_with(tag, move |view, _| {
                    *view = ViewState::History {
                        agent_id: agent,
                        page: events,
                        degraded: false,
                    };
                });
            }
            Err(e) => {
                warn!(agent = %agent, error = %e, code = e.error_code(), "history fetch failed");
                let agent = agent.to_string();
                let reason = e.to_string();
                self.apply_with(tag, move |view, _| match view {
                    ViewState::History {
                        agent_id, degraded, ..
                    } if *agent_id == agent => {
                        *degraded = true;
                    }
                    _ => {
                        *view = ViewState::Unavailable { reason };
                    }
                });
            }
        }
    }

    /// The apply step: the only place shared view state is written.
    ///
    /// Checks the epoch under the view write lock, so a stale result can
    /// never slip in between check and write. Returns whether it applied.
    fn apply_with(
        &self,
        tag: u64,
        f: impl FnOnce(&mut ViewState, &mut FirewallRuleIndex),
    ) -> bool {
        let mut view = self.shared.view.write();
        let current = self.shared.current_epoch();
        if current != tag {
            debug!(tag, current, "stale response discarded");
            return false;
        }
        let mut index = self.shared.index.write();
        f(&mut view, &mut index);
        true
    }
}
