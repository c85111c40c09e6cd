//! Subtab selection state machine.
//!
//! Exactly one of {active, history} is selected at all times; the machine
//! starts on `active` and lives for the page's session (no terminal state).
//! Re-selecting the current subtab is a no-op so tab-click spam never turns
//! into redundant fetches.

/// The two views of the ban page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subtab {
    /// Live bans correlated with firewall rules, plus summary stats.
    #[default]
    Active,
    /// Aggregated ban/unban event log for the selected time range.
    History,
}

impl Subtab {
    /// Stable label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Subtab::Active => "active",
            Subtab::History => "history",
        }
    }
}

/// Outcome of a subtab switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtabTransition {
    /// A new subtab was entered; its data load must run.
    Entered(Subtab),
    /// The requested subtab was already current; nothing to load.
    AlreadyCurrent,
}

/// Tracks the selected subtab.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtabStateMachine {
    current: Subtab,
}

impl SubtabStateMachine {
    /// Machine starting on the active view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected subtab.
    pub fn current(&self) -> Subtab {
        self.current
    }

    /// Select a subtab, deselecting the previous one.
    ///
    /// Returns [`SubtabTransition::Entered`] when the selection changed, so
    /// the caller knows to trigger the load the new state requires.
    pub fn switch_to(&mut self, subtab: Subtab) -> SubtabTransition {
        if self.current == subtab {
            return SubtabTransition::AlreadyCurrent;
        }
        self.current = subtab;
        SubtabTransition::Entered(subtab)
    }
}
