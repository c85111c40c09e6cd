//! End-to-end tests of the console facade against a scripted backend.
//!
//! Time is paused, so debounce windows and simulated network latency
//! advance deterministically without wall-clock waits.

use async_trait::async_trait;
use banwatch::{
    ActionError, BanBackend, BanConsole, BanRecord, BanStats, ConsoleConfig, EscalationOutcome,
    FetchError, FirewallRule, HistoryEvent, HistoryPage, HistoryTimeRange, RuleAction, Subtab,
    UrgencyClass, ViewState,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn ban(ip: &str, remaining: i64, agent: &str) -> BanRecord {
    BanRecord {
        ip_address: ip.to_string(),
        jail_name: "sshd".to_string(),
        failure_count: 5,
        ban_count: 1,
        banned_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
        ban_duration_seconds: 3600,
        remaining_seconds: Some(remaining),
        is_expired: false,
        agent_id: agent.to_string(),
    }
}

fn deny(ip: &str, agent: &str) -> FirewallRule {
    FirewallRule {
        ip_address: ip.to_string(),
        action: RuleAction::Deny,
        agent_id: agent.to_string(),
    }
}

/// In-memory backend: per-agent data, injectable latency, and escalation
/// that actually appends a deny rule like the real firewall would.
#[derive(Default)]
struct FakeBackend {
    bans: Mutex<HashMap<String, Vec<BanRecord>>>,
    rules: Mutex<HashMap<String, Vec<FirewallRule>>>,
    ban_delay: Mutex<HashMap<String, Duration>>,
    history: Mutex<Vec<HistoryEvent>>,
}

#[async_trait]
impl BanBackend for FakeBackend {
    async fn live_bans(&self, agent_id: &str) -> Result<Vec<BanRecord>, FetchError> {
        let delay = self.ban_delay.lock().get(agent_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.bans.lock().get(agent_id).cloned().unwrap_or_default())
    }

    async fn firewall_rules(&self, agent_id: &str) -> Result<Vec<FirewallRule>, FetchError> {
        Ok(self.rules.lock().get(agent_id).cloned().unwrap_or_default())
    }

    async fn ban_stats(&self, agent_id: Option<&str>) -> Result<BanStats, FetchError> {
        let active = agent_id
            .and_then(|a| self.bans.lock().get(a).map(Vec::len))
            .unwrap_or(0) as u64;
        Ok(BanStats {
            active_bans: active,
            total_bans: active,
            repeat_offenders: 0,
            escalated_count: 0,
        })
    }

    async fn history_events(
        &self,
        _agent_id: Option<&str>,
        _range: HistoryTimeRange,
        page: u32,
        _page_size: u32,
    ) -> Result<HistoryPage, FetchError> {
        let events = self.history.lock().clone();
        let total = events.len() as u64;
        Ok(HistoryPage {
            events,
            page,
            pages: 1,
            total,
        })
    }

    async fn unban(&self, agent_id: &str, ip_address: &str, _jail: &str) -> Result<(), ActionError> {
        let mut bans = self.bans.lock();
        if let Some(list) = bans.get_mut(agent_id) {
            list.retain(|b| b.ip_address != ip_address);
        }
        Ok(())
    }

    async fn escalate_to_firewall(
        &self,
        agent_id: &str,
        ip_address: &str,
    ) -> Result<(), ActionError> {
        self.rules
            .lock()
            .entry(agent_id.to_string())
            .or_default()
            .push(deny(ip_address, agent_id));
        Ok(())
    }
}

fn console_with(backend: Arc<FakeBackend>) -> BanConsole {
    let config: ConsoleConfig = toml::from_str("[refresh]\ndebounce_ms = 100").unwrap();
    BanConsole::with_backend(&config, backend as Arc<dyn BanBackend>)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(2000)).await;
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

#[tokio::test(start_paused = true)]
async fn test_active_view_scenario() {
    let backend = Arc::new(FakeBackend::default());
    backend.bans.lock().insert(
        "a1".to_string(),
        vec![ban("10.0.0.5", 30, "a1"), ban("10.0.0.9", 900, "a1")],
    );
    backend
        .rules
        .lock()
        .insert("a1".to_string(), vec![deny("10.0.0.9", "a1")]);

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a1".to_string()));
    settle().await;

    match console.current_view() {
        ViewState::ActiveBans {
            agent_id,
            bans,
            stats,
            degraded,
        } => {
            assert_eq!(agent_id, "a1");
            assert!(!degraded);
            assert_eq!(stats.unwrap().active_bans, 2);

            assert_eq!(bans[0].record.ip_address, "10.0.0.5");
            assert_eq!(bans[0].urgency, UrgencyClass::Critical);
            assert!(!bans[0].in_firewall);
            assert!(bans[0].escalation_available());

            assert_eq!(bans[1].record.ip_address, "10.0.0.9");
            assert_eq!(bans[1].urgency, UrgencyClass::Safe);
            assert!(bans[1].in_firewall);
            assert!(!bans[1].escalation_available());
        }
        other => panic!("expected active bans, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_ban_list_is_not_an_error() {
    let backend = Arc::new(FakeBackend::default());
    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("quiet-host".to_string()));
    settle().await;

    match console.current_view() {
        ViewState::ActiveBans { bans, .. } => assert!(bans.is_empty()),
        other => panic!("expected empty active view, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_host_switch_shows_newer_host_only() {
    init_tracing();
    let backend = Arc::new(FakeBackend::default());
    backend
        .bans
        .lock()
        .insert("a".to_string(), vec![ban("10.1.1.1", 60, "a")]);
    backend
        .bans
        .lock()
        .insert("b".to_string(), vec![ban("10.2.2.2", 60, "b")]);
    // Host a answers after host b, so a's response arrives out of order.
    backend
        .ban_delay
        .lock()
        .insert("a".to_string(), Duration::from_millis(700));

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a".to_string()));
    // Debounce fires at 100ms; a's fetch is now in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    console.on_host_context_changed(Some("b".to_string()));
    settle().await;

    match console.current_view() {
        ViewState::ActiveBans { agent_id, bans, .. } => {
            assert_eq!(agent_id, "b");
            assert_eq!(bans.len(), 1);
            assert_eq!(bans[0].record.ip_address, "10.2.2.2");
            assert_eq!(bans[0].record.agent_id, "b");
        }
        other => panic!("expected host b's bans, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_escalation_round_trip() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .bans
        .lock()
        .insert("a1".to_string(), vec![ban("10.0.0.5", 30, "a1")]);

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a1".to_string()));
    settle().await;

    let outcome = console.escalate("10.0.0.5").await.unwrap();
    assert_eq!(outcome, EscalationOutcome::Escalated);
    settle().await;

    // The scheduled reload picked up the new rule.
    match console.current_view() {
        ViewState::ActiveBans { bans, .. } => {
            assert!(bans[0].in_firewall);
            assert!(!bans[0].escalation_available());
        }
        other => panic!("expected active bans, got {other:?}"),
    }

    // Second escalation is a local no-op; the backend rule list is unchanged.
    let outcome = console.escalate("10.0.0.5").await.unwrap();
    assert_eq!(outcome, EscalationOutcome::AlreadyEscalated);
    assert_eq!(backend.rules.lock().get("a1").unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unban_removes_record_after_reload() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .bans
        .lock()
        .insert("a1".to_string(), vec![ban("10.0.0.5", 30, "a1")]);

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a1".to_string()));
    settle().await;

    console.unban("10.0.0.5", "sshd").await.unwrap();
    settle().await;

    match console.current_view() {
        ViewState::ActiveBans { bans, .. } => assert!(bans.is_empty()),
        other => panic!("expected empty active view, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_history_subtab_loads_events() {
    let backend = Arc::new(FakeBackend::default());
    backend.history.lock().push(HistoryEvent {
        ip_address: "10.0.0.5".to_string(),
        jail_name: "sshd".to_string(),
        failure_count: 12,
        ban_count: 3,
        unban_count: 2,
        agent_id: "a1".to_string(),
        agent_hostname: "web-01".to_string(),
        reported_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
    });

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a1".to_string()));
    console.on_subtab_selected(Subtab::History);
    settle().await;

    match console.current_view() {
        ViewState::History { agent_id, page, .. } => {
            assert_eq!(agent_id, "a1");
            assert_eq!(page.total, 1);
            assert_eq!(page.events[0].ban_count, 3);
            assert_eq!(page.events[0].agent_hostname, "web-01");
        }
        other => panic!("expected history view, got {other:?}"),
    }

    // Back to active: the pipeline for the entered subtab runs again.
    console.on_subtab_selected(Subtab::Active);
    settle().await;
    assert!(matches!(
        console.current_view(),
        ViewState::ActiveBans { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_deselecting_host_clears_view() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .bans
        .lock()
        .insert("a1".to_string(), vec![ban("10.0.0.5", 30, "a1")]);

    let console = console_with(Arc::clone(&backend));
    console.on_host_context_changed(Some("a1".to_string()));
    settle().await;
    console.on_host_context_changed(None);
    settle().await;

    assert!(matches!(console.current_view(), ViewState::NoAgentSelected));
}
