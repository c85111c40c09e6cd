//! Projection of raw ban lists into displayable records.
//!
//! Three steps: drop expired bans (including a client-side double-check
//! against clock skew between agent and backend), classify remaining time,
//! and sort so the most time-critical bans surface first. The view exists
//! for triage before a ban lapses.

use crate::model::{BanRecord, ProjectedBan, UrgencyClass};
use tracing::debug;

/// Project a raw ban list for one host into display order.
///
/// An empty input yields an empty output, which the shell renders as an
/// explicit "no active bans" state. It is not an error.
pub fn project(bans: Vec<BanRecord>) -> Vec<ProjectedBan> {
    let input_len = bans.len();
    let mut projected: Vec<ProjectedBan> = bans
        .into_iter()
        .filter(|ban| !is_effectively_expired(ban))
        .map(|record| {
            let remaining = record.effective_remaining();
            let urgency = UrgencyClass::from_remaining(remaining, record.is_permanent());
            let remaining_label = remaining_label(&record);
            ProjectedBan {
                record,
                urgency,
                remaining_label,
            }
        })
        .collect();

    // Most time-critical first; permanent bans read remaining 0 and pin to
    // the top. Oldest ban wins ties.
    projected.sort_by(|a, b| {
        a.record
            .effective_remaining()
            .cmp(&b.record.effective_remaining())
            .then_with(|| a.record.banned_at.cmp(&b.record.banned_at))
    });

    if projected.len() != input_len {
        debug!(
            dropped = input_len - projected.len(),
            kept = projected.len(),
            "expired bans filtered during projection"
        );
    }
    projected
}

/// Expiry check with a defensive client-side pass.
///
/// A decaying ban whose remaining time has reached zero is treated as
/// expired even when the backend did not flag it yet.
fn is_effectively_expired(ban: &BanRecord) -> bool {
    if ban.is_expired {
        return true;
    }
    !ban.is_permanent() && ban.effective_remaining() <= 0
}

/// Human-readable remaining time: "permanent", "1h 05m", "4m 30s", "45s".
fn remaining_label(ban: &BanRecord) -> String {
    if ban.is_permanent() {
        return "permanent".to_string();
    }
    let secs = ban.effective_remaining().max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ban(ip: &str, remaining: Option<i64>, duration: u64, expired: bool) -> BanRecord {
        BanRecord {
            ip_address: ip.to_string(),
            jail_name: "sshd".to_string(),
            failure_count: 5,
            ban_count: 1,
            banned_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
            ban_duration_seconds: duration,
            remaining_seconds: remaining,
            is_expired: expired,
            agent_id: "a1".to_string(),
        }
    }

    #[test]
    fn test_expired_records_never_survive() {
        let out = project(vec![
            ban("10.0.0.1", Some(100), 600, true),
            ban("10.0.0.2", Some(100), 600, false),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.ip_address, "10.0.0.2");
    }

    #[test]
    fn test_defensive_expiry_on_zero_remaining() {
        // Backend lagged: remaining hit zero but is_expired is still false.
        let out = project(vec![ban("10.0.0.3", Some(0), 600, false)]);
        assert!(out.is_empty());

        let out = project(vec![ban("10.0.0.3", Some(-5), 600, false)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_permanent_ban_survives_zero_remaining() {
        let out = project(vec![ban("10.0.0.4", None, 0, false)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].urgency, UrgencyClass::Safe);
        assert_eq!(out[0].remaining_label, "permanent");
    }

    #[test]
    fn test_sorted_by_remaining_ascending() {
        let out = project(vec![
            ban("10.0.0.9", Some(900), 3600, false),
            ban("10.0.0.5", Some(30), 600, false),
            ban("10.0.0.7", Some(400), 3600, false),
        ]);
        let ips: Vec<&str> = out.iter().map(|b| b.record.ip_address.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.5", "10.0.0.7", "10.0.0.9"]);
    }

    #[test]
    fn test_ties_broken_by_oldest_ban_first() {
        let mut older = ban("10.0.0.5", Some(120), 600, false);
        older.banned_at = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        let mut newer = ban("10.0.0.6", Some(120), 600, false);
        newer.banned_at = Utc.with_ymd_and_hms(2026, 8, 1, 11, 0, 0).unwrap();

        let out = project(vec![newer, older]);
        let ips: Vec<&str> = out.iter().map(|b| b.record.ip_address.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.5", "10.0.0.6"]);
    }

    #[test]
    fn test_permanent_bans_sort_first() {
        // Missing remaining time reads as 0, so permanent bans pin above
        // even critical decaying bans.
        let out = project(vec![
            ban("10.0.0.5", Some(30), 600, false),
            ban("10.0.0.250", None, 0, false),
        ]);
        let ips: Vec<&str> = out.iter().map(|b| b.record.ip_address.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.250", "10.0.0.5"]);
    }

    #[test]
    fn test_urgency_classification() {
        let out = project(vec![
            ban("10.0.0.5", Some(30), 600, false),
            ban("10.0.0.7", Some(600), 3600, false),
            ban("10.0.0.9", Some(901), 3600, false),
        ]);
        assert_eq!(out[0].urgency, UrgencyClass::Critical);
        assert_eq!(out[1].urgency, UrgencyClass::Warning);
        assert_eq!(out[2].urgency, UrgencyClass::Safe);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(project(Vec::new()).is_empty());
    }

    #[test]
    fn test_remaining_labels() {
        let out = project(vec![
            ban("10.0.0.5", Some(45), 600, false),
            ban("10.0.0.6", Some(270), 600, false),
            ban("10.0.0.7", Some(3900), 7200, false),
        ]);
        assert_eq!(out[0].remaining_label, "45s");
        assert_eq!(out[1].remaining_label, "4m 30s");
        assert_eq!(out[2].remaining_label, "1h 05m");
    }
}
