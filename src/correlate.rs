//! Correlation of projected bans with firewall membership.
//!
//! A pure join: each projected ban gains an `in_firewall` flag from index
//! membership. Nothing else changes; ordering established by the projector
//! is the display order and must survive untouched.

use crate::index::FirewallRuleIndex;
use crate::model::{CorrelatedBan, ProjectedBan};

/// Join projected bans with the firewall index.
///
/// Pure and total over its inputs; order-preserving. A ban whose address is
/// covered by a deny rule is "already escalated" and the escalate action is
/// not offered for it.
pub fn correlate(bans: Vec<ProjectedBan>, index: &FirewallRuleIndex) -> Vec<CorrelatedBan> {
    bans.into_iter()
        .map(|ban| {
            let in_firewall = index.membership(&ban.record.ip_address);
            CorrelatedBan {
                record: ban.record,
                urgency: ban.urgency,
                remaining_label: ban.remaining_label,
                in_firewall,
            }
        })
        .collect()
}
