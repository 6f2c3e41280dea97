//! Construction of security-trail entries.
//!
//! Exactly one audit entry is produced when an action carries security
//! implications: login failures, permission revocations, admin deletions.
//! Entries are immutable once written; the display variant resolves names
//! at read time in the data layer.

use chrono::Utc;

use boomtown_types::{AuditEntry, AuditEntryId, AuditEventKind, TenantId, UserId};

/// Build one audit entry.
///
/// `detail` should be a single human-readable line; it is stored verbatim.
pub fn audit_event(
    kind: AuditEventKind,
    user_id: Option<UserId>,
    tenant_id: Option<TenantId>,
    source_ip: Option<String>,
    detail: impl Into<String>,
) -> AuditEntry {
    let entry = AuditEntry {
        id: AuditEntryId::new(),
        kind,
        user_id,
        tenant_id,
        source_ip,
        detail: detail.into(),
        created_at: Utc::now(),
    };
    tracing::debug!(kind = ?entry.kind, user = ?entry.user_id, "audit event recorded");
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_event_captures_context() {
        let user = UserId::new();
        let entry = audit_event(
            AuditEventKind::LoginFailed,
            Some(user),
            None,
            Some(String::from("203.0.113.9")),
            "bad password for jcalm",
        );
        assert_eq!(entry.kind, AuditEventKind::LoginFailed);
        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.detail, "bad password for jcalm");
    }
}
