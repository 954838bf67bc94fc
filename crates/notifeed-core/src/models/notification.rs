use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_NOTICE_MESSAGE, METADATA_ORGANIZATION_NAME};

/// Closed set of notification categories emitted by the document service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,
    DocumentShared,
    DocumentCommented,
    MemberJoined,
    MemberLeft,
    MemberRemoved,
    RoleChanged,
    AiProcessingStarted,
    AiProcessingCompleted,
    AiProcessingFailed,
    InvitationReceived,
    InvitationAccepted,
    InvitationDeclined,
    /// Anything a newer server sends that this client does not know yet,
    /// and payloads with no type at all
    #[serde(other)]
    #[default]
    Other,
}

impl NotificationKind {
    /// Invitations target a user before they belong to the organization, so
    /// they are shown whatever scope is active.
    pub fn is_invitation(&self) -> bool {
        matches!(
            self,
            NotificationKind::InvitationReceived
                | NotificationKind::InvitationAccepted
                | NotificationKind::InvitationDeclined
        )
    }
}

/// A single notification as pulled from the API or pushed over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Absent on push payloads that have not been persisted server-side yet
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        rename = "organizationId",
        alias = "scope",
        skip_serializing_if = "Option::is_none"
    )]
    pub scope: Option<String>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: NotificationKind,
    #[serde(default, alias = "actorId")]
    pub actor: String,
    #[serde(default, alias = "recipientId")]
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub read_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Message to display, falling back to the fixed default text
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_NOTICE_MESSAGE)
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_ORGANIZATION_NAME)
            .and_then(|v| v.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Milliseconds since the Unix epoch used for newest-first ordering.
    /// Missing or unparseable timestamps count as the epoch itself.
    pub fn sort_key(&self) -> i64 {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|ts| ts.timestamp_millis())
            .unwrap_or(0)
    }

    /// True when both carry an id and the ids are equal.
    pub fn same_id(&self, other_id: Option<&str>) -> bool {
        match (self.id.as_deref(), other_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Parse RFC 3339, naive date-times and plain dates (UTC assumed).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_payload() {
        let payload = json!({
            "_id": "n1",
            "organizationId": "org-a",
            "type": "document_shared",
            "actorId": "u2",
            "recipientId": "u1",
            "message": "Alice shared Q3 report",
            "metadata": { "organizationName": "Acme" },
            "readAt": null,
            "createdAt": "2026-02-14T09:30:00Z"
        });

        let n: Notification = serde_json::from_value(payload).unwrap();
        assert_eq!(n.id.as_deref(), Some("n1"));
        assert_eq!(n.scope.as_deref(), Some("org-a"));
        assert_eq!(n.kind, NotificationKind::DocumentShared);
        assert_eq!(n.actor, "u2");
        assert!(n.is_unread());
        assert_eq!(n.organization_name(), Some("Acme"));
    }

    #[test]
    fn test_unknown_kind_and_missing_fields() {
        let n: Notification =
            serde_json::from_value(json!({ "type": "billing_overdue" })).unwrap();
        assert_eq!(n.kind, NotificationKind::Other);
        assert!(n.id.is_none());
        assert!(n.scope.is_none());
        assert!(n.metadata.is_empty());
        assert_eq!(n.sort_key(), 0);
    }

    #[test]
    fn test_missing_type_is_other() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "n9",
            "organizationId": "org",
            "message": "Untyped"
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Other);
        assert_eq!(n.display_message(), "Untyped");
    }

    #[test]
    fn test_invitation_kinds() {
        assert!(NotificationKind::InvitationReceived.is_invitation());
        assert!(NotificationKind::InvitationDeclined.is_invitation());
        assert!(!NotificationKind::MemberJoined.is_invitation());
        assert!(!NotificationKind::Other.is_invitation());
    }

    #[test]
    fn test_display_message_fallback() {
        let mut n: Notification =
            serde_json::from_value(json!({ "type": "role_changed" })).unwrap();
        assert_eq!(n.display_message(), DEFAULT_NOTICE_MESSAGE);

        n.message = Some("   ".to_string());
        assert_eq!(n.display_message(), DEFAULT_NOTICE_MESSAGE);

        n.message = Some("You are now an editor".to_string());
        assert_eq!(n.display_message(), "You are now an editor");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let date = parse_timestamp("2026-02-13").unwrap();
        let rfc = parse_timestamp("2026-02-13T00:00:00Z").unwrap();
        let naive = parse_timestamp("2026-02-13T00:00:00.000").unwrap();
        assert_eq!(date, rfc);
        assert_eq!(date, naive);
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_same_id_requires_both_ids() {
        let mut n: Notification =
            serde_json::from_value(json!({ "type": "member_left" })).unwrap();
        assert!(!n.same_id(None));
        assert!(!n.same_id(Some("x")));

        n.id = Some("x".to_string());
        assert!(n.same_id(Some("x")));
        assert!(!n.same_id(None));
    }
}
