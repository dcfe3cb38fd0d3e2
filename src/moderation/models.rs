//! Moderation data models
//!
//! A moderation is the pending/approved/rejected envelope for one event on one
//! entity; its fields carry the per-attribute old/new values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Moderation status in the approval workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    /// Waiting for a decision
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            _ => Err(format!("Invalid moderation status: {}", s)),
        }
    }
}

/// Reference to a moderated entity (type + id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: Option<String>,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: Option<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.entity_type,
            self.entity_id.as_deref().unwrap_or("?")
        )
    }
}

/// An authenticated principal acting on an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    /// Morph type of the principal, e.g. `users`
    pub kind: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Moderation built from an event, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModeration {
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub event: String,
    pub status: ModerationStatus,
    pub url: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub moderated_by: Option<String>,
}

/// Field delta built from an event, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModerationField {
    pub name: String,
    /// `None` when the side is absent, `Some(Value::Null)` for a null value
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub status: ModerationStatus,
}

/// Output of the record builder: the envelope plus its field deltas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingModeration {
    pub moderation: NewModeration,
    pub fields: Vec<NewModerationField>,
}

impl PendingModeration {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn target(&self) -> EntityRef {
        EntityRef::new(
            self.moderation.entity_type.clone(),
            self.moderation.entity_id.clone(),
        )
    }
}

/// Stored moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moderation {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub event: String,
    pub status: ModerationStatus,
    pub url: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub moderated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<ModerationField>,
}

/// Stored field delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationField {
    pub id: Uuid,
    pub moderation_id: Uuid,
    pub name: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Moderation {
    /// Materialize a built moderation with fresh ids and timestamps
    pub fn from_pending(pending: PendingModeration, now: DateTime<Utc>) -> Self {
        let id = Uuid::now_v7();
        let PendingModeration { moderation, fields } = pending;

        Self {
            id,
            user_id: moderation.user_id,
            user_type: moderation.user_type,
            entity_type: moderation.entity_type,
            entity_id: moderation.entity_id,
            event: moderation.event,
            status: moderation.status,
            url: moderation.url,
            ip_address: moderation.ip_address,
            user_agent: moderation.user_agent,
            moderated_by: moderation.moderated_by,
            created_at: now,
            updated_at: now,
            fields: fields
                .into_iter()
                .map(|field| ModerationField {
                    id: Uuid::now_v7(),
                    moderation_id: id,
                    name: field.name,
                    old: field.old,
                    new: field.new,
                    status: field.status,
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
        }
    }

    pub fn target(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id.clone())
    }

    /// Field deltas keyed by attribute name
    pub fn modified(&self) -> BTreeMap<&str, &ModerationField> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field))
            .collect()
    }

    pub fn is_pending(&self) -> bool {
        self.status == ModerationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> PendingModeration {
        PendingModeration {
            moderation: NewModeration {
                user_id: Some("7".to_string()),
                user_type: Some("users".to_string()),
                entity_type: "posts".to_string(),
                entity_id: Some("1".to_string()),
                event: "updated".to_string(),
                status: ModerationStatus::Pending,
                url: "console".to_string(),
                ip_address: None,
                user_agent: None,
                moderated_by: None,
            },
            fields: vec![NewModerationField {
                name: "title".to_string(),
                old: Some(json!("A")),
                new: Some(json!("B")),
                status: ModerationStatus::Pending,
            }],
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ModerationStatus::Pending,
            ModerationStatus::Approved,
            ModerationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ModerationStatus>(), Ok(status));
        }
        assert!("closed".parse::<ModerationStatus>().is_err());
        assert_eq!(ModerationStatus::default(), ModerationStatus::Pending);
    }

    #[test]
    fn test_from_pending_links_fields() {
        let now = Utc::now();
        let moderation = Moderation::from_pending(pending(), now);

        assert!(moderation.is_pending());
        assert_eq!(moderation.fields.len(), 1);
        assert_eq!(moderation.fields[0].moderation_id, moderation.id);
        assert_eq!(moderation.fields[0].created_at, now);
        assert_eq!(moderation.target().to_string(), "posts:1");
        assert_eq!(moderation.modified()["title"].new, Some(json!("B")));
    }

    #[test]
    fn test_ids_follow_creation_order_within_a_timestamp() {
        let now = Utc::now();
        let ids: Vec<Uuid> = (0..5)
            .map(|_| Moderation::from_pending(pending(), now).id)
            .collect();

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
