//! Card model: a user and the last work session they recorded.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{lenient_string, WorkSession};

/// A task card, one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// User id.
    pub id: String,
    /// Display name. Blank when the service did not provide one.
    pub name: String,
    /// The user's most recent session, running or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_work: Option<WorkSession>,
}

impl Card {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_work: None,
        }
    }

    /// The user's running session, if any.
    pub fn current_work(&self) -> Option<&WorkSession> {
        self.last_work.as_ref().filter(|w| w.is_running())
    }
}

/// A card exactly as it arrives over the wire, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    #[serde(default, alias = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub last_work: Option<serde_json::Value>,
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        let id = record.id.unwrap_or_default();
        let last_work = record.last_work.filter(|v| !v.is_null()).and_then(|mut value| {
            // the card is the owner when the service leaves it implicit
            if let Some(work) = value.as_object_mut() {
                let missing = work.get("ownerId").is_none_or(|v| !v.is_string());
                if missing && !id.is_empty() {
                    work.insert("ownerId".to_string(), serde_json::Value::String(id.clone()));
                }
            }
            match serde_json::from_value::<WorkSession>(value) {
                Ok(work) => Some(work),
                Err(e) => {
                    warn!(card = %id, error = %e, "ignoring malformed lastWork");
                    None
                }
            }
        });

        Self {
            id,
            name: record.name.unwrap_or_default(),
            last_work,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Card {
        serde_json::from_str::<CardRecord>(json).unwrap().into()
    }

    #[test]
    fn reads_card_with_running_work() {
        let card = parse(
            r#"{"id":"u1","name":"Ada","lastWork":{"id":"w1","ownerId":"u1","description":"x","startTime":"2024-01-05T09:00:00Z"}}"#,
        );
        assert_eq!(card.name, "Ada");
        assert!(card.current_work().is_some());
    }

    #[test]
    fn running_work_without_owner_belongs_to_the_card() {
        let card = parse(
            r#"{"_id":"u1","name":"Ada","lastWork":{"_id":"w1","description":"x","startTime":"2024-01-05T09:00:00Z"}}"#,
        );
        let work = card.current_work().unwrap();
        assert_eq!(work.id, "w1");
        assert_eq!(work.owner_id, "u1");

        let card = parse(
            r#"{"id":"u1","lastWork":{"id":"w2","ownerId":"u9","startTime":"2024-01-05T09:00:00Z"}}"#,
        );
        assert_eq!(card.last_work.unwrap().owner_id, "u9");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let card = parse(r#"{"_id":"u2","lastWork":{"description":"no start"}}"#);
        assert_eq!(card.id, "u2");
        assert_eq!(card.name, "");
        assert!(card.last_work.is_none());

        let card = parse(r#"{"id":7,"name":null,"lastWork":null}"#);
        assert_eq!(card.id, "7");
        assert!(card.name.is_empty());
    }
}
