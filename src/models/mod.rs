use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl Tweet {
    pub fn new(content: String, user_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            created_at: now_millis(),
            user_id,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            id: self.id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Profile copy of a user owned by the external identity system.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl User {
    /// Stand-in for a user whose profile was never synced.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            image: None,
        }
    }
}

/// Position in the feed order: the last tweet a client has seen.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Feed timestamps are kept at millisecond precision so that a cursor echoed
/// back by a client lands on exactly the same index key.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tweet_gets_unique_id_and_millisecond_timestamp() {
        let a = Tweet::new("hello".into(), "u1".into());
        let b = Tweet::new("hello".into(), "u1".into());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let tweet = Tweet::new("hi".into(), "u1".into());
        let json = serde_json::to_value(&tweet).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["userId"], "u1");
    }
}
