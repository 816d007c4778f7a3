use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cursor, User};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTweet {
    pub content: String,
}

/// Query string of the feed endpoint. The cursor arrives as two flat
/// parameters and is only meaningful when both are present. Tweet timestamps
/// are stored at millisecond precision, so a finer `cursorCreatedAt` cannot
/// name a feed position and is rejected.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub limit: Option<usize>,
    pub cursor_id: Option<String>,
    pub cursor_created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub liked_by_me: bool,
    pub user: User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub tweets: Vec<TweetView>,
    pub next_cursor: Option<Cursor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLike {
    pub added_like: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
}
