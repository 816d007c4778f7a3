//! sled-backed storage.
//!
//! One database, one tree per record kind:
//!
//! - `tweets`: tweet id -> tweet JSON
//! - `feed`: [`feed_key`] -> tweet id, ordered oldest to newest
//! - `users`: user id -> user JSON
//! - `likes`: [`pair_key`]`(user, tweet)` -> empty
//! - `like_counts`: tweet id -> big-endian `u64` like count
//! - `sessions`: bearer token -> user id
//!
//! A like exists exactly when its `likes` key exists, so the store cannot
//! hold two likes for the same pair. `like_counts` is only ever written in the
//! same transaction as `likes`, so it always equals the number of like keys.
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sled::{
    transaction::{ConflictableTransactionError, TransactionalTree},
    IVec, Transactional, Tree,
};
use tracing::info;

use crate::{
    error::AppError,
    models::{Tweet, User},
};

#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    pub(crate) tweets: Tree,
    pub(crate) feed: Tree,
    pub(crate) users: Tree,
    pub(crate) likes: Tree,
    pub(crate) like_counts: Tree,
    pub(crate) sessions: Tree,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        info!("Opening database at {}", path.display());
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, AppError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, AppError> {
        Ok(Self {
            tweets: db.open_tree("tweets")?,
            feed: db.open_tree("feed")?,
            users: db.open_tree("users")?,
            likes: db.open_tree("likes")?,
            like_counts: db.open_tree("like_counts")?,
            sessions: db.open_tree("sessions")?,
            db,
        })
    }

    pub async fn flush(&self) -> Result<(), AppError> {
        self.db.flush_async().await?;
        Ok(())
    }

    pub fn insert_tweet(&self, tweet: &Tweet) -> Result<(), AppError> {
        let json = encode(tweet)?;
        let index_key = feed_key(&tweet.created_at, &tweet.id);

        (&self.tweets, &self.feed).transaction(|(tweets, feed)| {
            tweets.insert(tweet.id.as_bytes(), json.as_slice())?;
            feed.insert(index_key.as_slice(), tweet.id.as_bytes())?;
            Ok::<_, ConflictableTransactionError<AppError>>(())
        })?;
        Ok(())
    }

    pub fn get_tweet(&self, tweet_id: &str) -> Result<Option<Tweet>, AppError> {
        self.tweets
            .get(tweet_id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.as_bytes(), encode(user)?)?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.users
            .get(user_id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn user_exists(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.users.contains_key(user_id.as_bytes())?)
    }

    pub fn like_count(&self, tweet_id: &str) -> Result<u64, AppError> {
        self.like_counts
            .get(tweet_id.as_bytes())?
            .map(|bytes| decode_count(&bytes))
            .unwrap_or(Ok(0))
    }

    pub fn has_liked(&self, user_id: &str, tweet_id: &str) -> Result<bool, AppError> {
        Ok(self.likes.contains_key(pair_key(user_id, tweet_id))?)
    }
}

pub fn decode<T: DeserializeOwned>(bytes: &IVec) -> Result<T, AppError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
    Ok(serde_json::to_vec(value)?)
}

/// Looks a tweet up from inside a transaction.
pub fn tweet_exists_tx(
    tweets: &TransactionalTree,
    tweet_id: &str,
) -> Result<bool, ConflictableTransactionError<AppError>> {
    Ok(tweets.get(tweet_id.as_bytes())?.is_some())
}

pub fn decode_count(bytes: &[u8]) -> Result<u64, AppError> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| AppError::Corrupt("like count is not 8 bytes".into()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Index key sorting by `(created_at, id)` ascending under byte order.
///
/// The timestamp is stored as big-endian milliseconds with the sign bit
/// flipped, so negative timestamps still sort before positive ones.
pub fn feed_key(created_at: &DateTime<Utc>, id: &str) -> Vec<u8> {
    let millis = (created_at.timestamp_millis() as u64) ^ (1 << 63);
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Key for an ordered pair of ids; the first id is length-prefixed so
/// distinct pairs never collide.
pub fn pair_key(first: &str, second: &str) -> Vec<u8> {
    let mut key = prefix_key(first);
    key.extend_from_slice(second.as_bytes());
    key
}

/// Prefix shared by every [`pair_key`] whose first id is `first`.
fn prefix_key(first: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + first.len());
    key.extend_from_slice(&(first.len() as u32).to_be_bytes());
    key.extend_from_slice(first.as_bytes());
    key
}
