//! Newest-first feed with keyset pagination.
//!
//! Pages are read from the `feed` index in reverse key order, i.e. by
//! `(created_at desc, id desc)`. A cursor is the position of the last tweet
//! of the previous page; the next page starts strictly below it, so the
//! cursor stays valid even if that tweet is gone by the time it comes back.
use std::collections::HashMap;

use tracing::debug;

use crate::{
    config::Config,
    dtos::{FeedPage, FeedQuery, TweetView},
    error::AppError,
    models::{Cursor, Tweet, User},
    store::{feed_key, Store},
};

impl FeedQuery {
    /// Applies defaults and bounds, yielding the page size and cursor.
    pub fn resolve(self, config: &Config) -> Result<(usize, Option<Cursor>), AppError> {
        let limit = self.limit.unwrap_or(config.feed_default_limit);
        if limit == 0 {
            return Err(AppError::Validation("limit must be positive".into()));
        }
        if limit > config.feed_max_limit {
            return Err(AppError::Validation(format!(
                "limit must not exceed {}",
                config.feed_max_limit
            )));
        }

        let cursor = match (self.cursor_id, self.cursor_created_at) {
            (Some(_), Some(created_at))
                if created_at.timestamp_subsec_nanos() % 1_000_000 != 0 =>
            {
                return Err(AppError::Validation(
                    "cursorCreatedAt must have at most millisecond precision".into(),
                ))
            }
            (Some(id), Some(created_at)) => Some(Cursor { id, created_at }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "cursorId and cursorCreatedAt must be given together".into(),
                ))
            }
        };

        Ok((limit, cursor))
    }
}

pub fn fetch_page(
    store: &Store,
    viewer: Option<&str>,
    limit: usize,
    cursor: Option<&Cursor>,
) -> Result<FeedPage, AppError> {
    if limit == 0 {
        return Err(AppError::Validation("limit must be positive".into()));
    }

    let rows = match cursor {
        Some(cursor) => store.feed.range(..feed_key(&cursor.created_at, &cursor.id)),
        None => store.feed.iter(),
    };

    // One extra row tells us whether another page exists.
    let mut tweets: Vec<Tweet> = Vec::with_capacity(limit + 1);
    for row in rows.rev().take(limit + 1) {
        let (_, tweet_id) = row?;
        let tweet_id = String::from_utf8_lossy(&tweet_id);
        let tweet = store.get_tweet(&tweet_id)?.ok_or_else(|| {
            AppError::Corrupt(format!("feed index points at missing tweet {tweet_id}"))
        })?;
        tweets.push(tweet);
    }

    let next_cursor = if tweets.len() > limit {
        tweets.truncate(limit);
        tweets.last().map(Tweet::cursor)
    } else {
        None
    };

    let mut authors: HashMap<String, User> = HashMap::new();
    let mut views = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        let user = match authors.get(&tweet.user_id) {
            Some(user) => user.clone(),
            None => {
                let user = store
                    .get_user(&tweet.user_id)?
                    .unwrap_or_else(|| User::unknown(&tweet.user_id));
                authors.insert(tweet.user_id.clone(), user.clone());
                user
            }
        };
        let liked_by_me = match viewer {
            Some(viewer) => store.has_liked(viewer, &tweet.id)?,
            None => false,
        };

        views.push(TweetView {
            like_count: store.like_count(&tweet.id)?,
            liked_by_me,
            user,
            id: tweet.id,
            content: tweet.content,
            created_at: tweet.created_at,
        });
    }

    debug!(
        "Fetched {} tweets, more: {}",
        views.len(),
        next_cursor.is_some()
    );
    Ok(FeedPage {
        tweets: views,
        next_cursor,
    })
}
