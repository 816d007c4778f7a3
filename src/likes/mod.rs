use sled::{transaction::ConflictableTransactionError, Transactional};
use tracing::info;

use crate::{
    dtos::ToggleLike,
    error::AppError,
    store::{decode_count, pair_key, tweet_exists_tx, Store},
};

/// Flips whether `user_id` likes `tweet_id`.
///
/// The existence check and the write share one serializable transaction
/// over `tweets`, `likes` and `like_counts`; sled reruns it on conflict, so
/// two racing toggles by the same user leave at most one like behind and the
/// stored count never drifts from the like keys.
pub fn toggle_like(
    store: &Store,
    tweet_id: &str,
    user_id: &str,
) -> Result<ToggleLike, AppError> {
    let like_key = pair_key(user_id, tweet_id);

    let added_like = (&store.tweets, &store.likes, &store.like_counts).transaction(
        |(tweets, likes, like_counts)| {
            if !tweet_exists_tx(tweets, tweet_id)? {
                return Err(ConflictableTransactionError::Abort(AppError::NotFound(
                    format!("Tweet {tweet_id}"),
                )));
            }

            let count = match like_counts.get(tweet_id.as_bytes())? {
                Some(bytes) => {
                    decode_count(&bytes).map_err(ConflictableTransactionError::Abort)?
                }
                None => 0,
            };

            let (added, count) = if likes.remove(like_key.as_slice())?.is_some() {
                (false, count.saturating_sub(1))
            } else {
                likes.insert(like_key.as_slice(), &[] as &[u8])?;
                (true, count + 1)
            };

            if count == 0 {
                like_counts.remove(tweet_id.as_bytes())?;
            } else {
                like_counts.insert(tweet_id.as_bytes(), &count.to_be_bytes()[..])?;
            }
            Ok(added)
        },
    )?;

    info!("User {user_id} toggled like on {tweet_id}: added={added_like}");
    Ok(ToggleLike { added_like })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::models::Tweet;

    fn store_with_tweet() -> (Store, Tweet) {
        let store = Store::temporary().unwrap();
        let tweet = Tweet::new("like me".into(), "author".into());
        store.insert_tweet(&tweet).unwrap();
        (store, tweet)
    }

    #[test]
    fn first_toggle_adds_second_removes() {
        let (store, tweet) = store_with_tweet();

        let first = toggle_like(&store, &tweet.id, "alice").unwrap();
        assert!(first.added_like);
        assert!(store.has_liked("alice", &tweet.id).unwrap());
        assert_eq!(store.like_count(&tweet.id).unwrap(), 1);

        let second = toggle_like(&store, &tweet.id, "alice").unwrap();
        assert!(!second.added_like);
        assert!(!store.has_liked("alice", &tweet.id).unwrap());
        assert_eq!(store.like_count(&tweet.id).unwrap(), 0);
    }

    #[test]
    fn likes_from_different_users_are_counted_separately() {
        let (store, tweet) = store_with_tweet();
        toggle_like(&store, &tweet.id, "alice").unwrap();
        toggle_like(&store, &tweet.id, "bob").unwrap();
        assert_eq!(store.like_count(&tweet.id).unwrap(), 2);

        toggle_like(&store, &tweet.id, "alice").unwrap();
        assert_eq!(store.like_count(&tweet.id).unwrap(), 1);
        assert!(store.has_liked("bob", &tweet.id).unwrap());
    }

    #[test]
    fn count_is_kept_per_tweet() {
        let (store, tweet) = store_with_tweet();
        let other = Tweet::new("me too".into(), "author".into());
        store.insert_tweet(&other).unwrap();

        toggle_like(&store, &tweet.id, "alice").unwrap();
        toggle_like(&store, &other.id, "alice").unwrap();
        toggle_like(&store, &other.id, "bob").unwrap();
        assert_eq!(store.like_count(&tweet.id).unwrap(), 1);
        assert_eq!(store.like_count(&other.id).unwrap(), 2);

        toggle_like(&store, &tweet.id, "alice").unwrap();
        assert_eq!(store.like_count(&tweet.id).unwrap(), 0);
        assert!(!store.like_counts.contains_key(tweet.id.as_bytes()).unwrap());
    }

    #[test]
    fn missing_tweet_is_not_found_and_writes_nothing() {
        let store = Store::temporary().unwrap();
        let err = toggle_like(&store, "ghost", "alice").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.likes.is_empty());
        assert!(store.like_counts.is_empty());
    }

    #[test]
    fn concurrent_toggles_never_duplicate_a_like() {
        let (store, tweet) = store_with_tweet();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let tweet_id = tweet.id.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        toggle_like(&store, &tweet_id, "alice").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.likes.len() <= 1);
        assert_eq!(
            store.like_count(&tweet.id).unwrap() as usize,
            store.likes.len()
        );
    }
}
