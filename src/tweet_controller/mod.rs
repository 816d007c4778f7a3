use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    auth::CurrentUser,
    dtos::{self, FeedPage, FeedQuery},
    error::AppError,
    extract::{JsonBody, PathParam, QueryParams},
    feed, likes,
    models::Tweet,
    state::AppState,
    store::Store,
};

pub async fn feed(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let (limit, cursor) = query.resolve(&state.config)?;
    let page = feed::fetch_page(&state.store, user.id(), limit, cursor.as_ref())?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(dto): JsonBody<dtos::CreateTweet>,
) -> Result<(StatusCode, Json<Tweet>), AppError> {
    let user_id = user.require()?;
    let tweet = create_tweet(
        &state.store,
        dto.content,
        user_id,
        state.config.tweet_max_length,
    )?;
    Ok((StatusCode::CREATED, Json(tweet)))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(tweet_id): PathParam<String>,
) -> Result<Json<dtos::ToggleLike>, AppError> {
    let user_id = user.require()?;
    let result = likes::toggle_like(&state.store, &tweet_id, &user_id)?;
    Ok(Json(result))
}

pub fn create_tweet(
    store: &Store,
    content: String,
    user_id: String,
    max_length: usize,
) -> Result<Tweet, AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("content must not be empty".into()));
    }
    if content.chars().count() > max_length {
        return Err(AppError::Validation(format!(
            "content must be at most {max_length} characters"
        )));
    }
    if !store.user_exists(&user_id)? {
        return Err(AppError::NotFound(format!("User {user_id}")));
    }

    let tweet = Tweet::new(content, user_id);
    store.insert_tweet(&tweet)?;
    info!("User {} created tweet {}", tweet.user_id, tweet.id);

    Ok(tweet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn store_with_author() -> Store {
        let store = Store::temporary().unwrap();
        store
            .upsert_user(&User {
                id: "alice".into(),
                name: Some("Alice".into()),
                image: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn creates_and_indexes_tweet() {
        let store = store_with_author();
        let tweet = create_tweet(&store, "hello world".into(), "alice".into(), 280).unwrap();

        assert_eq!(tweet.content, "hello world");
        assert_eq!(tweet.user_id, "alice");
        assert_eq!(store.get_tweet(&tweet.id).unwrap(), Some(tweet.clone()));

        let page = feed::fetch_page(&store, None, 10, None).unwrap();
        assert_eq!(page.tweets[0].id, tweet.id);
    }

    #[test]
    fn blank_content_is_invalid() {
        let store = store_with_author();
        for content in ["", "   ", "\n\t"] {
            assert!(matches!(
                create_tweet(&store, content.into(), "alice".into(), 280),
                Err(AppError::Validation(_))
            ));
        }
        assert!(store.tweets.is_empty());
    }

    #[test]
    fn overlong_content_is_invalid() {
        let store = store_with_author();
        assert!(create_tweet(&store, "é".repeat(5), "alice".into(), 5).is_ok());
        assert!(matches!(
            create_tweet(&store, "é".repeat(6), "alice".into(), 5),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_author_is_not_found() {
        let store = Store::temporary().unwrap();
        assert!(matches!(
            create_tweet(&store, "hi".into(), "ghost".into(), 280),
            Err(AppError::NotFound(_))
        ));
    }
}
