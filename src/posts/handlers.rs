use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::services::AuthUser,
    error::ApiError,
    posts::repo::Post,
    state::AppState,
};

use super::dto::PostResponse;
use super::services::{can_mutate, collect_post_form, image_url, store_image};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs/", get(list_posts))
        .route("/blogs/:id/", get(get_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs/", post(create_post))
        .route("/blogs/:id/", put(update_post).delete(delete_post))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = Post::list(&state.db).await?;
    let mut items = Vec::with_capacity(posts.len());
    for post in posts {
        let image = image_url(&state, &post).await?;
        items.push(PostResponse::from_post(post, image));
    }
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Blog"))?;
    let image = image_url(&state, &post).await?;
    Ok(Json(PostResponse::from_post(post, image)))
}

/// POST /blogs/ (multipart): title, content, optional image. The author is
/// always the calling identity; nothing in the payload can set it.
#[instrument(skip(state, mp))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<PostResponse>), ApiError> {
    let form = collect_post_form(&mut mp).await?;
    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("title is required".into()))?;
    let content = form
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("content is required".into()))?;

    let post_id = Uuid::new_v4();
    let image_key = match form.image {
        Some((body, content_type)) => {
            Some(store_image(&state, user_id, post_id, body, &content_type).await?)
        }
        None => None,
    };

    let post = Post::create(
        &state.db,
        post_id,
        user_id,
        &title,
        &content,
        image_key.as_deref(),
    )
    .await?;
    info!(post_id = %post.id, author_id = %user_id, "post created");

    let image = image_url(&state, &post).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/blogs/{}/", post.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(PostResponse::from_post(post, image)),
    ))
}

/// PUT /blogs/:id/ (multipart): sparse update, owner only. Supplying an
/// image replaces the stored object; omitted fields keep their values.
#[instrument(skip(state, mp))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<PostResponse>, ApiError> {
    let existing = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Blog"))?;
    if !can_mutate(user_id, &existing) {
        warn!(post_id = %id, caller = %user_id, author = %existing.author_id, "update forbidden");
        return Err(ApiError::Forbidden);
    }

    let form = collect_post_form(&mut mp).await?;
    let new_image_key = match form.image {
        Some((body, content_type)) => {
            Some(store_image(&state, existing.author_id, id, body, &content_type).await?)
        }
        None => None,
    };

    let post = Post::update(
        &state.db,
        id,
        form.title.as_deref(),
        form.content.as_deref(),
        new_image_key.as_deref(),
    )
    .await?;

    // The replaced object is unreachable once the row points elsewhere.
    if new_image_key.is_some() {
        if let Some(old_key) = existing.image_key {
            if let Err(e) = state.storage.delete(&old_key).await {
                warn!(error = %e, key = %old_key, "failed to delete replaced image");
            }
        }
    }

    info!(post_id = %id, author_id = %user_id, "post updated");
    let image = image_url(&state, &post).await?;
    Ok(Json(PostResponse::from_post(post, image)))
}

/// DELETE /blogs/:id/, owner only.
#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let post = Post::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Blog"))?;
    if !can_mutate(user_id, &post) {
        warn!(post_id = %id, caller = %user_id, author = %post.author_id, "delete forbidden");
        return Err(ApiError::Forbidden);
    }

    Post::delete(&state.db, id).await?;
    if let Some(key) = post.image_key {
        if let Err(e) = state.storage.delete(&key).await {
            warn!(error = %e, key = %key, "failed to delete post image");
        }
    }

    info!(post_id = %id, author_id = %user_id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
