//! Community feed and notifications.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use storeloom_core::PostId;
use url::Url;

use crate::error::Result;
use crate::feed::{Comment, FeedError, Notification, Post, UpvoteState};
use crate::middleware::RequireAccount;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewPostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_urls: Vec<Url>,
}

#[derive(Debug, Deserialize)]
pub struct NewCommentForm {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
    pub upvotes: usize,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub unread: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

/// POST /api/feed/posts
///
/// # Errors
///
/// Returns 422 for a post with neither text nor images.
pub async fn create_post(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Json(form): Json<NewPostForm>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = state
        .feed()
        .create_post(session.account_id, &form.text, form.image_urls)?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/feed/posts/{id}
///
/// # Errors
///
/// Returns 404 for unknown posts.
pub async fn show_post(
    State(state): State<AppState>,
    RequireAccount(_session): RequireAccount,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>> {
    let id = PostId::new(id);
    let feed = state.feed();
    let post = feed
        .post(&id)
        .ok_or_else(|| FeedError::PostNotFound(id.clone()))?;
    Ok(Json(PostResponse {
        upvotes: post.upvote_count(),
        comments: feed.comments(&id),
        post,
    }))
}

/// POST /api/feed/posts/{id}/upvote
///
/// # Errors
///
/// Returns 404 for unknown posts.
pub async fn toggle_upvote(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Path(id): Path<String>,
) -> Result<Json<UpvoteState>> {
    let upvote = state
        .feed()
        .toggle_upvote(&PostId::new(id), &session.account_id)?;
    Ok(Json(upvote))
}

/// POST /api/feed/posts/{id}/comments
///
/// # Errors
///
/// Returns 404 for unknown posts and 422 for empty comments.
pub async fn add_comment(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
    Path(id): Path<String>,
    Json(form): Json<NewCommentForm>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state
        .feed()
        .add_comment(&PostId::new(id), session.account_id, &form.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/notifications
pub async fn notifications(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
) -> Json<InboxResponse> {
    let center = state.feed().notifications();
    Json(InboxResponse {
        unread: center.unread_count(&session.account_id),
        notifications: center.inbox(&session.account_id),
    })
}

/// POST /api/notifications/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAccount(session): RequireAccount,
) -> Json<MarkReadResponse> {
    Json(MarkReadResponse {
        marked: state.feed().notifications().mark_all_read(&session.account_id),
    })
}
