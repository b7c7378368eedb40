use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::{
        comment::{Comment, CommentWithAuthor},
        post::{Post, PostWithAuthor},
    },
    repositories::{comment as comment_repo, like as like_repo, post as post_repo},
    services::media,
    state::AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Pagination for the post feed.
#[derive(Deserialize)]
pub struct PostsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Turns a 1-based page into a row offset. Saturates instead of
/// overflowing, so an absurd caller-supplied page cannot panic or wrap
/// into a negative `OFFSET`.
fn page_offset(page: i64, limit: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(limit)
}

/// The request payload for creating a comment.
#[derive(Deserialize, Validate)]
pub struct CommentRequest {
    #[garde(skip)]
    pub post_id: i64,
    #[garde(length(min = 1, max = 1000))]
    pub content: String,
}

/// The request payload for the like toggle.
#[derive(Deserialize)]
pub struct LikeRequest {
    pub post_id: i64,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub message: String,
    pub data: Post,
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub message: String,
    pub data: Vec<PostWithAuthor>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub message: String,
    pub data: Comment,
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub message: String,
    pub data: Vec<CommentWithAuthor>,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
    pub like_count: i64,
}

/// Creates a post from multipart input: `content` text and/or a `media`
/// file. Media is sniffed against the attachment allow-list before it
/// is stored.
#[axum::debug_handler]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut content: Option<String> = None;
    let mut media_url: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "content" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                if !text.trim().is_empty() {
                    content = Some(text);
                }
            }
            "media" => {
                let filename = field.file_name().unwrap_or("media").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                media::check_post_media(&bytes)?;
                media_url = Some(state.media.store(&filename, &bytes).await?);
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field: {}", other);
            }
        }
    }

    if content.is_none() && media_url.is_none() {
        return Err(AppError::Validation(
            "Content or media file is required".to_string(),
        ));
    }

    let post = post_repo::insert_post(
        &state.db,
        &auth.id,
        content.as_deref(),
        media_url.as_deref(),
    )
    .await?;

    tracing::info!("✅ Post {} created by {}", post.id, auth.id);

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            message: "Post created successfully".to_string(),
            data: post,
        }),
    ))
}

/// Lists the post feed, newest first.
#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = page_offset(query.page, limit);

    let posts = post_repo::list_posts(&state.db, limit, offset).await?;

    Ok(Json(PostsResponse {
        message: "Posts fetched successfully".to_string(),
        data: posts,
    }))
}

/// Creates a comment and notifies the post owner.
#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let owner = post_repo::post_owner(&state.db, payload.post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comment = comment_repo::insert_comment(
        &state.db,
        payload.post_id,
        &auth.id,
        &owner,
        &payload.content,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment created successfully".to_string(),
            data: comment,
        }),
    ))
}

/// Lists a post's comments, oldest first.
#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    post_repo::post_owner(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comments = comment_repo::list_for_post(&state.db, post_id).await?;

    Ok(Json(CommentsResponse {
        message: "Comments fetched successfully".to_string(),
        data: comments,
    }))
}

/// Toggles the caller's like on a post.
#[axum::debug_handler]
pub async fn like_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<LikeRequest>,
) -> Result<impl IntoResponse> {
    let owner = post_repo::post_owner(&state.db, payload.post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let result = like_repo::toggle(&state.db, payload.post_id, &auth.id, &owner).await?;

    Ok(Json(LikeResponse {
        message: if result.liked {
            "Post liked".to_string()
        } else {
            "Post unliked".to_string()
        },
        liked: result.liked,
        like_count: result.like_count,
    }))
}
