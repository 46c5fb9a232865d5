//! Editorial API: post management and comment moderation. Staff only.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use blog_core::domain::PostStatus;
use blog_core::service::{CommentQuery, PostChanges, PostDraft, PostQuery};
use blog_shared::ApiResponse;
use blog_shared::dto::{
    CreatePostRequest, ModerateCommentRequest, PostStatusDto, UpdatePostRequest,
};

use crate::middleware::auth::Staff;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn status(dto: PostStatusDto) -> PostStatus {
    match dto {
        PostStatusDto::Draft => PostStatus::Draft,
        PostStatusDto::Published => PostStatus::Published,
    }
}

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    pub status: Option<PostStatusDto>,
    pub author: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub active: Option<bool>,
    pub q: Option<String>,
    pub page: Option<String>,
}

/// GET /api/admin/posts
pub async fn list_posts(
    _staff: Staff,
    state: web::Data<AppState>,
    query: web::Query<PostListParams>,
) -> AppResult<HttpResponse> {
    let params = query.into_inner();
    let page = state
        .blog
        .editorial_posts(PostQuery {
            status: params.status.map(status),
            author_id: params.author,
            q: params.q,
            page: params.page,
        })
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// GET /api/admin/posts/{id}
pub async fn get_post(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.blog.editorial_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// POST /api/admin/posts
pub async fn create_post(
    Staff(identity): Staff,
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let draft = PostDraft {
        title: req.title,
        slug: req.slug,
        body: req.body,
        status: req.status.map(status),
        publish: req.publish,
        tags: req.tags,
    };

    let post = state.blog.create_post(identity.user_id, draft).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// PATCH /api/admin/posts/{id}
pub async fn update_post(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = PostChanges {
        title: req.title,
        slug: req.slug,
        body: req.body,
        status: req.status.map(status),
        publish: req.publish,
        tags: req.tags,
    };

    let post = state.blog.update_post(path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// DELETE /api/admin/posts/{id}
pub async fn delete_post(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.blog.delete_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::empty("Post deleted")))
}

/// GET /api/admin/comments
pub async fn list_comments(
    _staff: Staff,
    state: web::Data<AppState>,
    query: web::Query<CommentListParams>,
) -> AppResult<HttpResponse> {
    let params = query.into_inner();
    let page = state
        .blog
        .editorial_comments(CommentQuery {
            active: params.active,
            q: params.q,
            page: params.page,
        })
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// PATCH /api/admin/comments/{id}
pub async fn moderate_comment(
    _staff: Staff,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ModerateCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .blog
        .set_comment_active(path.into_inner(), body.active)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment)))
}
