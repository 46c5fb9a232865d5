//! Reader-facing blog pages.
//!
//! Every page answers with an `ApiResponse` wrapping the page document.
//! Form submissions that fail validation are still `200 OK`; the document
//! carries the submitted values and per-field errors.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Deserialize;
use uuid::Uuid;

use blog_core::forms::{CommentForm, EmailPostForm};
use blog_shared::ApiResponse;

use crate::config::SiteConfig;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// `?page=` is kept raw; the paginator clamps anything unusable.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SidebarParams {
    pub latest: Option<u64>,
    pub most_commented: Option<u64>,
}

/// Scheme and authority for links in outgoing mail. Only the configured
/// site URL or an allowed `Host` header is used.
fn site_root(req: &HttpRequest, site: &SiteConfig) -> AppResult<String> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| req.uri().authority().map(|authority| authority.as_str()));

    site.root(host, req.app_config().secure()).ok_or_else(|| {
        tracing::warn!(host = host.unwrap_or(""), "Rejected untrusted Host header");
        AppError::BadRequest("Invalid Host header".to_string())
    })
}

/// GET /blog
pub async fn post_list(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let page = state.blog.list_posts(None, query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// GET /blog/tag/{tag_slug}
pub async fn post_list_by_tag(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let tag_slug = path.into_inner();
    let page = state
        .blog
        .list_posts(Some(&tag_slug), query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// GET /blog/{year}/{month}/{day}/{slug}
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<(i32, u32, u32, String)>,
) -> AppResult<HttpResponse> {
    let (year, month, day, slug) = path.into_inner();
    let detail = state.blog.post_detail(year, month, day, &slug).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(detail)))
}

/// GET /blog/{post_id}/share
pub async fn share_form(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let view = state.blog.share_form(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

/// POST /blog/{post_id}/share
pub async fn share_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Form<EmailPostForm>,
) -> AppResult<HttpResponse> {
    let root = site_root(&req, &state.site)?;
    let view = state
        .blog
        .share_post(path.into_inner(), form.into_inner(), &root)
        .await?;

    let response = if view.sent {
        ApiResponse::ok_with_message(view, "Post shared")
    } else {
        ApiResponse::ok(view)
    };
    Ok(HttpResponse::Ok().json(response))
}

/// POST /blog/{post_id}/comment
pub async fn post_comment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let outcome = state
        .blog
        .add_comment(path.into_inner(), form.into_inner())
        .await?;

    let response = if outcome.comment.is_some() {
        ApiResponse::ok_with_message(outcome, "Comment added")
    } else {
        ApiResponse::ok(outcome)
    };
    Ok(HttpResponse::Ok().json(response))
}

/// GET /blog/search?query=
pub async fn post_search(
    state: web::Data<AppState>,
    query: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    let view = state.blog.search(query.into_inner().query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

/// GET /blog/sidebar?latest=&most_commented=
pub async fn sidebar(
    state: web::Data<AppState>,
    query: web::Query<SidebarParams>,
) -> AppResult<HttpResponse> {
    let params = query.into_inner();
    let widgets = state
        .blog
        .sidebar(params.latest, params.most_commented)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(widgets)))
}
