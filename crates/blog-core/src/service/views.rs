//! Page documents produced by the services. They are what the HTTP layer
//! serializes in place of rendered templates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, Tag};
use crate::forms::{CommentForm, EmailPostForm, FormErrors, SearchForm};
use crate::query::Page;

/// A post as shown to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author: Option<String>,
    pub publish: DateTime<Utc>,
    pub url: String,
    pub tags: Vec<Tag>,
    /// Full body on detail pages, an excerpt elsewhere.
    pub body_html: String,
}

/// Title and location of a post, for sidebars and recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostLink {
    pub id: Uuid,
    pub title: String,
    pub publish: DateTime<Utc>,
    pub url: String,
}

impl From<&Post> for PostLink {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            publish: post.publish,
            url: post.absolute_path(),
        }
    }
}

/// A public comment. The email address is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            name: comment.name.clone(),
            body: comment.body.clone(),
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostListPage {
    pub tag: Option<Tag>,
    pub posts: Page<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarLink {
    #[serde(flatten)]
    pub post: PostLink,
    pub same_tags: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub comment_form: CommentForm,
    pub similar_posts: Vec<SimilarLink>,
}

/// State of the share form after a GET or POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareView {
    pub post: PostLink,
    pub form: EmailPostForm,
    pub errors: FormErrors,
    pub sent: bool,
}

/// Result of a comment submission: either the stored comment or the
/// rejected form with its errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentOutcome {
    pub post: PostLink,
    pub form: CommentForm,
    pub errors: FormErrors,
    pub comment: Option<CommentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub post: PostView,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub query: Option<String>,
    pub form: SearchForm,
    pub errors: FormErrors,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentedLink {
    #[serde(flatten)]
    pub post: PostLink,
    pub total_comments: u64,
}

/// Widgets shown next to every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sidebar {
    pub total_posts: u64,
    pub latest_posts: Vec<PostLink>,
    pub most_commented: Vec<CommentedLink>,
}

/// A post as shown in the editorial API, raw body included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorialPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PostStatus,
    pub publish: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub url: String,
}

impl EditorialPost {
    pub fn new(post: Post, tags: &[Tag]) -> Self {
        Self {
            url: post.absolute_path(),
            tags: tags.iter().map(|t| t.name.clone()).collect(),
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            slug: post.slug,
            body: post.body,
            status: post.status,
            publish: post.publish,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
