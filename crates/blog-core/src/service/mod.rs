//! Application services: the reader-facing pages and forms, and the
//! editorial operations behind the admin API.

mod editorial;
mod reader;
mod views;

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Post, Tag};
use crate::error::{DomainError, RepoError};
use crate::markdown;
use crate::ports::{
    BaseRepository, CommentRepository, Mailer, PostRepository, TagRepository, UserRepository,
};
use crate::query::Paginator;

pub use editorial::{CommentQuery, PostChanges, PostDraft, PostQuery};
pub use views::{
    CommentOutcome, CommentView, CommentedLink, EditorialPost, PostDetail, PostLink,
    PostListPage, PostView, SearchHit, SearchView, ShareView, SimilarLink, Sidebar,
};

/// Tunables for the blog pages.
#[derive(Debug, Clone)]
pub struct BlogSettings {
    /// Posts per public list page.
    pub posts_per_page: u64,
    /// Rows per editorial list page.
    pub editorial_per_page: u64,
    /// Sender address for shared-post emails.
    pub mail_from: String,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            posts_per_page: 3,
            editorial_per_page: 20,
            mail_from: "noreply@localhost".to_string(),
        }
    }
}

/// Repositories and transports the services run against.
#[derive(Clone)]
pub struct BlogPorts {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
}

/// Entry point for every blog operation.
pub struct BlogService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    tags: Arc<dyn TagRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    settings: BlogSettings,
}

#[derive(Debug, Clone, Copy)]
enum Body {
    Full,
    Excerpt,
}

impl BlogService {
    pub fn new(ports: BlogPorts, settings: BlogSettings) -> Self {
        Self {
            posts: ports.posts,
            comments: ports.comments,
            tags: ports.tags,
            users: ports.users,
            mailer: ports.mailer,
            settings,
        }
    }

    pub fn settings(&self) -> &BlogSettings {
        &self.settings
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(self.settings.posts_per_page)
    }

    /// Load a post that readers may see; drafts count as missing.
    async fn published_post(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .filter(Post::is_published)
            .ok_or_else(|| DomainError::not_found("Post", id))
    }

    async fn tags_of(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.tags.tags_for_posts(post_ids).await
    }

    /// Attach author names and tags to `posts` in two batched lookups.
    async fn present(&self, posts: Vec<Post>, body: Body) -> Result<Vec<PostView>, RepoError> {
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut tags = self.tags_of(&ids).await?;

        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<Uuid, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.users
                .find_by_ids(&author_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        Ok(posts
            .into_iter()
            .map(|post| {
                let body_html = match body {
                    Body::Full => markdown::render(&post.body),
                    Body::Excerpt => markdown::excerpt(&post.body),
                };
                PostView {
                    url: post.absolute_path(),
                    author: authors.get(&post.author_id).cloned(),
                    tags: tags.remove(&post.id).unwrap_or_default(),
                    id: post.id,
                    title: post.title,
                    slug: post.slug,
                    publish: post.publish,
                    body_html,
                }
            })
            .collect())
    }
}

/// `a***@example.com` - keeps addresses out of logs.
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.chars().count() > 1 => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}
