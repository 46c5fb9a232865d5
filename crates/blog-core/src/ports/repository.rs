use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, Tag, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Which posts a query may see.
///
/// Public pages always go through [`PostFilter::published`]; the editorial
/// API builds unrestricted filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub tag_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Case-insensitive substring of title or body.
    pub text: Option<String>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Self::default()
        }
    }

    pub fn tagged(mut self, tag_id: Uuid) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    /// In-process evaluation, shared by stores that filter in memory.
    pub fn matches(&self, post: &Post, post_tags: &[Uuid]) -> bool {
        if self.status.is_some_and(|status| post.status != status) {
            return false;
        }
        if self.author_id.is_some_and(|author| post.author_id != author) {
            return false;
        }
        if self.tag_id.is_some_and(|tag| !post_tags.contains(&tag)) {
            return false;
        }
        match &self.text {
            Some(text) => {
                let needle = text.to_lowercase();
                post.title.to_lowercase().contains(&needle)
                    || post.body.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Sort keys for post listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrder {
    /// Most recently published first.
    #[default]
    Newest,
    /// Status, then oldest publish date first.
    Editorial,
}

/// Offset/limit slice of an ordered result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset as usize);
        match self.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }
}

/// A post recommended for sharing tags with another one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPost {
    pub post: Post,
    pub same_tags: u64,
}

/// A search hit with its trigram similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPost {
    pub post: Post,
    pub similarity: f32,
}

/// A post annotated with its total comment count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentedPost {
    pub post: Post,
    pub total_comments: u64,
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Post repository - the query layer over stored posts.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        window: Window,
    ) -> Result<Vec<Post>, RepoError>;

    /// Find a post by slug on the given UTC publish date.
    async fn find_by_date_and_slug(
        &self,
        filter: &PostFilter,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError>;

    /// Published posts sharing at least one of `tag_ids`, excluding
    /// `post_id`, ordered by shared tags then recency.
    async fn find_similar(
        &self,
        post_id: Uuid,
        tag_ids: &[Uuid],
        limit: u64,
    ) -> Result<Vec<SimilarPost>, RepoError>;

    /// Published posts whose title similarity to `query` is strictly
    /// above `threshold`, best match first.
    async fn search_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<ScoredPost>, RepoError>;

    /// Published posts by ascending total comment count.
    async fn most_commented(&self, limit: u64) -> Result<Vec<CommentedPost>, RepoError>;
}

/// Filter for the moderation listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
    pub active: Option<bool>,
    /// Case-insensitive substring of name, email or body.
    pub text: Option<String>,
}

impl CommentFilter {
    pub fn matches(&self, comment: &Comment) -> bool {
        if self.post_id.is_some_and(|post| comment.post_id != post) {
            return false;
        }
        if self.active.is_some_and(|active| comment.active != active) {
            return false;
        }
        match &self.text {
            Some(text) => {
                let needle = text.to_lowercase();
                [&comment.name, &comment.email, &comment.body]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Comment repository. Listings are ordered oldest first.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    async fn count(&self, filter: &CommentFilter) -> Result<u64, RepoError>;

    async fn list(&self, filter: &CommentFilter, window: Window)
    -> Result<Vec<Comment>, RepoError>;
}

/// Tag repository and the post/tag association.
#[async_trait]
pub trait TagRepository: BaseRepository<Tag, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError>;

    /// Tags of each requested post, sorted by name.
    async fn tags_for_posts(&self, post_ids: &[Uuid])
    -> Result<HashMap<Uuid, Vec<Tag>>, RepoError>;

    /// Replace the tag set of a post.
    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;
}
