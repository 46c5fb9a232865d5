//! Editorial operations: post management and comment moderation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::BlogService;
use super::views::EditorialPost;
use crate::domain::{Comment, Post, PostStatus, Tag, is_valid_slug};
use crate::error::DomainError;
use crate::ports::{BaseRepository, CommentFilter, PostFilter, PostOrder};
use crate::query::{Page, Paginator};

const TITLE_MAX: usize = 250;
const SLUG_MAX: usize = 250;

/// Fields for a new post. `slug` falls back to the slugified title.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub status: Option<PostStatus>,
    pub publish: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    pub publish: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    pub author_id: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub active: Option<bool>,
    pub q: Option<String>,
    pub page: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_post(post: &Post) -> Result<(), DomainError> {
    if post.title.trim().is_empty() {
        return Err(DomainError::Validation("title is required".into()));
    }
    if post.title.chars().count() > TITLE_MAX {
        return Err(DomainError::Validation(format!(
            "title must be at most {TITLE_MAX} characters"
        )));
    }
    if !is_valid_slug(&post.slug) {
        return Err(DomainError::Validation(
            "slug must contain only letters, numbers, hyphens or underscores".into(),
        ));
    }
    if post.slug.len() > SLUG_MAX {
        return Err(DomainError::Validation(format!(
            "slug must be at most {SLUG_MAX} characters"
        )));
    }
    if post.body.trim().is_empty() {
        return Err(DomainError::Validation("body is required".into()));
    }
    Ok(())
}

impl BlogService {
    /// All posts ordered by status then publish date, with editorial filters.
    pub async fn editorial_posts(
        &self,
        query: PostQuery,
    ) -> Result<Page<EditorialPost>, DomainError> {
        let filter = PostFilter {
            status: query.status,
            tag_id: None,
            author_id: query.author_id,
            text: non_blank(query.q),
        };

        let paginator = Paginator::new(self.settings.editorial_per_page);
        let count = self.posts.count(&filter).await?;
        let request = paginator.resolve(count, query.page.as_deref());
        let posts = self
            .posts
            .list(&filter, PostOrder::Editorial, request.window)
            .await?;

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut tags = self.tags_of(&ids).await?;
        let rows = posts
            .into_iter()
            .map(|post| {
                let post_tags = tags.remove(&post.id).unwrap_or_default();
                EditorialPost::new(post, &post_tags)
            })
            .collect();

        Ok(Page::new(request, rows))
    }

    pub async fn editorial_post(&self, id: Uuid) -> Result<EditorialPost, DomainError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        let tags = self.tags_of(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(EditorialPost::new(post, &tags))
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        draft: PostDraft,
    ) -> Result<EditorialPost, DomainError> {
        let mut post = Post::new(author_id, draft.title.trim().to_string(), draft.body);
        if let Some(slug) = non_blank(draft.slug) {
            post.slug = slug;
        }
        if let Some(status) = draft.status {
            post.status = status;
        }
        if let Some(publish) = draft.publish {
            post.publish = publish;
        }

        validate_post(&post)?;
        self.ensure_unique_slug(&post).await?;

        let saved = self.posts.save(post).await?;
        let tags = self.resolve_tags(&draft.tags).await?;
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        self.tags.set_post_tags(saved.id, &tag_ids).await?;

        tracing::info!(post_id = %saved.id, slug = %saved.slug, status = saved.status.label(), "Post created");

        Ok(EditorialPost::new(saved, &tags))
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<EditorialPost, DomainError> {
        let mut post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))?;

        if let Some(title) = changes.title {
            post.title = title.trim().to_string();
        }
        if let Some(slug) = changes.slug {
            post.slug = slug.trim().to_string();
        }
        if let Some(body) = changes.body {
            post.body = body;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        if let Some(publish) = changes.publish {
            post.publish = publish;
        }
        post.touch();

        validate_post(&post)?;
        self.ensure_unique_slug(&post).await?;

        let saved = self.posts.save(post).await?;
        let tags = match changes.tags {
            Some(names) => {
                let tags = self.resolve_tags(&names).await?;
                let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
                self.tags.set_post_tags(saved.id, &tag_ids).await?;
                tags
            }
            None => self.tags_of(&[id]).await?.remove(&id).unwrap_or_default(),
        };

        tracing::info!(post_id = %saved.id, status = saved.status.label(), "Post updated");

        Ok(EditorialPost::new(saved, &tags))
    }

    /// Delete a post; its comments and tag links go with it.
    pub async fn delete_post(&self, id: Uuid) -> Result<(), DomainError> {
        self.posts.delete(id).await.map_err(|err| match err {
            crate::error::RepoError::NotFound => DomainError::not_found("Post", id),
            other => other.into(),
        })?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn editorial_comments(
        &self,
        query: CommentQuery,
    ) -> Result<Page<Comment>, DomainError> {
        let filter = CommentFilter {
            post_id: None,
            active: query.active,
            text: non_blank(query.q),
        };

        let paginator = Paginator::new(self.settings.editorial_per_page);
        let count = self.comments.count(&filter).await?;
        let request = paginator.resolve(count, query.page.as_deref());
        let comments = self.comments.list(&filter, request.window).await?;

        Ok(Page::new(request, comments))
    }

    /// Show or hide a comment on the public pages.
    pub async fn set_comment_active(&self, id: Uuid, active: bool) -> Result<Comment, DomainError> {
        let mut comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", id))?;

        comment.active = active;
        comment.updated_at = Utc::now();
        let saved = self.comments.save(comment).await?;

        tracing::info!(comment_id = %id, active, "Comment moderated");
        Ok(saved)
    }

    /// Slugs are unique per publish date, not globally.
    async fn ensure_unique_slug(&self, post: &Post) -> Result<(), DomainError> {
        let clash = self
            .posts
            .find_by_date_and_slug(&PostFilter::all(), post.publish_date(), &post.slug)
            .await?;

        match clash {
            Some(other) if other.id != post.id => Err(DomainError::Duplicate(format!(
                "a post with slug '{}' is already published on {}",
                post.slug,
                post.publish_date()
            ))),
            _ => Ok(()),
        }
    }

    /// Look up tags by name, creating missing ones with a free slug.
    async fn resolve_tags(&self, names: &[String]) -> Result<Vec<Tag>, DomainError> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if !seen.insert(name.to_string()) {
                continue;
            }
            let tag = match self.tags.find_by_name(name).await? {
                Some(tag) => tag,
                None => {
                    let mut tag = Tag::new(name);
                    tag.slug = self.free_tag_slug(&tag.slug).await?;
                    self.tags.save(tag).await?
                }
            };
            tags.push(tag);
        }

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn free_tag_slug(&self, base: &str) -> Result<String, DomainError> {
        let base = if base.is_empty() {
            "tag".to_string()
        } else {
            base.to_string()
        };

        if self.tags.find_by_slug(&base).await?.is_none() {
            return Ok(base);
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.tags.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}
