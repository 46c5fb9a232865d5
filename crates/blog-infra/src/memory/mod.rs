//! In-memory content store - used when no database is configured, and by
//! tests. Data is lost on process restart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use blog_core::domain::{Comment, Post, Tag, User};
use blog_core::error::RepoError;
use blog_core::ports::{
    BaseRepository, CommentFilter, CommentRepository, CommentedPost, PostFilter, PostOrder,
    PostRepository, ScoredPost, SimilarPost, TagRepository, UserRepository, Window,
};
use blog_core::query::{rank_by_comments, rank_by_title, rank_similar};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    tags: HashMap<Uuid, Tag>,
    post_tags: HashMap<Uuid, Vec<Uuid>>,
}

impl State {
    fn tag_ids(&self, post_id: Uuid) -> &[Uuid] {
        self.post_tags
            .get(&post_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn matching_posts(&self, filter: &PostFilter, order: PostOrder) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| filter.matches(post, self.tag_ids(post.id)))
            .collect();

        match order {
            PostOrder::Newest => {
                posts.sort_by(|a, b| b.publish.cmp(&a.publish).then(a.id.cmp(&b.id)))
            }
            PostOrder::Editorial => posts.sort_by(|a, b| {
                a.status
                    .cmp(&b.status)
                    .then(a.publish.cmp(&b.publish))
                    .then(a.id.cmp(&b.id))
            }),
        }
        posts
    }

    fn matching_comments(&self, filter: &CommentFilter) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| filter.matches(c))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
    }
}

/// Every repository port over one shared, lock-guarded state.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryBlogStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryBlogStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|other| other.id != user.id && other.email == user.email);
        if taken {
            return Err(RepoError::Constraint("Email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.users.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryBlogStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryBlogStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        self.state.write().await.posts.insert(post.id, post.clone());
        Ok(post)
    }

    /// Removes the post together with its comments and tag links.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|_, c| c.post_id != id);
        state.post_tags.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryBlogStore {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state.matching_posts(filter, PostOrder::Newest).len() as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        window: Window,
    ) -> Result<Vec<Post>, RepoError> {
        let state = self.state.read().await;
        let posts = state
            .matching_posts(filter, order)
            .into_iter()
            .cloned()
            .collect();
        Ok(window.apply(posts))
    }

    async fn find_by_date_and_slug(
        &self,
        filter: &PostFilter,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let state = self.state.read().await;
        Ok(state
            .matching_posts(filter, PostOrder::Newest)
            .into_iter()
            .find(|p| p.slug == slug && p.publish >= start && p.publish < end)
            .cloned())
    }

    async fn find_similar(
        &self,
        post_id: Uuid,
        tag_ids: &[Uuid],
        limit: u64,
    ) -> Result<Vec<SimilarPost>, RepoError> {
        let state = self.state.read().await;
        let candidates = state
            .posts
            .values()
            .map(|post| (post, state.tag_ids(post.id)));
        Ok(rank_similar(post_id, tag_ids, candidates, limit))
    }

    async fn search_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<ScoredPost>, RepoError> {
        let state = self.state.read().await;
        Ok(rank_by_title(state.posts.values(), query, threshold))
    }

    async fn most_commented(&self, limit: u64) -> Result<Vec<CommentedPost>, RepoError> {
        let state = self.state.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for comment in state.comments.values() {
            *counts.entry(comment.post_id).or_default() += 1;
        }
        let posts = state
            .posts
            .values()
            .map(|post| (post, counts.get(&post.id).copied().unwrap_or(0)));
        Ok(rank_by_comments(posts, limit))
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryBlogStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint(format!(
                "comment references missing post {}",
                comment.post_id
            )));
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.comments.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryBlogStore {
    async fn count(&self, filter: &CommentFilter) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state.matching_comments(filter).len() as u64)
    }

    async fn list(
        &self,
        filter: &CommentFilter,
        window: Window,
    ) -> Result<Vec<Comment>, RepoError> {
        let state = self.state.read().await;
        let comments = state
            .matching_comments(filter)
            .into_iter()
            .cloned()
            .collect();
        Ok(window.apply(comments))
    }
}

#[async_trait]
impl BaseRepository<Tag, Uuid> for InMemoryBlogStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>, RepoError> {
        Ok(self.state.read().await.tags.get(&id).cloned())
    }

    async fn save(&self, tag: Tag) -> Result<Tag, RepoError> {
        let mut state = self.state.write().await;
        let clash = state
            .tags
            .values()
            .any(|other| other.id != tag.id && (other.name == tag.name || other.slug == tag.slug));
        if clash {
            return Err(RepoError::Constraint(format!("tag '{}' already exists", tag.name)));
        }
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.tags.remove(&id).ok_or(RepoError::NotFound)?;
        for tag_ids in state.post_tags.values_mut() {
            tag_ids.retain(|t| *t != id);
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryBlogStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let state = self.state.read().await;
        Ok(state.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError> {
        let state = self.state.read().await;
        Ok(state.tags.values().find(|t| t.name == name).cloned())
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .map(|post_id| {
                let mut tags: Vec<Tag> = state
                    .tag_ids(*post_id)
                    .iter()
                    .filter_map(|id| state.tags.get(id).cloned())
                    .collect();
                tags.sort_by(|a, b| a.name.cmp(&b.name));
                (*post_id, tags)
            })
            .collect())
    }

    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        if let Some(missing) = tag_ids.iter().find(|id| !state.tags.contains_key(*id)) {
            return Err(RepoError::Constraint(format!("unknown tag {missing}")));
        }
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = tag_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        state.post_tags.insert(post_id, unique);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
