use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use super::trigram;
use crate::domain::Post;
use crate::ports::{CommentedPost, ScoredPost, SimilarPost};

/// Recommendations shown under a post.
pub const SIMILAR_POSTS_LIMIT: u64 = 4;

/// Search keeps titles scoring strictly above this.
pub const SEARCH_SIMILARITY_THRESHOLD: f32 = 0.1;

/// Rank `candidates` by how many tags they share with `tag_ids`.
///
/// Only published posts other than `post_id` sharing at least one tag
/// qualify. Ordered by shared count, then most recent publish date.
pub fn rank_similar<'a>(
    post_id: Uuid,
    tag_ids: &[Uuid],
    candidates: impl IntoIterator<Item = (&'a Post, &'a [Uuid])>,
    limit: u64,
) -> Vec<SimilarPost> {
    let wanted: HashSet<&Uuid> = tag_ids.iter().collect();

    let mut ranked: Vec<SimilarPost> = candidates
        .into_iter()
        .filter(|(post, _)| post.id != post_id && post.is_published())
        .filter_map(|(post, tags)| {
            let same_tags = tags.iter().filter(|t| wanted.contains(t)).count() as u64;
            (same_tags > 0).then(|| SimilarPost {
                post: post.clone(),
                same_tags,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.same_tags
            .cmp(&a.same_tags)
            .then_with(|| b.post.publish.cmp(&a.post.publish))
    });
    ranked.truncate(limit as usize);
    ranked
}

/// Score published `posts` by title similarity to `query`, keeping scores
/// strictly above `threshold`, best first.
pub fn rank_by_title<'a>(
    posts: impl IntoIterator<Item = &'a Post>,
    query: &str,
    threshold: f32,
) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = posts
        .into_iter()
        .filter(|post| post.is_published())
        .filter_map(|post| {
            let similarity = trigram::similarity(&post.title, query);
            (similarity > threshold).then(|| ScoredPost {
                post: post.clone(),
                similarity,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.post.publish.cmp(&a.post.publish))
    });
    scored
}

/// Order published posts by total comment count, fewest first.
///
/// Ascending is what the sidebar has always shown; ties go to the most
/// recently published post.
pub fn rank_by_comments<'a>(
    posts: impl IntoIterator<Item = (&'a Post, u64)>,
    limit: u64,
) -> Vec<CommentedPost> {
    let mut ranked: Vec<CommentedPost> = posts
        .into_iter()
        .filter(|(post, _)| post.is_published())
        .map(|(post, total_comments)| CommentedPost {
            post: post.clone(),
            total_comments,
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.total_comments
            .cmp(&b.total_comments)
            .then_with(|| b.post.publish.cmp(&a.post.publish))
    });
    ranked.truncate(limit as usize);
    ranked
}
