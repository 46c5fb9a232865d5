use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use blog_core::domain::{Comment, Post, PostStatus, Tag};
use blog_core::error::RepoError;
use blog_core::ports::{
    BaseRepository, CommentFilter, CommentRepository, PostFilter, PostOrder, PostRepository,
    TagRepository, Window,
};

use super::InMemoryBlogStore;

struct Fixture {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    tags: Arc<dyn TagRepository>,
}

fn fixture() -> Fixture {
    let store = InMemoryBlogStore::new();
    Fixture {
        posts: Arc::new(store.clone()),
        comments: Arc::new(store.clone()),
        tags: Arc::new(store),
    }
}

fn post(title: &str, status: PostStatus, days_ago: i64) -> Post {
    Post::new(Uuid::new_v4(), title.into(), "body".into())
        .with_status(status)
        .with_publish(Utc::now() - Duration::days(days_ago))
}

#[tokio::test]
async fn lists_published_posts_newest_first() {
    let fx = fixture();
    fx.posts.save(post("old", PostStatus::Published, 3)).await.unwrap();
    fx.posts.save(post("new", PostStatus::Published, 1)).await.unwrap();
    fx.posts.save(post("draft", PostStatus::Draft, 0)).await.unwrap();

    let listed = fx
        .posts
        .list(&PostFilter::published(), PostOrder::Newest, Window::all())
        .await
        .unwrap();
    let titles: Vec<&str> = listed.iter().map(|p| p.title.as_str()).collect();

    assert_eq!(titles, ["new", "old"]);
    assert_eq!(fx.posts.count(&PostFilter::published()).await.unwrap(), 2);
    assert_eq!(fx.posts.count(&PostFilter::all()).await.unwrap(), 3);
}

#[tokio::test]
async fn editorial_order_puts_drafts_first_then_oldest() {
    let fx = fixture();
    fx.posts.save(post("pub-new", PostStatus::Published, 1)).await.unwrap();
    fx.posts.save(post("pub-old", PostStatus::Published, 5)).await.unwrap();
    fx.posts.save(post("draft", PostStatus::Draft, 0)).await.unwrap();

    let listed = fx
        .posts
        .list(&PostFilter::all(), PostOrder::Editorial, Window::all())
        .await
        .unwrap();
    let titles: Vec<&str> = listed.iter().map(|p| p.title.as_str()).collect();

    assert_eq!(titles, ["draft", "pub-old", "pub-new"]);
}

#[tokio::test]
async fn finds_post_by_utc_date_and_slug() {
    let fx = fixture();
    let publish = Utc.with_ymd_and_hms(2024, 5, 17, 23, 59, 0).unwrap();
    let saved = fx
        .posts
        .save(post("Late Night", PostStatus::Published, 0).with_publish(publish))
        .await
        .unwrap();

    let day = publish.date_naive();
    let found = fx
        .posts
        .find_by_date_and_slug(&PostFilter::published(), day, "late-night")
        .await
        .unwrap();
    let next_day = fx
        .posts
        .find_by_date_and_slug(&PostFilter::published(), day.succ_opt().unwrap(), "late-night")
        .await
        .unwrap();

    assert_eq!(found.map(|p| p.id), Some(saved.id));
    assert!(next_day.is_none());
}

#[tokio::test]
async fn tag_filter_and_similar_posts() {
    let fx = fixture();
    let rust = fx.tags.save(Tag::new("rust")).await.unwrap();
    let web = fx.tags.save(Tag::new("web")).await.unwrap();

    let target = fx.posts.save(post("target", PostStatus::Published, 0)).await.unwrap();
    let both = fx.posts.save(post("both", PostStatus::Published, 9)).await.unwrap();
    let one = fx.posts.save(post("one", PostStatus::Published, 1)).await.unwrap();
    let draft = fx.posts.save(post("draft", PostStatus::Draft, 0)).await.unwrap();

    fx.tags.set_post_tags(target.id, &[rust.id, web.id]).await.unwrap();
    fx.tags.set_post_tags(both.id, &[rust.id, web.id]).await.unwrap();
    fx.tags.set_post_tags(one.id, &[web.id]).await.unwrap();
    fx.tags.set_post_tags(draft.id, &[rust.id, web.id]).await.unwrap();

    let tagged_rust = fx
        .posts
        .count(&PostFilter::published().tagged(rust.id))
        .await
        .unwrap();
    assert_eq!(tagged_rust, 2);

    let similar = fx
        .posts
        .find_similar(target.id, &[rust.id, web.id], 4)
        .await
        .unwrap();
    let ranked: Vec<(&str, u64)> = similar
        .iter()
        .map(|s| (s.post.title.as_str(), s.same_tags))
        .collect();

    assert_eq!(ranked, [("both", 2), ("one", 1)]);
}

#[tokio::test]
async fn tags_for_posts_are_sorted_and_deduplicated() {
    let fx = fixture();
    let zebra = fx.tags.save(Tag::new("zebra")).await.unwrap();
    let apple = fx.tags.save(Tag::new("apple")).await.unwrap();
    let saved = fx.posts.save(post("p", PostStatus::Published, 0)).await.unwrap();

    fx.tags
        .set_post_tags(saved.id, &[zebra.id, apple.id, zebra.id])
        .await
        .unwrap();

    let tags = fx.tags.tags_for_posts(&[saved.id]).await.unwrap();
    let names: Vec<&str> = tags[&saved.id].iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["apple", "zebra"]);
}

#[tokio::test]
async fn duplicate_tag_names_are_rejected() {
    let fx = fixture();
    fx.tags.save(Tag::new("rust")).await.unwrap();

    let err = fx.tags.save(Tag::new("rust")).await.unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
}

#[tokio::test]
async fn search_and_most_commented() {
    let fx = fixture();
    let quiet = fx
        .posts
        .save(post("Learning Rust", PostStatus::Published, 1))
        .await
        .unwrap();
    let busy = fx
        .posts
        .save(post("Rust in production", PostStatus::Published, 2))
        .await
        .unwrap();
    fx.posts
        .save(post("Rust drafts", PostStatus::Draft, 0))
        .await
        .unwrap();

    for i in 0..3 {
        let mut comment = Comment::new(busy.id, format!("n{i}"), "a@b.co".into(), "hi".into());
        comment.active = i != 0;
        fx.comments.save(comment).await.unwrap();
    }

    let hits = fx.posts.search_titles("rust", 0.1).await.unwrap();
    assert!(hits.iter().all(|h| h.post.status == PostStatus::Published));
    assert_eq!(hits.len(), 2);

    let ranked = fx.posts.most_commented(5).await.unwrap();
    assert_eq!(ranked[0].post.id, quiet.id);
    assert_eq!(ranked[0].total_comments, 0);
    assert_eq!(ranked[1].total_comments, 3);
}

#[tokio::test]
async fn deleting_a_post_cascades_to_comments() {
    let fx = fixture();
    let saved = fx.posts.save(post("p", PostStatus::Published, 0)).await.unwrap();
    fx.comments
        .save(Comment::new(saved.id, "n".into(), "a@b.co".into(), "hi".into()))
        .await
        .unwrap();

    fx.posts.delete(saved.id).await.unwrap();

    let left = fx.comments.count(&CommentFilter::default()).await.unwrap();
    assert_eq!(left, 0);
    assert!(matches!(
        fx.posts.delete(saved.id).await.unwrap_err(),
        RepoError::NotFound
    ));
}

#[tokio::test]
async fn comments_require_an_existing_post() {
    let fx = fixture();

    let orphan = Comment::new(Uuid::new_v4(), "n".into(), "a@b.co".into(), "hi".into());
    assert!(fx.comments.save(orphan).await.is_err());
}
