//! Service-level behaviour against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use uuid::Uuid;

use blog_core::domain::{PostStatus, User};
use blog_core::forms::{CommentForm, EmailPostForm};
use blog_core::ports::BaseRepository;
use blog_core::service::{CommentQuery, EditorialPost, PostChanges, PostDraft, PostQuery};
use blog_core::{BlogPorts, BlogService, BlogSettings, DomainError};
use blog_infra::{InMemoryBlogStore, RecordingMailer};

struct Blog {
    service: BlogService,
    mailer: Arc<RecordingMailer>,
    author: User,
}

async fn blog_with(mailer: RecordingMailer) -> Blog {
    let store = InMemoryBlogStore::new();
    let mailer = Arc::new(mailer);
    let author = User::new(
        "ada".to_string(),
        "ada@example.com".to_string(),
        "hash".to_string(),
    )
    .staff();
    BaseRepository::<User, Uuid>::save(&store, author.clone())
        .await
        .unwrap();

    let ports = BlogPorts {
        posts: Arc::new(store.clone()),
        comments: Arc::new(store.clone()),
        tags: Arc::new(store.clone()),
        users: Arc::new(store),
        mailer: mailer.clone(),
    };
    let settings = BlogSettings {
        mail_from: "blog@example.com".to_string(),
        ..BlogSettings::default()
    };

    Blog {
        service: BlogService::new(ports, settings),
        mailer,
        author,
    }
}

async fn blog() -> Blog {
    blog_with(RecordingMailer::new()).await
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 9, 30, 0).unwrap()
}

impl Blog {
    async fn publish(&self, title: &str, at: DateTime<Utc>, tags: &[&str]) -> EditorialPost {
        self.service
            .create_post(
                self.author.id,
                PostDraft {
                    title: title.to_string(),
                    body: format!("Notes about {title}."),
                    status: Some(PostStatus::Published),
                    publish: Some(at),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..PostDraft::default()
                },
            )
            .await
            .unwrap()
    }

    async fn draft(&self, title: &str, tags: &[&str]) -> EditorialPost {
        self.service
            .create_post(
                self.author.id,
                PostDraft {
                    title: title.to_string(),
                    body: "Unfinished.".to_string(),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..PostDraft::default()
                },
            )
            .await
            .unwrap()
    }

    async fn comment(&self, post_id: Uuid, name: &str) -> Uuid {
        let outcome = self
            .service
            .add_comment(
                post_id,
                CommentForm {
                    name: name.to_string(),
                    email: format!("{name}@example.com"),
                    body: "Nice read".to_string(),
                },
            )
            .await
            .unwrap();
        outcome.comment.unwrap().id
    }
}

fn share_form(to: &str) -> EmailPostForm {
    EmailPostForm {
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        to: to.to_string(),
        comments: "You will like this".to_string(),
    }
}

#[tokio::test]
async fn list_shows_published_posts_newest_first_and_clamps_pages() {
    let blog = blog().await;
    for d in 1..=4 {
        blog.publish(&format!("Post {d}"), day(d), &[]).await;
    }
    blog.draft("Hidden", &[]).await;

    let first = blog.service.list_posts(None, None).await.unwrap();
    let titles: Vec<&str> = first.posts.items.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Post 4", "Post 3", "Post 2"]);
    assert_eq!(first.posts.count, 4);
    assert_eq!(first.posts.num_pages, 2);
    assert!(first.posts.has_next);

    let past_end = blog.service.list_posts(None, Some("99")).await.unwrap();
    assert_eq!(past_end.posts.number, 2);
    assert_eq!(past_end.posts.items.len(), 1);
    assert_eq!(past_end.posts.items[0].title, "Post 1");

    let garbage = blog.service.list_posts(None, Some("abc")).await.unwrap();
    assert_eq!(garbage.posts.number, 1);

    let again = blog.service.list_posts(None, None).await.unwrap();
    assert_eq!(again.posts, first.posts);
}

#[tokio::test]
async fn tag_listing_filters_and_unknown_tag_is_not_found() {
    let blog = blog().await;
    blog.publish("Borrowing", day(1), &["Rust"]).await;
    blog.publish("Flexbox", day(2), &["css"]).await;
    blog.draft("Lifetimes", &["Rust"]).await;

    let tagged = blog.service.list_posts(Some("rust"), None).await.unwrap();
    assert_eq!(tagged.tag.map(|t| t.name), Some("Rust".to_string()));
    assert_eq!(tagged.posts.count, 1);
    assert_eq!(tagged.posts.items[0].title, "Borrowing");

    let missing = blog.service.list_posts(Some("go"), None).await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn detail_serves_published_posts_with_active_comments_and_similar_posts() {
    let blog = blog().await;
    let post = blog.publish("Ownership", day(10), &["rust", "memory"]).await;
    let close = blog.publish("Borrowing", day(3), &["rust", "memory"]).await;
    let loose = blog.publish("Cargo", day(5), &["rust"]).await;
    blog.publish("Flexbox", day(6), &["css"]).await;
    blog.draft("Lifetimes", &["rust", "memory"]).await;

    let kept = blog.comment(post.id, "alice").await;
    let hidden = blog.comment(post.id, "bob").await;
    blog.service.set_comment_active(hidden, false).await.unwrap();

    let detail = blog
        .service
        .post_detail(2024, 1, 10, "ownership")
        .await
        .unwrap();

    assert_eq!(detail.post.id, post.id);
    assert_eq!(detail.post.author.as_deref(), Some("ada"));
    assert_eq!(detail.post.url, "/blog/2024/1/10/ownership");
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].id, kept);
    assert_eq!(detail.comment_form, CommentForm::default());

    let similar: Vec<(Uuid, u64)> = detail
        .similar_posts
        .iter()
        .map(|s| (s.post.id, s.same_tags))
        .collect();
    assert_eq!(similar, [(close.id, 2), (loose.id, 1)]);
}

#[tokio::test]
async fn detail_of_drafts_wrong_dates_or_bad_dates_is_not_found() {
    let blog = blog().await;
    let draft = blog.draft("Secret", &[]).await;
    blog.publish("Public", day(7), &[]).await;

    let at = draft.publish;
    let draft_lookup = blog
        .service
        .post_detail(at.year(), at.month(), at.day(), "secret")
        .await;
    let wrong_day = blog.service.post_detail(2024, 1, 8, "public").await;
    let impossible = blog.service.post_detail(2024, 2, 30, "public").await;

    assert!(matches!(draft_lookup, Err(DomainError::NotFound { .. })));
    assert!(matches!(wrong_day, Err(DomainError::NotFound { .. })));
    assert!(matches!(impossible, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn sharing_sends_exactly_one_mail_with_the_absolute_url() {
    let blog = blog().await;
    let post = blog.publish("Ownership", day(10), &[]).await;

    let view = blog
        .service
        .share_post(post.id, share_form("friend@example.com"), "https://blog.test/")
        .await
        .unwrap();

    assert!(view.sent);
    assert!(view.errors.is_empty());

    let sent = blog.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, "blog@example.com");
    assert_eq!(sent[0].to, ["friend@example.com"]);
    assert_eq!(sent[0].subject, "Grace recommends you read Ownership");
    assert_eq!(
        sent[0].body,
        "Read Ownership at https://blog.test/blog/2024/1/10/ownership\n\n\
         Grace's comments: You will like this"
    );
}

#[tokio::test]
async fn invalid_share_form_sends_nothing() {
    let blog = blog().await;
    let post = blog.publish("Ownership", day(10), &[]).await;

    let view = blog
        .service
        .share_post(post.id, share_form("not-an-address"), "http://localhost")
        .await
        .unwrap();

    assert!(!view.sent);
    assert_eq!(view.errors.field("to"), ["Enter a valid email address."]);
    assert_eq!(view.form.to, "not-an-address");
    assert!(blog.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn share_transport_failure_is_an_error() {
    let blog = blog_with(RecordingMailer::failing("smtp down")).await;
    let post = blog.publish("Ownership", day(10), &[]).await;

    let result = blog
        .service
        .share_post(post.id, share_form("friend@example.com"), "http://localhost")
        .await;

    assert!(matches!(result, Err(DomainError::Mail(_))));
}

#[tokio::test]
async fn sharing_a_draft_is_not_found() {
    let blog = blog().await;
    let draft = blog.draft("Secret", &[]).await;

    assert!(matches!(
        blog.service.share_form(draft.id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn comments_are_created_once_and_invalid_forms_create_none() {
    let blog = blog().await;
    let post = blog.publish("Ownership", day(10), &[]).await;

    let invalid = blog
        .service
        .add_comment(
            post.id,
            CommentForm {
                name: "x".repeat(81),
                email: "reader@example.com".to_string(),
                body: String::new(),
            },
        )
        .await
        .unwrap();
    assert!(invalid.comment.is_none());
    assert_eq!(
        invalid.errors.field("name"),
        ["Ensure this value has at most 80 characters (it has 81)."]
    );
    assert_eq!(invalid.errors.field("body"), ["This field is required."]);

    blog.comment(post.id, "reader").await;

    let all = blog
        .service
        .editorial_comments(CommentQuery::default())
        .await
        .unwrap();
    assert_eq!(all.count, 1);
    assert!(all.items[0].active);
    assert_eq!(all.items[0].post_id, post.id);
}

#[tokio::test]
async fn search_keeps_titles_strictly_above_the_threshold() {
    let blog = blog().await;
    blog.publish("Learning Rust", day(1), &[]).await;
    blog.publish("Rust in production", day(2), &[]).await;
    blog.publish("Cooking pasta", day(3), &[]).await;
    blog.draft("Rust drafts", &[]).await;

    let view = blog.service.search(Some("rust".to_string())).await.unwrap();
    let titles: Vec<&str> = view.results.iter().map(|h| h.post.title.as_str()).collect();

    assert_eq!(view.query.as_deref(), Some("rust"));
    assert_eq!(titles, ["Learning Rust", "Rust in production"]);
    assert!(view.results.iter().all(|h| h.similarity > 0.1));
    assert!(view.results[0].similarity >= view.results[1].similarity);

    let blank = blog.service.search(Some("   ".to_string())).await.unwrap();
    assert_eq!(blank.query, None);
    assert_eq!(blank.errors.field("query"), ["This field is required."]);

    let idle = blog.service.search(None).await.unwrap();
    assert!(idle.results.is_empty() && idle.errors.is_empty());
}

#[tokio::test]
async fn slugs_are_unique_per_publish_date() {
    let blog = blog().await;
    blog.publish("Ownership", day(10), &[]).await;

    let clash = blog
        .service
        .create_post(
            blog.author.id,
            PostDraft {
                title: "Ownership".to_string(),
                body: "Again".to_string(),
                publish: Some(day(10) + Duration::hours(2)),
                ..PostDraft::default()
            },
        )
        .await;
    assert!(matches!(clash, Err(DomainError::Duplicate(_))));

    let next_day = blog.publish("Ownership", day(11), &[]).await;
    assert_eq!(next_day.slug, "ownership");
}

#[tokio::test]
async fn editorial_updates_and_deletes_posts() {
    let blog = blog().await;
    let draft = blog.draft("Work in progress", &["misc"]).await;

    let updated = blog
        .service
        .update_post(
            draft.id,
            PostChanges {
                status: Some(PostStatus::Published),
                tags: Some(vec!["rust".to_string()]),
                ..PostChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, PostStatus::Published);
    assert_eq!(updated.tags, ["rust"]);
    assert!(updated.updated_at >= draft.updated_at);

    let listed = blog
        .service
        .editorial_posts(PostQuery {
            status: Some(PostStatus::Published),
            ..PostQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.count, 1);

    let invalid = blog
        .service
        .update_post(
            draft.id,
            PostChanges {
                slug: Some("not a slug".to_string()),
                ..PostChanges::default()
            },
        )
        .await;
    assert!(matches!(invalid, Err(DomainError::Validation(_))));

    blog.service.delete_post(draft.id).await.unwrap();
    assert!(matches!(
        blog.service.delete_post(draft.id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn sidebar_orders_most_commented_ascending() {
    let blog = blog().await;
    let busy = blog.publish("Busy", day(1), &[]).await;
    let quiet = blog.publish("Quiet", day(2), &[]).await;
    blog.draft("Draft", &[]).await;
    blog.comment(busy.id, "a").await;
    blog.comment(busy.id, "b").await;

    let sidebar = blog.service.sidebar(Some(1), None).await.unwrap();

    assert_eq!(sidebar.total_posts, 2);
    assert_eq!(sidebar.latest_posts.len(), 1);
    assert_eq!(sidebar.latest_posts[0].id, quiet.id);

    let ranked: Vec<(Uuid, u64)> = sidebar
        .most_commented
        .iter()
        .map(|c| (c.post.id, c.total_comments))
        .collect();
    assert_eq!(ranked, [(quiet.id, 0), (busy.id, 2)]);
}
