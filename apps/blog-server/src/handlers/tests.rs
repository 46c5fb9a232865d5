use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::{App, http::StatusCode, test, web};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use blog_core::BlogSettings;
use blog_core::domain::{PostStatus, User};
use blog_core::ports::{BaseRepository, PasswordService, TokenService};
use blog_core::service::{EditorialPost, PostDraft};
use blog_infra::{Argon2PasswordService, JwtConfig, JwtTokenService, RecordingMailer};

use crate::config::SiteConfig;
use crate::state::AppState;

struct Harness {
    state: AppState,
    mailer: Arc<RecordingMailer>,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
    staff: User,
}

impl Harness {
    async fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::new());
        let settings = BlogSettings {
            mail_from: "blog@example.com".to_string(),
            ..BlogSettings::default()
        };
        let state = AppState::in_memory(mailer.clone(), settings).with_site(SiteConfig {
            url: None,
            allowed_hosts: vec!["blog.example".to_string()],
        });
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        let hash = passwords.hash("s3cret-pass").unwrap();
        let staff = User::new("ada".to_string(), "ada@example.com".to_string(), hash).staff();
        state.users.save(staff.clone()).await.unwrap();

        Self {
            state,
            mailer,
            tokens: Arc::new(JwtTokenService::new(JwtConfig::default())),
            passwords,
            staff,
        }
    }

    fn bearer(&self, user: &User) -> (&'static str, String) {
        let token = self.tokens.generate_token(user).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    async fn publish(&self, title: &str, day: u32, tags: &[&str]) -> EditorialPost {
        self.state
            .blog
            .create_post(
                self.staff.id,
                PostDraft {
                    title: title.to_string(),
                    body: format!("All about **{title}**."),
                    status: Some(PostStatus::Published),
                    publish: Some(Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap()),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..PostDraft::default()
                },
            )
            .await
            .unwrap()
    }
}

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .wrap(NormalizePath::trim())
                .app_data(web::Data::new($h.state.clone()))
                .app_data(web::Data::new($h.tokens.clone()))
                .app_data(web::Data::new($h.passwords.clone()))
                .configure(crate::extractor_configs)
                .configure(super::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn list_page_clamps_out_of_range_pages_and_ignores_trailing_slash() {
    let h = Harness::new().await;
    for day in 1..=4 {
        h.publish(&format!("Post {day}"), day, &[]).await;
    }
    let app = app!(h);

    let req = test::TestRequest::get().uri("/blog/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["posts"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["posts"]["items"][0]["title"], "Post 4");
    assert_eq!(
        body["data"]["posts"]["items"][0]["body_html"],
        "<p>All about <strong>Post 4</strong>.</p>\n"
    );

    let req = test::TestRequest::get().uri("/blog?page=99").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["number"], 2);
    assert_eq!(body["data"]["posts"]["items"][0]["title"], "Post 1");

    let req = test::TestRequest::get()
        .uri("/blog?page=99999999999999999999")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["number"], 2);
}

#[actix_web::test]
async fn unknown_tag_and_malformed_paths_are_not_found() {
    let h = Harness::new().await;
    h.publish("Ownership", 10, &["rust"]).await;
    let app = app!(h);

    let req = test::TestRequest::get().uri("/blog/tag/python").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);

    let req = test::TestRequest::get()
        .uri("/blog/twenty/1/10/ownership")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/blog/tag/rust").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["tag"]["slug"], "rust");
    assert_eq!(body["data"]["posts"]["count"], 1);
}

#[actix_web::test]
async fn detail_page_lists_similar_posts() {
    let h = Harness::new().await;
    h.publish("Ownership", 10, &["rust"]).await;
    let other = h.publish("Borrowing", 3, &["rust"]).await;
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/blog/2024/1/10/ownership")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["post"]["title"], "Ownership");
    assert_eq!(body["data"]["similar_posts"][0]["id"], other.id.to_string());
    assert_eq!(body["data"]["similar_posts"][0]["same_tags"], 1);
    assert_eq!(body["data"]["comments"], json!([]));
}

#[actix_web::test]
async fn comment_endpoint_is_post_only_and_reports_form_errors() {
    let h = Harness::new().await;
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);
    let uri = format!("/blog/{}/comment", post.id);

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("name", "Reader"), ("email", "broken"), ("body", "Hi")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["comment"].is_null());
    assert_eq!(body["data"]["errors"]["email"][0], "Enter a valid email address.");

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([
            ("name", "Reader"),
            ("email", "reader@example.com"),
            ("body", "Great post"),
        ])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Comment added");
    assert_eq!(body["data"]["comment"]["name"], "Reader");

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/comment", Uuid::new_v4()))
        .set_form([("name", "x"), ("email", "x@example.com"), ("body", "x")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn share_mails_an_absolute_link_built_from_the_request_host() {
    let h = Harness::new().await;
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .insert_header(("host", "blog.example"))
        .set_form([
            ("name", "Grace"),
            ("email", "grace@example.com"),
            ("to", "friend@example.com"),
            ("comments", "Worth it"),
        ])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sent"], true);

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(
        sent[0]
            .body
            .contains("http://blog.example/blog/2024/1/10/ownership")
    );
}

fn share_form() -> [(&'static str, &'static str); 4] {
    [
        ("name", "Grace"),
        ("email", "grace@example.com"),
        ("to", "friend@example.com"),
        ("comments", ""),
    ]
}

#[actix_web::test]
async fn share_ignores_forwarded_host_headers() {
    let h = Harness::new().await;
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .insert_header(("host", "blog.example"))
        .insert_header(("x-forwarded-host", "evil.example"))
        .insert_header(("x-forwarded-proto", "https"))
        .insert_header(("forwarded", "host=evil.example;proto=https"))
        .set_form(share_form())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sent"], true);

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(
        sent[0]
            .body
            .contains("Read Ownership at http://blog.example/blog/2024/1/10/ownership")
    );
    assert!(!sent[0].body.contains("evil.example"));
}

#[actix_web::test]
async fn share_rejects_untrusted_host_without_sending() {
    let h = Harness::new().await;
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .insert_header(("host", "evil.example"))
        .set_form(share_form())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(h.mailer.sent().await.is_empty());
}

#[actix_web::test]
async fn share_prefers_the_configured_site_url() {
    let mut h = Harness::new().await;
    h.state = h.state.clone().with_site(SiteConfig {
        url: Some("https://www.blog.example".to_string()),
        allowed_hosts: Vec::new(),
    });
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .insert_header(("host", "anything.example"))
        .set_form(share_form())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sent"], true);

    let sent = h.mailer.sent().await;
    assert!(
        sent[0]
            .body
            .contains("https://www.blog.example/blog/2024/1/10/ownership")
    );
}

#[actix_web::test]
async fn search_and_sidebar_documents() {
    let h = Harness::new().await;
    h.publish("Learning Rust", 1, &[]).await;
    h.publish("Cooking pasta", 2, &[]).await;
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/blog/search?query=rust")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["query"], "rust");
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["results"][0]["post"]["title"], "Learning Rust");

    let req = test::TestRequest::get().uri("/blog/search").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"]["query"].is_null());

    let req = test::TestRequest::get()
        .uri("/blog/sidebar?latest=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total_posts"], 2);
    assert_eq!(body["data"]["latest_posts"][0]["title"], "Cooking pasta");
    assert_eq!(body["data"]["most_commented"][0]["total_comments"], 0);
}

#[actix_web::test]
async fn editorial_api_requires_staff() {
    let h = Harness::new().await;
    let author = User::new(
        "bob".to_string(),
        "bob@example.com".to_string(),
        "hash".to_string(),
    );
    let app = app!(h);

    let req = test::TestRequest::get().uri("/api/admin/posts").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/api/admin/posts")
        .insert_header(h.bearer(&author))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[actix_web::test]
async fn editorial_post_lifecycle() {
    let h = Harness::new().await;
    let app = app!(h);
    let auth = h.bearer(&h.staff);

    let create = json!({
        "title": "Hello World",
        "body": "First post",
        "status": "published",
        "publish": "2024-02-01T10:00:00Z",
        "tags": ["intro"]
    });
    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(auth.clone())
        .set_json(&create)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["slug"], "hello-world");
    assert_eq!(body["data"]["author_id"], h.staff.id.to_string());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(auth.clone())
        .set_json(&create)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/posts/{id}"))
        .insert_header(auth.clone())
        .set_json(json!({ "status": "draft" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "draft");

    let req = test::TestRequest::get().uri("/blog").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["count"], 0);

    let req = test::TestRequest::get()
        .uri("/api/admin/posts?status=draft")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/posts/{id}"))
        .insert_header(auth.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/posts/{id}"))
        .insert_header(auth)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn moderation_hides_comments_from_readers() {
    let h = Harness::new().await;
    let post = h.publish("Ownership", 10, &[]).await;
    let app = app!(h);
    let auth = h.bearer(&h.staff);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/comment", post.id))
        .set_form([("name", "Spam"), ("email", "spam@example.com"), ("body", "Buy")])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let comment_id = body["data"]["comment"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/comments/{comment_id}"))
        .insert_header(auth.clone())
        .set_json(json!({ "active": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["active"], false);

    let req = test::TestRequest::get()
        .uri("/api/admin/comments?active=false")
        .insert_header(auth)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 1);

    let req = test::TestRequest::get()
        .uri("/blog/2024/1/10/ownership")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["comments"], json!([]));
}

#[actix_web::test]
async fn login_issues_a_token_for_valid_credentials() {
    let h = Harness::new().await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "s3cret-pass" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["roles"], json!(["author", "staff"]));
}

#[actix_web::test]
async fn health_reports_storage_and_echoes_request_id() {
    let h = Harness::new().await;
    let app = test::init_service(
        App::new()
            .wrap(crate::observability::RequestIdMiddleware)
            .app_data(web::Data::new(h.state.clone()))
            .configure(super::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/health")
        .insert_header(("x-request-id", "abc-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "in-memory");
}
