//! Reader-facing pages: listing, detail, sharing, commenting, search and
//! the sidebar widgets.

use chrono::NaiveDate;
use uuid::Uuid;

use super::views::{
    CommentOutcome, CommentView, CommentedLink, PostDetail, PostLink, PostListPage, SearchHit,
    SearchView, ShareView, Sidebar, SimilarLink,
};
use super::{BlogService, Body, mask_email};
use crate::domain::Comment;
use crate::error::DomainError;
use crate::forms::{CommentForm, EmailPostForm, FormErrors, SearchForm};
use crate::ports::{BaseRepository, CommentFilter, EmailMessage, PostFilter, PostOrder, Window};
use crate::query::{Page, SEARCH_SIMILARITY_THRESHOLD, SIMILAR_POSTS_LIMIT};

/// Default size of the latest-posts and most-commented widgets.
pub const WIDGET_SIZE: u64 = 5;

impl BlogService {
    /// Published posts, newest first, optionally restricted to a tag.
    ///
    /// `page` is the raw query value; anything unusable is clamped.
    pub async fn list_posts(
        &self,
        tag_slug: Option<&str>,
        page: Option<&str>,
    ) -> Result<PostListPage, DomainError> {
        let mut filter = PostFilter::published();

        let tag = match tag_slug {
            Some(slug) => {
                let tag = self
                    .tags
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Tag", slug))?;
                filter = filter.tagged(tag.id);
                Some(tag)
            }
            None => None,
        };

        let count = self.posts.count(&filter).await?;
        let request = self.paginator().resolve(count, page);
        let posts = self
            .posts
            .list(&filter, PostOrder::Newest, request.window)
            .await?;
        let views = self.present(posts, Body::Excerpt).await?;

        Ok(PostListPage {
            tag,
            posts: Page::new(request, views),
        })
    }

    /// A published post by its canonical date and slug, with its active
    /// comments and up to four posts sharing its tags.
    pub async fn post_detail(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<PostDetail, DomainError> {
        let not_found = || DomainError::not_found("Post", format!("{year}/{month}/{day}/{slug}"));

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(not_found)?;
        let post = self
            .posts
            .find_by_date_and_slug(&PostFilter::published(), date, slug)
            .await?
            .ok_or_else(not_found)?;

        let comments = self
            .comments
            .list(
                &CommentFilter {
                    post_id: Some(post.id),
                    active: Some(true),
                    text: None,
                },
                Window::all(),
            )
            .await?;

        let tag_ids: Vec<Uuid> = self
            .tags_of(&[post.id])
            .await?
            .remove(&post.id)
            .unwrap_or_default()
            .iter()
            .map(|t| t.id)
            .collect();
        let similar = if tag_ids.is_empty() {
            Vec::new()
        } else {
            self.posts
                .find_similar(post.id, &tag_ids, SIMILAR_POSTS_LIMIT)
                .await?
        };

        let view = self
            .present(vec![post], Body::Full)
            .await?
            .pop()
            .ok_or_else(not_found)?;

        Ok(PostDetail {
            post: view,
            comments: comments.iter().map(CommentView::from).collect(),
            comment_form: CommentForm::default(),
            similar_posts: similar
                .iter()
                .map(|s| SimilarLink {
                    post: PostLink::from(&s.post),
                    same_tags: s.same_tags,
                })
                .collect(),
        })
    }

    /// Blank share form for a published post.
    pub async fn share_form(&self, post_id: Uuid) -> Result<ShareView, DomainError> {
        let post = self.published_post(post_id).await?;
        Ok(ShareView {
            post: PostLink::from(&post),
            form: EmailPostForm::default(),
            errors: FormErrors::default(),
            sent: false,
        })
    }

    /// Validate a share submission and mail the recommendation.
    ///
    /// `site_root` is the scheme and host the request came in on; it turns
    /// the post path into an absolute link. Transport failures propagate.
    pub async fn share_post(
        &self,
        post_id: Uuid,
        form: EmailPostForm,
        site_root: &str,
    ) -> Result<ShareView, DomainError> {
        let post = self.published_post(post_id).await?;
        let link = PostLink::from(&post);

        let cleaned = match form.clean() {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                return Ok(ShareView {
                    post: link,
                    form,
                    errors,
                    sent: false,
                });
            }
        };

        let post_url = format!("{}{}", site_root.trim_end_matches('/'), link.url);
        let message = EmailMessage {
            from: self.settings.mail_from.clone(),
            to: vec![cleaned.to.clone()],
            subject: format!("{} recommends you read {}", cleaned.name, post.title),
            body: format!(
                "Read {} at {}\n\n{}'s comments: {}",
                post.title, post_url, cleaned.name, cleaned.comments
            ),
        };
        self.mailer.send(message).await?;

        tracing::info!(
            post_id = %post.id,
            to = %mask_email(&cleaned.to),
            "Shared post by email"
        );

        Ok(ShareView {
            post: link,
            form: cleaned,
            errors: FormErrors::default(),
            sent: true,
        })
    }

    /// Store a comment on a published post, or hand the form back.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        form: CommentForm,
    ) -> Result<CommentOutcome, DomainError> {
        let post = self.published_post(post_id).await?;
        let link = PostLink::from(&post);

        let cleaned = match form.clean() {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                return Ok(CommentOutcome {
                    post: link,
                    form,
                    errors,
                    comment: None,
                });
            }
        };

        let comment = Comment::new(
            post.id,
            cleaned.name.clone(),
            cleaned.email.clone(),
            cleaned.body.clone(),
        );
        let saved = self.comments.save(comment).await?;

        tracing::info!(
            post_id = %post.id,
            comment_id = %saved.id,
            email = %mask_email(&saved.email),
            "Comment added"
        );

        Ok(CommentOutcome {
            post: link,
            form: cleaned,
            errors: FormErrors::default(),
            comment: Some(CommentView::from(&saved)),
        })
    }

    /// Title search. `None` means the form was not submitted.
    pub async fn search(&self, query: Option<String>) -> Result<SearchView, DomainError> {
        let Some(raw) = query else {
            return Ok(SearchView {
                query: None,
                form: SearchForm::default(),
                errors: FormErrors::default(),
                results: Vec::new(),
            });
        };

        let form = SearchForm { query: raw };
        let cleaned = match form.clean() {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                return Ok(SearchView {
                    query: None,
                    form,
                    errors,
                    results: Vec::new(),
                });
            }
        };

        let scored = self
            .posts
            .search_titles(&cleaned.query, SEARCH_SIMILARITY_THRESHOLD)
            .await?;
        let scores: Vec<f32> = scored.iter().map(|s| s.similarity).collect();
        let views = self
            .present(scored.into_iter().map(|s| s.post).collect(), Body::Excerpt)
            .await?;

        tracing::debug!(query = %cleaned.query, hits = views.len(), "Search executed");

        Ok(SearchView {
            query: Some(cleaned.query.clone()),
            form: cleaned,
            errors: FormErrors::default(),
            results: views
                .into_iter()
                .zip(scores)
                .map(|(post, similarity)| SearchHit { post, similarity })
                .collect(),
        })
    }

    pub async fn total_posts(&self) -> Result<u64, DomainError> {
        Ok(self.posts.count(&PostFilter::published()).await?)
    }

    pub async fn latest_posts(&self, count: u64) -> Result<Vec<PostLink>, DomainError> {
        let posts = self
            .posts
            .list(&PostFilter::published(), PostOrder::Newest, Window::first(count))
            .await?;
        Ok(posts.iter().map(PostLink::from).collect())
    }

    /// Published posts by total comment count, *ascending*.
    pub async fn most_commented_posts(&self, count: u64) -> Result<Vec<CommentedLink>, DomainError> {
        let ranked = self.posts.most_commented(count).await?;
        Ok(ranked
            .iter()
            .map(|c| CommentedLink {
                post: PostLink::from(&c.post),
                total_comments: c.total_comments,
            })
            .collect())
    }

    pub async fn sidebar(
        &self,
        latest: Option<u64>,
        most_commented: Option<u64>,
    ) -> Result<Sidebar, DomainError> {
        Ok(Sidebar {
            total_posts: self.total_posts().await?,
            latest_posts: self.latest_posts(latest.unwrap_or(WIDGET_SIZE)).await?,
            most_commented: self
                .most_commented_posts(most_commented.unwrap_or(WIDGET_SIZE))
                .await?,
        })
    }
}
