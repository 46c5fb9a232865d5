//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait, Select, Set,
    TransactionTrait,
};
use uuid::Uuid;

use blog_core::domain::{Comment, Post, PostStatus, Tag, User};
use blog_core::error::RepoError;
use blog_core::ports::{
    CommentFilter, CommentRepository, CommentedPost, PostFilter, PostOrder, PostRepository,
    ScoredPost, SimilarPost, TagRepository, UserRepository, Window,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL tag repository, also owning the `post_tags` association.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

const LIKE_ESCAPE: char = '\\';

/// Escape LIKE metacharacters so `needle` matches literally.
pub(crate) fn like_literal(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// `LOWER(col) LIKE '%needle%' ESCAPE '\'`
fn contains_ci<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", like_literal(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

fn post_condition(filter: &PostFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(post::Column::Status.eq(post::Status::from(status)));
    }
    if let Some(author_id) = filter.author_id {
        condition = condition.add(post::Column::AuthorId.eq(author_id));
    }
    if let Some(tag_id) = filter.tag_id {
        condition = condition.add(
            post::Column::Id.in_subquery(
                Query::select()
                    .column(post_tag::Column::PostId)
                    .from(PostTagEntity)
                    .and_where(post_tag::Column::TagId.eq(tag_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(text) = &filter.text {
        condition = condition.add(
            Condition::any()
                .add(contains_ci(post::Column::Title, text))
                .add(contains_ci(post::Column::Body, text)),
        );
    }

    condition
}

fn comment_condition(filter: &CommentFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(post_id) = filter.post_id {
        condition = condition.add(comment::Column::PostId.eq(post_id));
    }
    if let Some(active) = filter.active {
        condition = condition.add(comment::Column::Active.eq(active));
    }
    if let Some(text) = &filter.text {
        condition = condition.add(
            Condition::any()
                .add(contains_ci(comment::Column::Name, text))
                .add(contains_ci(comment::Column::Email, text))
                .add(contains_ci(comment::Column::Body, text)),
        );
    }

    condition
}

fn windowed<E: EntityTrait>(select: Select<E>, window: Window) -> Select<E> {
    let select = select.offset(window.offset);
    match window.limit {
        Some(limit) => select.limit(limit),
        None => select,
    }
}

fn published() -> SimpleExpr {
    post::Column::Status.eq(post::Status::from(PostStatus::Published))
}

/// Run an annotated post query and read back each post with one extra
/// column produced by `read`.
async fn annotated_posts<C, V>(
    db: &C,
    select: Select<PostEntity>,
    read: impl Fn(&sea_orm::QueryResult) -> Result<V, sea_orm::DbErr>,
) -> Result<Vec<(Post, V)>, RepoError>
where
    C: ConnectionTrait,
{
    let rows = db
        .query_all(select.build(DbBackend::Postgres))
        .await
        .map_err(db_err)?;

    rows.iter()
        .map(|row| -> Result<(Post, V), RepoError> {
            let model = post::Model::from_query_result(row, "").map_err(db_err)?;
            let extra = read(row).map_err(db_err)?;
            Ok((model.into(), extra))
        })
        .collect()
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post_condition(filter))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        window: Window,
    ) -> Result<Vec<Post>, RepoError> {
        let select = PostEntity::find().filter(post_condition(filter));
        let select = match order {
            PostOrder::Newest => select
                .order_by_desc(post::Column::Publish)
                .order_by_asc(post::Column::Id),
            PostOrder::Editorial => select
                .order_by_asc(post::Column::Status)
                .order_by_asc(post::Column::Publish)
                .order_by_asc(post::Column::Id),
        };

        let result = windowed(select, window)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_date_and_slug(
        &self,
        filter: &PostFilter,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let result = PostEntity::find()
            .filter(post_condition(filter))
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Publish.gte(start))
            .filter(post::Column::Publish.lt(end))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_similar(
        &self,
        post_id: Uuid,
        tag_ids: &[Uuid],
        limit: u64,
    ) -> Result<Vec<SimilarPost>, RepoError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let select = PostEntity::find()
            .column_as(
                Expr::col((PostTagEntity, post_tag::Column::TagId)).count(),
                "same_tags",
            )
            .join(JoinType::InnerJoin, post::Relation::PostTag.def())
            .filter(post_tag::Column::TagId.is_in(tag_ids.iter().copied()))
            .filter(post::Column::Id.ne(post_id))
            .filter(published())
            .group_by(post::Column::Id)
            .order_by_desc(Expr::cust("same_tags"))
            .order_by_desc(post::Column::Publish)
            .limit(limit);

        let rows = annotated_posts(&self.db, select, |row| row.try_get::<i64>("", "same_tags"))
            .await?;

        Ok(rows
            .into_iter()
            .map(|(post, same_tags)| SimilarPost {
                post,
                same_tags: same_tags.max(0) as u64,
            })
            .collect())
    }

    /// Scores titles with `pg_trgm`'s `similarity()`.
    async fn search_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<ScoredPost>, RepoError> {
        let similarity = || -> SimpleExpr {
            Func::cust(Alias::new("similarity"))
                .arg(Expr::col((PostEntity, post::Column::Title)))
                .arg(Expr::val(query))
                .into()
        };

        let select = PostEntity::find()
            .column_as(similarity(), "similarity")
            .filter(published())
            .filter(Expr::expr(similarity()).gt(threshold))
            .order_by_desc(Expr::cust("similarity"))
            .order_by_desc(post::Column::Publish);

        let rows = annotated_posts(&self.db, select, |row| row.try_get::<f32>("", "similarity"))
            .await?;

        Ok(rows
            .into_iter()
            .map(|(post, similarity)| ScoredPost { post, similarity })
            .collect())
    }

    async fn most_commented(&self, limit: u64) -> Result<Vec<CommentedPost>, RepoError> {
        let select = PostEntity::find()
            .column_as(
                Expr::col((CommentEntity, comment::Column::Id)).count(),
                "total_comments",
            )
            .join(JoinType::LeftJoin, post::Relation::Comment.def())
            .filter(published())
            .group_by(post::Column::Id)
            .order_by_asc(Expr::cust("total_comments"))
            .order_by_desc(post::Column::Publish)
            .limit(limit);

        let rows = annotated_posts(&self.db, select, |row| {
            row.try_get::<i64>("", "total_comments")
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|(post, total)| CommentedPost {
                post,
                total_comments: total.max(0) as u64,
            })
            .collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn count(&self, filter: &CommentFilter) -> Result<u64, RepoError> {
        CommentEntity::find()
            .filter(comment_condition(filter))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn list(
        &self,
        filter: &CommentFilter,
        window: Window,
    ) -> Result<Vec<Comment>, RepoError> {
        let select = CommentEntity::find()
            .filter(comment_condition(filter))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id);

        let result = windowed(select, window)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let result = TagEntity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, RepoError> {
        let result = TagEntity::find()
            .filter(tag::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.map(Into::into))
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        let rows = PostTagEntity::find()
            .find_also_related(TagEntity)
            .filter(post_tag::Column::PostId.is_in(post_ids.iter().copied()))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut tags: HashMap<Uuid, Vec<Tag>> =
            post_ids.iter().map(|id| (*id, Vec::new())).collect();
        for (link, tag) in rows {
            if let Some(tag) = tag {
                tags.entry(link.post_id).or_default().push(tag.into());
            }
        }

        Ok(tags)
    }

    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut seen = HashSet::new();
        let links: Vec<post_tag::ActiveModel> = tag_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|tag_id| post_tag::ActiveModel {
                post_id: Set(post_id),
                tag_id: Set(*tag_id),
            })
            .collect();

        let txn = self.db.begin().await.map_err(db_err)?;

        PostTagEntity::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !links.is_empty() {
            PostTagEntity::insert_many(links)
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        tracing::debug!(post_id = %post_id, tags = tag_ids.len(), "Post tags replaced");
        Ok(())
    }
}
