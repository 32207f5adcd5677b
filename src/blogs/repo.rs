use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::blogs::{
    model::{Blog, BlogPatch, Comment},
    query::{BlogFilter, BlogSort},
    repo_types::{assemble, BlogRow, CommentRow, LikeRow},
};

/// Outcome of a conditional change to a blog's nested collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    /// The blog exists but the change was a no-op (already liked, not liked).
    Unchanged,
    /// The blog does not exist.
    Missing,
}

/// Persistence seam for blogs. Every mutating method is a single atomic
/// step against the store, so concurrent callers never lose each other's
/// writes.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn insert(&self, blog: &Blog) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Blog>>;
    async fn list(&self, filter: &BlogFilter, sort: BlogSort) -> anyhow::Result<Vec<Blog>>;
    /// Returns `false` when the blog does not exist.
    async fn update(&self, id: Uuid, patch: BlogPatch, now: OffsetDateTime) -> anyhow::Result<bool>;
    /// Removes the blog with its comments and likes.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Returns `false` when the blog does not exist.
    async fn push_comment(&self, blog_id: Uuid, comment: &Comment) -> anyhow::Result<bool>;
    /// Returns `false` when the blog or the comment does not exist.
    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> anyhow::Result<bool>;
    async fn add_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change>;
    async fn remove_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change>;
    async fn count_blogs(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgBlogRepository {
    db: PgPool,
}

impl PgBlogRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load_children(&self, rows: Vec<BlogRow>) -> anyhow::Result<Vec<Blog>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let comments = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, blog_id, user_id, text, created_at
              FROM blog_comments
             WHERE blog_id = ANY($1)
             ORDER BY position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await
        .context("load comments")?;

        let likes = sqlx::query_as::<_, LikeRow>(
            r#"
            SELECT blog_id, user_id
              FROM blog_likes
             WHERE blog_id = ANY($1)
             ORDER BY position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await
        .context("load likes")?;

        Ok(assemble(rows, comments, likes))
    }

    async fn exists(&self, id: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM blogs WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.db)
            .await
            .context("check blog exists")?;
        Ok(exists)
    }

    async fn change_or_missing(&self, applied: bool, blog_id: Uuid) -> anyhow::Result<Change> {
        if applied {
            Ok(Change::Applied)
        } else if self.exists(blog_id).await? {
            Ok(Change::Unchanged)
        } else {
            Ok(Change::Missing)
        }
    }
}

/// The blog was deleted between the existence check and the insert.
fn is_fk_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

const BLOG_COLUMNS: &str = "id, author_id, title, description, tags, created_at, updated_at";

#[async_trait]
impl BlogRepository for PgBlogRepository {
    async fn insert(&self, blog: &Blog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blogs (id, author_id, title, description, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(blog.id)
        .bind(blog.author_id())
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(&blog.tags)
        .bind(blog.created_at)
        .bind(blog.updated_at)
        .execute(&self.db)
        .await
        .context("insert blog")?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Blog>> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get blog")?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.load_children(vec![row]).await?.pop())
    }

    async fn list(&self, filter: &BlogFilter, sort: BlogSort) -> anyhow::Result<Vec<Blog>> {
        // Column and direction come from closed enums, never from input.
        let sql = format!(
            r#"
            SELECT {BLOG_COLUMNS}
              FROM blogs
             WHERE ($1::text IS NULL OR $1 = ANY(tags))
               AND ($2::text IS NULL
                    OR strpos(lower(title), lower($2)) > 0
                    OR strpos(lower(description), lower($2)) > 0)
             ORDER BY {} {}, id ASC
            "#,
            sort.field.order_expr(),
            sort.direction.keyword(),
        );
        let rows = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(filter.tag.as_deref())
            .bind(filter.search.as_deref())
            .fetch_all(&self.db)
            .await
            .context("list blogs")?;
        self.load_children(rows).await
    }

    async fn update(&self, id: Uuid, patch: BlogPatch, now: OffsetDateTime) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE blogs
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   tags = COALESCE($4::text[], tags),
                   updated_at = $5
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title.map(|t| t.trim().to_owned()))
        .bind(patch.description.map(|d| d.trim().to_owned()))
        .bind(patch.tags.map(|t| t.into_inner()))
        .bind(now)
        .execute(&self.db)
        .await
        .context("update blog")?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        // comments and likes go with it (ON DELETE CASCADE)
        let res = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete blog")?;
        Ok(res.rows_affected() == 1)
    }

    async fn push_comment(&self, blog_id: Uuid, comment: &Comment) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO blog_comments (id, blog_id, user_id, text, created_at)
            SELECT $1::uuid, $2::uuid, $3::uuid, $4::text, $5::timestamptz
             WHERE EXISTS (SELECT 1 FROM blogs WHERE id = $2)
            "#,
        )
        .bind(comment.id)
        .bind(blog_id)
        .bind(comment.user_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.db)
        .await;
        match res {
            Ok(res) => Ok(res.rows_affected() == 1),
            Err(e) if is_fk_violation(&e) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("insert comment")),
        }
    }

    async fn remove_comment(&self, blog_id: Uuid, comment_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM blog_comments WHERE blog_id = $1 AND id = $2")
            .bind(blog_id)
            .bind(comment_id)
            .execute(&self.db)
            .await
            .context("delete comment")?;
        Ok(res.rows_affected() == 1)
    }

    async fn add_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change> {
        let res = sqlx::query(
            r#"
            INSERT INTO blog_likes (blog_id, user_id)
            SELECT $1::uuid, $2::uuid
             WHERE EXISTS (SELECT 1 FROM blogs WHERE id = $1)
            ON CONFLICT (blog_id, user_id) DO NOTHING
            "#,
        )
        .bind(blog_id)
        .bind(user_id)
        .execute(&self.db)
        .await;
        match res {
            Ok(res) => self.change_or_missing(res.rows_affected() == 1, blog_id).await,
            Err(e) if is_fk_violation(&e) => Ok(Change::Missing),
            Err(e) => Err(anyhow::Error::new(e).context("insert like")),
        }
    }

    async fn remove_like(&self, blog_id: Uuid, user_id: Uuid) -> anyhow::Result<Change> {
        let res = sqlx::query("DELETE FROM blog_likes WHERE blog_id = $1 AND user_id = $2")
            .bind(blog_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete like")?;
        self.change_or_missing(res.rows_affected() == 1, blog_id)
            .await
    }

    async fn count_blogs(&self) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blogs")
            .fetch_one(&self.db)
            .await
            .context("count blogs")?;
        Ok(n)
    }
}
