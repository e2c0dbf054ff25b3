use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Blog post record. `author_id` is fixed at creation; no query here ever
/// rewrites it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Post {
    pub async fn create(
        db: &PgPool,
        id: Uuid,
        author_id: Uuid,
        title: &str,
        content: &str,
        image_key: Option<&str>,
    ) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, title, content, image_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, title, content, image_key, created_at
            "#,
        )
        .bind(id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(image_key)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, image_key, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    /// All posts in creation order, visible to any authenticated caller.
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, image_key, created_at
            FROM posts
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Sparse update: NULL arguments leave the stored value untouched.
    /// Last writer wins on concurrent updates.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
        image_key: Option<&str>,
    ) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                image_key = COALESCE($4, image_key)
            WHERE id = $1
            RETURNING id, author_id, title, content, image_key, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(image_key)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }
}
