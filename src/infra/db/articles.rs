use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::repos::{
        ArticleField, ArticleListRecord, ArticlesRepo, CreateArticleParams, RepoError,
    },
    domain::entities::ArticleRecord,
    domain::types::ArticleState,
};

use super::{PostgresRepositories, map_sqlx_error, to_i64, unix_now};

const ARTICLE_COLUMNS: &str = "id, weight, category_id, title, views, preview, content, \
    picture, sentence, state, created_at, updated_at";
const LIST_COLUMNS: &str = "id, category_id, title, preview, views, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    weight: i64,
    category_id: i64,
    title: String,
    views: i64,
    preview: String,
    content: String,
    picture: String,
    sentence: String,
    state: ArticleState,
    created_at: i64,
    updated_at: i64,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            weight: row.weight,
            category_id: row.category_id,
            title: row.title,
            views: row.views,
            preview: row.preview,
            content: row.content,
            picture: row.picture,
            sentence: row.sentence,
            state: row.state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ArticleListRow {
    id: i64,
    category_id: i64,
    title: String,
    preview: String,
    views: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<ArticleListRow> for ArticleListRecord {
    fn from(row: ArticleListRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            title: row.title,
            preview: row.preview,
            views: row.views,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial `UPDATE` touching only `fields`, plus `updated_at`.
fn field_update<'a>(
    article: &'a ArticleRecord,
    fields: &[ArticleField],
) -> Result<QueryBuilder<'a, Postgres>, RepoError> {
    if fields.is_empty() {
        return Err(RepoError::InvalidInput {
            message: "no article fields selected for update".to_string(),
        });
    }

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE articles SET ");
    {
        let mut set = qb.separated(", ");
        for field in fields {
            set.push(format!("{} = ", field.column()));
            match field {
                ArticleField::Weight => set.push_bind_unseparated(article.weight),
                ArticleField::CategoryId => set.push_bind_unseparated(article.category_id),
                ArticleField::Title => set.push_bind_unseparated(&article.title),
                ArticleField::Preview => set.push_bind_unseparated(&article.preview),
                ArticleField::Content => set.push_bind_unseparated(&article.content),
                ArticleField::Picture => set.push_bind_unseparated(&article.picture),
                ArticleField::Sentence => set.push_bind_unseparated(&article.sentence),
                ArticleField::State => set.push_bind_unseparated(article.state),
            };
        }
        set.push("updated_at = ");
        set.push_bind_unseparated(unix_now());
    }
    qb.push(" WHERE id = ");
    qb.push_bind(article.id);
    Ok(qb)
}

/// `LIMIT NULL` means no limit in Postgres.
fn limit_bind(limit: u64) -> Option<i64> {
    (limit > 0).then(|| to_i64(limit))
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND state = $2"
        ))
        .bind(id)
        .bind(ArticleState::Active)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleRecord::from))
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let now = unix_now();
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles \
                (weight, category_id, title, views, preview, content, picture, sentence, state, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, 0, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(params.weight)
        .bind(params.category_id)
        .bind(&params.title)
        .bind(&params.preview)
        .bind(&params.content)
        .bind(&params.picture)
        .bind(&params.sentence)
        .bind(ArticleState::Active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let bumped =
            sqlx::query("UPDATE categories SET article_count = article_count + 1 WHERE id = $1")
                .bind(params.category_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::ReferenceNotFound { entity: "category" });
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_article_fields(
        &self,
        article: &ArticleRecord,
        fields: &[ArticleField],
    ) -> Result<(), RepoError> {
        let mut qb = field_update(article, fields)?;
        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn move_article(
        &self,
        article: &ArticleRecord,
        from_category: i64,
        fields: &[ArticleField],
    ) -> Result<(), RepoError> {
        let mut qb = field_update(article, fields)?;
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let updated = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::NotFound);
        }

        sqlx::query(
            "UPDATE categories SET article_count = GREATEST(article_count - 1, 0) WHERE id = $1",
        )
        .bind(from_category)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let bumped =
            sqlx::query("UPDATE categories SET article_count = article_count + 1 WHERE id = $1")
                .bind(article.category_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if bumped.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::ReferenceNotFound { entity: "category" });
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn soft_delete_article(&self, id: i64) -> Result<Option<i64>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let category_id: Option<i64> = sqlx::query_scalar(
            "UPDATE articles SET state = $2, updated_at = $3 \
             WHERE id = $1 AND state = $4 \
             RETURNING category_id",
        )
        .bind(id)
        .bind(ArticleState::Deleted)
        .bind(unix_now())
        .bind(ArticleState::Active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(category_id) = category_id else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        // The category may already be gone; nothing to decrement then.
        sqlx::query(
            "UPDATE categories SET article_count = GREATEST(article_count - 1, 0) WHERE id = $1",
        )
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(category_id))
    }

    async fn increment_views(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE articles SET views = views + 1 WHERE id = $1 AND state = $2")
            .bind(id)
            .bind(ArticleState::Active)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_articles(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE state = $1")
            .bind(ArticleState::Active)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn count_articles_in_category(&self, category_id: i64) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM articles WHERE category_id = $1 AND state = $2",
        )
        .bind(category_id)
        .bind(ArticleState::Active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn list_articles(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ArticleListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM articles \
             WHERE state = $1 \
             ORDER BY created_at DESC, id DESC \
             OFFSET $2 LIMIT $3"
        ))
        .bind(ArticleState::Active)
        .bind(to_i64(offset))
        .bind(limit_bind(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleListRecord::from).collect())
    }

    async fn list_articles_in_category(
        &self,
        category_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ArticleListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM articles \
             WHERE category_id = $1 AND state = $2 \
             ORDER BY created_at DESC, id DESC \
             OFFSET $3 LIMIT $4"
        ))
        .bind(category_id)
        .bind(ArticleState::Active)
        .bind(to_i64(offset))
        .bind(limit_bind(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleListRecord::from).collect())
    }

    async fn list_featured_articles(
        &self,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ArticleListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM articles \
             WHERE weight > 0 AND state = $1 \
             ORDER BY weight DESC, created_at DESC \
             LIMIT $2"
        ))
        .bind(ArticleState::Active)
        .bind(limit_bind(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleListRecord::from).collect())
    }
}
