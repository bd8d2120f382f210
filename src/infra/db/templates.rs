use async_trait::async_trait;

use crate::{
    application::repos::{EmailTemplatesRepo, RepoError},
    domain::entities::EmailTemplateRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: i64,
    name: String,
    content: String,
}

#[async_trait]
impl EmailTemplatesRepo for PostgresRepositories {
    async fn find_template(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplateRecord>, RepoError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT id, name, content FROM email_templates WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| EmailTemplateRecord {
            id: row.id,
            name: row.name,
            content: row.content,
        }))
    }
}
