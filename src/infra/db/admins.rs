use async_trait::async_trait;

use crate::{
    application::repos::{AdminsRepo, RepoError},
    domain::entities::AdminRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    name: String,
    password: String,
    salt: String,
}

#[async_trait]
impl AdminsRepo for PostgresRepositories {
    async fn find_admin_by_name(&self, name: &str) -> Result<Option<AdminRecord>, RepoError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, name, password, salt FROM admins WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| AdminRecord {
            id: row.id,
            name: row.name,
            password: row.password,
            salt: row.salt,
        }))
    }
}
