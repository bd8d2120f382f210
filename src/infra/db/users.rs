use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::repos::{CreateUserParams, RepoError, UserField, UsersRepo},
    domain::entities::UserRecord,
    domain::types::Gender,
};

use super::{PostgresRepositories, map_sqlx_error, unix_now};

const USER_COLUMNS: &str = "id, name, password, salt, gender, introduce, github, email, \
    created_at, updated_at, login_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    password: String,
    salt: String,
    gender: Gender,
    introduce: String,
    github: String,
    email: String,
    created_at: i64,
    updated_at: i64,
    login_at: i64,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            password: row.password,
            salt: row.salt,
            gender: row.gender,
            introduce: row.introduce,
            github: row.github,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
            login_at: row.login_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_user_id_by_name(&self, name: &str) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let now = unix_now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
                (name, password, salt, gender, introduce, github, email, created_at, updated_at, login_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 0) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&params.name)
        .bind(&params.password)
        .bind(&params.salt)
        .bind(params.gender)
        .bind(&params.introduce)
        .bind(&params.github)
        .bind(&params.email)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_user_fields(
        &self,
        user: &UserRecord,
        fields: &[UserField],
    ) -> Result<(), RepoError> {
        if fields.is_empty() {
            return Err(RepoError::InvalidInput {
                message: "no user fields selected for update".to_string(),
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            for field in fields {
                set.push(format!("{} = ", field.column()));
                match field {
                    UserField::Name => set.push_bind_unseparated(&user.name),
                    UserField::Password => set.push_bind_unseparated(&user.password),
                    UserField::Salt => set.push_bind_unseparated(&user.salt),
                    UserField::Gender => set.push_bind_unseparated(user.gender),
                    UserField::Introduce => set.push_bind_unseparated(&user.introduce),
                    UserField::Github => set.push_bind_unseparated(&user.github),
                    UserField::Email => set.push_bind_unseparated(&user.email),
                    UserField::LoginAt => set.push_bind_unseparated(user.login_at),
                };
            }
            set.push("updated_at = ");
            set.push_bind_unseparated(unix_now());
        }
        qb.push(" WHERE id = ");
        qb.push_bind(user.id);

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
}
