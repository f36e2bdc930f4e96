use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_catalog::contains_pattern;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement, Value};
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User, UserFilter};
use crate::repository::UserRepository;

/// `roles` is a `text[]` column; it crosses the driver as a comma-joined string.
const USER_COLUMNS: &str = "id, username, email, password_hash, \
     array_to_string(roles, ',') AS roles, is_active, date_joined, updated_at";

/// PostgreSQL implementation of UserRepository using SeaORM
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, sql: String, values: Vec<Value>) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
        let row = UserRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(User::from))
    }

    async fn exists(&self, sql: &str, value: &str) -> UserResult<bool> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [value.into()]);
        let row = ExistsRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.is_some_and(|r| r.found))
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    roles: String,
    is_active: bool,
    date_joined: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromQueryResult)]
struct ExistsRow {
    found: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let roles = row
            .roles
            .split(',')
            .filter_map(|s| s.trim().parse::<Role>().ok())
            .collect();

        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles,
            is_active: row.is_active,
            date_joined: row.date_joined,
            updated_at: row.updated_at,
        }
    }
}

fn roles_text(user: &User) -> String {
    user.role_names().join(",")
}

/// Unique violations name the offending constraint (`users_email_key`,
/// `users_username_key` or the lower() indexes)
fn map_write_error(err: DbErr, user: &User) -> UserError {
    let message = err.to_string();
    if message.contains("duplicate key") || message.contains("unique constraint") {
        if message.contains("username") {
            UserError::DuplicateUsername(user.username.clone())
        } else {
            UserError::DuplicateEmail(user.email.clone())
        }
    } else {
        UserError::Internal(format!("Database error: {}", err))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, roles, is_active, date_joined, updated_at) \
             VALUES ($1, $2, $3, $4, string_to_array($5, ','), $6, $7, $8) \
             RETURNING {}",
            USER_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.username.clone().into(),
                user.email.clone().into(),
                user.password_hash.clone().into(),
                roles_text(&user).into(),
                user.is_active.into(),
                user.date_joined.into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error(e, &user))?
            .ok_or_else(|| UserError::Internal("Failed to create user".to_string()))?;

        tracing::info!(user_id = %row.id, "Created user");
        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        self.fetch_one(
            format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS),
            vec![id.into()],
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.fetch_one(
            format!(
                "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
                USER_COLUMNS
            ),
            vec![email.into()],
        )
        .await
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            values.push(contains_pattern(term).into());
            conditions.push(format!(
                "(username ILIKE ${n} OR email ILIKE ${n})",
                n = values.len()
            ));
        }
        if let Some(active) = filter.is_active {
            values.push(active.into());
            conditions.push(format!("is_active = ${}", values.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        values.push((filter.limit.min(i64::MAX as u64) as i64).into());
        values.push((filter.offset.min(i64::MAX as u64) as i64).into());
        let sql = format!(
            "SELECT {} FROM users {} ORDER BY date_joined DESC, id DESC LIMIT ${} OFFSET ${}",
            USER_COLUMNS,
            where_clause,
            values.len() - 1,
            values.len()
        );

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
        let rows = UserRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let sql = format!(
            "UPDATE users \
             SET username = $2, email = $3, password_hash = $4, roles = string_to_array($5, ','), \
                 is_active = $6, updated_at = $7 \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.username.clone().into(),
                user.email.clone().into(),
                user.password_hash.clone().into(),
                roles_text(&user).into(),
                user.is_active.into(),
                user.updated_at.into(),
            ],
        );

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_error(e, &user))?;

        row.map(User::from).ok_or(UserError::NotFound(user.id))
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM users WHERE id = $1",
            [id.into()],
        );
        let result = self.db.execute_raw(stmt).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1)) AS found",
            email,
        )
        .await
    }

    async fn username_exists(&self, username: &str) -> UserResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1)) AS found",
            username,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn row(user: &User) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", user.id.into()),
            ("username", user.username.clone().into()),
            ("email", user.email.clone().into()),
            ("password_hash", user.password_hash.clone().into()),
            ("roles", roles_text(user).into()),
            ("is_active", user.is_active.into()),
            ("date_joined", user.date_joined.into()),
            ("updated_at", user.updated_at.into()),
        ])
    }

    fn sample() -> User {
        let mut user = User::new(
            "toni".to_string(),
            "toni@example.com".to_string(),
            "hash".to_string(),
        );
        user.roles.push(Role::Admin);
        user
    }

    #[tokio::test]
    async fn test_get_by_email_maps_roles() {
        let user = sample();
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([vec![row(&user)]])
            .into_connection();
        let repo = PgUserRepository::new(db);

        let found = repo.get_by_email("TONI@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.roles, vec![Role::User, Role::Admin]);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
            .into_connection();
        let repo = PgUserRepository::new(db);

        assert!(matches!(
            repo.update(sample()).await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_username_exists() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([("found", Value::from(true))])]])
            .into_connection();
        let repo = PgUserRepository::new(db);

        assert!(repo.username_exists("TONI").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_rows() {
        let db = MockDatabase::new(DbBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let repo = PgUserRepository::new(db);

        assert!(repo.delete(Uuid::now_v7()).await.unwrap());
    }

    #[test]
    fn test_unique_violation_mapping() {
        let user = sample();
        let err = DbErr::Custom(
            "duplicate key value violates unique constraint \"users_username_key\"".to_string(),
        );
        assert!(matches!(
            map_write_error(err, &user),
            UserError::DuplicateUsername(_)
        ));

        let err = DbErr::Custom(
            "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
        );
        assert!(matches!(map_write_error(err, &user), UserError::DuplicateEmail(_)));
    }
}
