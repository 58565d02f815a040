//! Idempotent DDL unit tasks against PostgreSQL, plus database/schema existence checks.

use crate::capability::{BootstrapTask, TaskOutcome};
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use regex::Regex;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::OnceLock;

const AUDIT_COLUMNS: [(&str, &str); 2] = [
    ("created_at", "TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
    ("updated_at", "TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
];

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("constant identifier pattern"))
}

pub fn check_identifier(name: &str) -> Result<&str, ConfigError> {
    if identifier_re().is_match(name) {
        Ok(name)
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted table name.
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// Failure fails the unit.
    Required(String),
    /// Failure is logged and ignored (follow-up ALTERs on tables that may predate them).
    BestEffort(String),
}

impl Statement {
    pub fn sql(&self) -> &str {
        match self {
            Statement::Required(s) | Statement::BestEffort(s) => s,
        }
    }
}

/// Static description of one table. `{schema}` in column, constraint, index and alter text is
/// replaced with the quoted schema name.
#[derive(Clone, Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub constraints: &'static [&'static str],
    /// Full `CREATE INDEX IF NOT EXISTS ...` statements.
    pub indexes: &'static [&'static str],
    /// Follow-up migrations for tables created by older releases.
    pub alters: &'static [&'static str],
}

impl TableDef {
    pub fn create_sql(&self, schema: &str) -> String {
        let q_schema = quote_ident(schema);
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.replace("{schema}", &q_schema))
            .collect();
        for (name, def) in AUDIT_COLUMNS {
            let declared = self
                .columns
                .iter()
                .any(|c| c.split_whitespace().next() == Some(name));
            if !declared {
                defs.push(format!("{} {}", name, def));
            }
        }
        defs.extend(self.constraints.iter().map(|c| c.replace("{schema}", &q_schema)));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            qualified(schema, self.name),
            defs.join(",\n  ")
        )
    }

    /// CREATE TABLE, then indexes (required), then alters (best effort).
    pub fn statements(&self, schema: &str) -> Vec<Statement> {
        let q_schema = quote_ident(schema);
        let mut out = vec![Statement::Required(self.create_sql(schema))];
        out.extend(
            self.indexes
                .iter()
                .map(|s| Statement::Required(s.replace("{schema}", &q_schema))),
        );
        out.extend(
            self.alters
                .iter()
                .map(|s| Statement::BestEffort(s.replace("{schema}", &q_schema))),
        );
        out
    }
}

/// Runs its statements in order on the pool.
pub struct DdlTask {
    pool: PgPool,
    statements: Vec<Statement>,
}

impl DdlTask {
    pub fn new(pool: PgPool, statements: Vec<Statement>) -> Self {
        DdlTask { pool, statements }
    }
}

#[async_trait]
impl BootstrapTask for DdlTask {
    async fn run(&self) -> Result<TaskOutcome, AppError> {
        if self.statements.is_empty() {
            return Ok(TaskOutcome::Skipped("no statements".into()));
        }
        for statement in &self.statements {
            tracing::debug!(sql = %statement.sql(), "ddl");
            match statement {
                Statement::Required(sql) => {
                    sqlx::query(sql).execute(&self.pool).await?;
                }
                Statement::BestEffort(sql) => {
                    if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                        tracing::debug!(error = %e, "best-effort ddl ignored");
                    }
                }
            }
        }
        Ok(TaskOutcome::Completed)
    }
}

pub async fn ensure_schema_exists(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    check_identifier(schema)?;
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
        .execute(pool)
        .await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split a URL into (admin URL on the `postgres` database, database name).
pub fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| i + scheme_end + 1)
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAVORITES: TableDef = TableDef {
        name: "favorites",
        columns: &[
            "id BIGSERIAL PRIMARY KEY",
            "user_id BIGINT NOT NULL REFERENCES {schema}.users(id) ON DELETE CASCADE",
            "created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        ],
        constraints: &["UNIQUE (user_id, listing_id)"],
        indexes: &["CREATE INDEX IF NOT EXISTS favorites_user_idx ON {schema}.favorites (user_id)"],
        alters: &["ALTER TABLE {schema}.favorites ADD COLUMN IF NOT EXISTS note TEXT"],
    };

    #[test]
    fn create_sql_is_idempotent_and_qualified() {
        let sql = FAVORITES.create_sql("estate");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"estate\".\"favorites\""));
        assert!(sql.contains("REFERENCES \"estate\".users(id)"));
        assert!(sql.contains("UNIQUE (user_id, listing_id)"));
    }

    #[test]
    fn audit_columns_are_added_once() {
        let sql = FAVORITES.create_sql("public");
        assert_eq!(sql.matches("created_at").count(), 1);
        assert_eq!(sql.matches("updated_at").count(), 1);
    }

    #[test]
    fn statements_keep_order_and_kinds() {
        let stmts = FAVORITES.statements("public");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Statement::Required(ref s) if s.starts_with("CREATE TABLE")));
        assert!(matches!(stmts[1], Statement::Required(ref s) if s.contains("\"public\".favorites")));
        assert!(matches!(stmts[2], Statement::BestEffort(ref s) if s.contains("ADD COLUMN IF NOT EXISTS")));
    }

    #[test]
    fn identifiers_are_checked() {
        assert!(check_identifier("estate_v2").is_ok());
        assert!(check_identifier("bad-name").is_err());
        assert!(check_identifier("1abc").is_err());
        assert!(check_identifier("x; DROP TABLE users").is_err());
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn parses_database_name() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/estate").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "estate");

        let (admin, name) =
            parse_db_name_from_url("postgres://localhost/estate?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres?sslmode=disable");
        assert_eq!(name, "estate");
    }

    #[test]
    fn url_without_path_is_rejected() {
        assert!(parse_db_name_from_url("postgres://localhost").is_err());
    }
}
