//! SQLite collection of templates, groups and records.
//!
//! Field names live on the template and field values on the record, both as
//! JSON arrays in template order.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use voxfill_core::error::AppError;
use voxfill_core::models::{Field, GroupId, Record, RecordId, TemplateId};
use voxfill_core::ports::RecordStore;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS templates (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        fields TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY,
        group_id INTEGER NOT NULL REFERENCES groups(id),
        template_id INTEGER NOT NULL REFERENCES templates(id),
        fields TEXT NOT NULL,
        modified INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

/// Column list for record queries. Must remain a const literal since
/// format!() bypasses sqlx compile-time validation.
const RECORD_COLUMNS: &str =
    "n.id, n.group_id, n.template_id, n.fields, t.fields AS field_names";

/// Repository for the flashcard collection.
///
/// # Examples
///
/// ```no_run
/// use voxfill_store::CollectionRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = CollectionRepository::connect("collection.sqlite".as_ref()).await?;
/// if let Some(group) = repo.group_by_name("German").await? {
///     let records = repo.records_in_group(group).await?;
///     println!("{} records", records.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CollectionRepository {
    pool: SqlitePool,
}

impl CollectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (or creates) the collection file and ensures the schema exists.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(AppError::DatabaseError)?;

        let repo = Self::new(pool);
        repo.init_schema().await?;
        Ok(repo)
    }

    /// Private in-memory collection. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(AppError::DatabaseError)?;

        let repo = Self::new(pool);
        repo.init_schema().await?;
        Ok(repo)
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
        }
        Ok(())
    }

    pub async fn add_template(&self, name: &str, fields: &[&str]) -> Result<TemplateId, AppError> {
        let rec: (i64,) =
            sqlx::query_as("INSERT INTO templates (name, fields) VALUES (?, ?) RETURNING id")
                .bind(name)
                .bind(serde_json::to_string(fields)?)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
        Ok(TemplateId(rec.0))
    }

    pub async fn add_group(&self, name: &str) -> Result<GroupId, AppError> {
        let rec: (i64,) = sqlx::query_as("INSERT INTO groups (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(GroupId(rec.0))
    }

    /// Inserts a record with `values` in template field order.
    pub async fn add_record(
        &self,
        group: GroupId,
        template: TemplateId,
        values: &[&str],
    ) -> Result<RecordId, AppError> {
        let rec: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO notes (group_id, template_id, fields, modified)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(group.0)
        .bind(template.0)
        .bind(serde_json::to_string(values)?)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;
        Ok(RecordId(rec.0))
    }

    /// All records of a group, ordered by id.
    pub async fn records_in_group(&self, group: GroupId) -> Result<Vec<Record>, AppError> {
        let query = format!(
            "SELECT {} FROM notes n JOIN templates t ON t.id = n.template_id \
             WHERE n.group_id = ? ORDER BY n.id",
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(group.0)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    /// Records for `ids`, in the given order. Duplicates are dropped and
    /// unknown ids are skipped with a warning.
    pub async fn records_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>, AppError> {
        let query = format!(
            "SELECT {} FROM notes n JOIN templates t ON t.id = n.template_id WHERE n.id = ?",
            RECORD_COLUMNS
        );

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(*id) {
                continue;
            }
            let row = sqlx::query_as::<_, RecordRow>(&query)
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
            match row {
                Some(row) => records.push(row.into_record()?),
                None => tracing::warn!(record_id = %id, "No record with this id"),
            }
        }
        Ok(records)
    }

    pub async fn group_by_name(&self, name: &str) -> Result<Option<GroupId>, AppError> {
        let rec: Option<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(rec.map(|r| GroupId(r.0)))
    }

    pub async fn group_name(&self, group: GroupId) -> Result<Option<String>, AppError> {
        let rec: Option<(String,)> = sqlx::query_as("SELECT name FROM groups WHERE id = ?")
            .bind(group.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(rec.map(|r| r.0))
    }

    pub async fn template_name(&self, template: TemplateId) -> Result<Option<String>, AppError> {
        let rec: Option<(String,)> = sqlx::query_as("SELECT name FROM templates WHERE id = ?")
            .bind(template.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(rec.map(|r| r.0))
    }
}

impl RecordStore for CollectionRepository {
    /// Writes the field values back and bumps the modification time.
    async fn persist(&self, record: &Record) -> Result<(), AppError> {
        let values: Vec<&str> = record.fields.iter().map(|f| f.value.as_str()).collect();
        let result = sqlx::query("UPDATE notes SET fields = ?, modified = ? WHERE id = ?")
            .bind(serde_json::to_string(&values)?)
            .bind(Utc::now().timestamp())
            .bind(record.id.0)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(AppError::DatabaseError(sqlx::Error::RowNotFound));
        }
        tracing::debug!(record_id = %record.id, "Record persisted");
        Ok(())
    }
}

/// Helper struct for deserializing record query results
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    group_id: i64,
    template_id: i64,
    fields: String,
    field_names: String,
}

impl RecordRow {
    fn into_record(self) -> Result<Record, AppError> {
        let names: Vec<String> = serde_json::from_str(&self.field_names)?;
        let mut values: Vec<String> = serde_json::from_str(&self.fields)?;
        values.resize(names.len(), String::new());

        let fields = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| Field { name, value })
            .collect();

        Ok(Record::new(
            RecordId(self.id),
            GroupId(self.group_id),
            TemplateId(self.template_id),
            fields,
        ))
    }
}
