use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use tracing::info;

use issue_desk_core::{Issue, IssueDetails, IssueStatus, NewIssue};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to operate on issues.
    pub fn issues(&self) -> IssueRepository {
        IssueRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(stage = "storage", "connection pool closed");
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

const ISSUE_COLUMNS: &str = "id, full_name, contact_info, preferred_contact_method, \
     has_china_experience, has_supplier_contacts, product_description, \
     existing_product_links, volume, weight, density, previous_invoice_file, \
     expected_delivery_date, status, created_at, updated_at, deleted_at";

/// Repository for the `issues` table.
///
/// Every read and write is restricted to rows whose `deleted_at` is NULL.
#[derive(Clone)]
pub struct IssueRepository {
    pool: SqlitePool,
}

impl IssueRepository {
    /// Inserts a new issue and returns the stored record with its assigned id.
    pub async fn insert(
        &self,
        issue: &NewIssue,
        now: DateTime<Utc>,
    ) -> Result<Issue, IssueStoreError> {
        let details = &issue.details;
        let timestamp = to_rfc3339(now);
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "INSERT INTO issues \
             (full_name, contact_info, preferred_contact_method, has_china_experience, \
              has_supplier_contacts, product_description, existing_product_links, volume, \
              weight, density, previous_invoice_file, expected_delivery_date, status, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(&details.full_name)
        .bind(&details.contact_info)
        .bind(&details.preferred_contact_method)
        .bind(details.has_china_experience)
        .bind(details.has_supplier_contacts)
        .bind(&details.product_description)
        .bind(&details.existing_product_links)
        .bind(details.volume)
        .bind(details.weight)
        .bind(details.density)
        .bind(&details.previous_invoice_file)
        .bind(&details.expected_delivery_date)
        .bind(issue.status.as_str())
        .bind(&timestamp)
        .bind(&timestamp)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    /// Loads a live issue by id.
    pub async fn fetch(&self, id: u32) -> Result<Issue, IssueStoreError> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(IssueStoreError::NotFound(id))?;

        row.into_domain()
    }

    /// Lists every live issue, newest first.
    pub async fn list(&self) -> Result<Vec<Issue>, IssueStoreError> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues \
             WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IssueRow::into_domain).collect()
    }

    /// Overwrites the mutable columns of a live issue and returns the row as stored.
    ///
    /// `created_at` and `deleted_at` are never touched by a save. Timestamps
    /// come back at the stored millisecond precision.
    pub async fn save(&self, issue: &Issue) -> Result<Issue, IssueStoreError> {
        let details = &issue.details;
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "UPDATE issues \
             SET full_name = ?, contact_info = ?, preferred_contact_method = ?, \
                 has_china_experience = ?, has_supplier_contacts = ?, \
                 product_description = ?, existing_product_links = ?, \
                 volume = ?, weight = ?, density = ?, previous_invoice_file = ?, \
                 expected_delivery_date = ?, status = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL \
             RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(&details.full_name)
        .bind(&details.contact_info)
        .bind(&details.preferred_contact_method)
        .bind(details.has_china_experience)
        .bind(details.has_supplier_contacts)
        .bind(&details.product_description)
        .bind(&details.existing_product_links)
        .bind(details.volume)
        .bind(details.weight)
        .bind(details.density)
        .bind(&details.previous_invoice_file)
        .bind(&details.expected_delivery_date)
        .bind(issue.status.as_str())
        .bind(to_rfc3339(issue.updated_at))
        .bind(i64::from(issue.id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(IssueStoreError::NotFound(issue.id))?;

        row.into_domain()
    }

    /// Marks a live issue as deleted. The row and its id stay reserved.
    pub async fn soft_delete(&self, id: u32, now: DateTime<Utc>) -> Result<(), IssueStoreError> {
        let timestamp = to_rfc3339(now);
        let result = sqlx::query(
            "UPDATE issues SET deleted_at = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(i64::from(id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IssueStoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Errors that can occur while reading or writing issues.
#[derive(Debug, Error)]
pub enum IssueStoreError {
    #[error("issue {0} not found")]
    NotFound(u32),
    #[error("stored issue is malformed: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IssueStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Raw row shape of the `issues` table.
#[derive(Debug, sqlx::FromRow)]
struct IssueRow {
    id: i64,
    full_name: String,
    contact_info: String,
    preferred_contact_method: String,
    has_china_experience: bool,
    has_supplier_contacts: bool,
    product_description: String,
    existing_product_links: String,
    volume: Option<f64>,
    weight: Option<f64>,
    density: Option<f64>,
    previous_invoice_file: Option<String>,
    expected_delivery_date: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl IssueRow {
    fn into_domain(self) -> Result<Issue, IssueStoreError> {
        let id = u32::try_from(self.id)
            .map_err(|_| IssueStoreError::Corrupt(format!("id {} out of range", self.id)))?;
        let status: IssueStatus = self
            .status
            .parse()
            .map_err(|err| IssueStoreError::Corrupt(format!("issue {id}: {err}")))?;

        Ok(Issue {
            id,
            details: IssueDetails {
                full_name: self.full_name,
                contact_info: self.contact_info,
                preferred_contact_method: self.preferred_contact_method,
                has_china_experience: self.has_china_experience,
                has_supplier_contacts: self.has_supplier_contacts,
                product_description: self.product_description,
                existing_product_links: self.existing_product_links,
                volume: self.volume,
                weight: self.weight,
                density: self.density,
                previous_invoice_file: self.previous_invoice_file,
                expected_delivery_date: self.expected_delivery_date,
            },
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
