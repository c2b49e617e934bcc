use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::database::models::{PayrollRun, RunStatus};

const RUN_COLUMNS: &str = r#"
    id,
    tenant_id,
    year,
    month,
    group_scope,
    status,
    tenant_tz,
    created_at,
    finalized_at
"#;

#[derive(Clone)]
pub struct PayrollRunRepository {
    pool: SqlitePool,
}

impl PayrollRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a draft run unless one already exists for the same
    /// (tenant, year, month, scope); either way return the current row.
    /// The unique index on the period key makes this idempotent.
    pub async fn insert_draft(
        &self,
        tenant_id: Uuid,
        year: i64,
        month: i64,
        group_scope: Option<&str>,
        tenant_tz: &str,
    ) -> Result<PayrollRun> {
        sqlx::query(
            r#"
            INSERT INTO
                payroll_runs (id, tenant_id, year, month, group_scope, status, tenant_tz, created_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(year)
        .bind(month)
        .bind(group_scope)
        .bind(RunStatus::Draft)
        .bind(tenant_tz)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.find_by_period(tenant_id, year, month, group_scope)
            .await?
            .ok_or_else(|| anyhow::anyhow!("run for {}-{:02} vanished after insert", year, month))
    }

    pub async fn find_by_period(
        &self,
        tenant_id: Uuid,
        year: i64,
        month: i64,
        group_scope: Option<&str>,
    ) -> Result<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM payroll_runs \
             WHERE tenant_id = ? AND year = ? AND month = ? \
               AND IFNULL(group_scope, '') = IFNULL(?, '')"
        ))
        .bind(tenant_id)
        .bind(year)
        .bind(month)
        .bind(group_scope)
        .fetch_optional(&self.pool)
        .await?;

        Ok(run)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM payroll_runs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(run)
    }

    /// Re-read a run inside a transaction; the write lock taken by the
    /// transaction serializes concurrent finalize attempts.
    pub async fn find_by_id_tx(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM payroll_runs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(run)
    }

    /// Guarded status flip: only applies when the row still holds `from`.
    pub async fn transition_tx(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        from: RunStatus,
        to: RunStatus,
        finalized_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payroll_runs
            SET status = ?,
                finalized_at = COALESCE(?, finalized_at)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(finalized_at)
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
