use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::database::models::{AutoDecisionReason, Claim, ClaimStatus};
use crate::money;

const CLAIM_COLUMNS: &str = r#"
    id,
    tenant_id,
    employee_id,
    claim_date,
    category,
    amount,
    receipt_ref,
    status,
    auto_approved,
    auto_approval_reason,
    receipt_hash,
    extracted_fields,
    consumed_by_payroll_item_id,
    decided_by,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct ClaimRepository {
    pool: SqlitePool,
}

impl ClaimRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, claim: &Claim) -> Result<Claim> {
        sqlx::query(
            r#"
            INSERT INTO
                claims (
                    id, tenant_id, employee_id, claim_date, category, amount,
                    receipt_ref, status, auto_approved, auto_approval_reason,
                    receipt_hash, extracted_fields, consumed_by_payroll_item_id,
                    decided_by, created_at, updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(claim.id)
        .bind(claim.tenant_id)
        .bind(claim.employee_id)
        .bind(claim.claim_date)
        .bind(&claim.category)
        .bind(money::amount_to_db(&claim.amount))
        .bind(&claim.receipt_ref)
        .bind(claim.status)
        .bind(claim.auto_approved)
        .bind(claim.auto_approval_reason)
        .bind(&claim.receipt_hash)
        .bind(
            claim
                .extracted_fields
                .as_ref()
                .map(|v| v.to_string()),
        )
        .bind(claim.consumed_by_payroll_item_id)
        .bind(claim.decided_by)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(claim.tenant_id, claim.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("claim {} vanished after insert", claim.id))
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Claim>> {
        let row = sqlx::query(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE tenant_id = ? AND id = ?"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_claim_row).transpose()
    }

    /// A non-rejected claim anywhere in the tenant carrying the same
    /// receipt digest. Used for duplicate-receipt rejection.
    pub async fn find_by_receipt_hash(
        &self,
        tenant_id: Uuid,
        receipt_hash: &str,
    ) -> Result<Option<Claim>> {
        let row = sqlx::query(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE tenant_id = ? AND receipt_hash = ? AND status != 'rejected' \
             LIMIT 1"
        ))
        .bind(tenant_id)
        .bind(receipt_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_claim_row).transpose()
    }

    /// Approved, not-yet-consumed claims dated on or before `through`.
    /// Claims from an already-finalized month surface here too, so they
    /// land in the next open draft.
    pub async fn list_unconsumed_approved(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        through: NaiveDate,
    ) -> Result<Vec<Claim>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE tenant_id = ? AND employee_id = ? \
               AND status = 'approved' \
               AND consumed_by_payroll_item_id IS NULL \
               AND claim_date <= ? \
             ORDER BY claim_date, id"
        ))
        .bind(tenant_id)
        .bind(employee_id)
        .bind(through)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_claim_row).collect()
    }

    /// Record a decision on a pending claim. Returns false when the claim
    /// was no longer pending, so supervisors cannot overwrite an earlier
    /// decision.
    pub async fn set_decision(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: ClaimStatus,
        auto_approved: bool,
        reason: Option<AutoDecisionReason>,
        decided_by: Option<Uuid>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = ?,
                auto_approved = ?,
                auto_approval_reason = ?,
                decided_by = ?,
                updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(auto_approved)
        .bind(reason)
        .bind(decided_by)
        .bind(Utc::now())
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Consume one claim inside the finalize transaction. The NULL guard
    /// is the single-consumption invariant: whichever run commits first
    /// wins, the loser sees zero rows affected.
    pub async fn consume_tx(
        &self,
        conn: &mut SqliteConnection,
        claim_id: Uuid,
        item_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET consumed_by_payroll_item_id = ?, updated_at = ?
            WHERE id = ? AND consumed_by_payroll_item_id IS NULL
            "#,
        )
        .bind(item_id)
        .bind(Utc::now())
        .bind(claim_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn map_claim_row(row: SqliteRow) -> Result<Claim> {
    let extracted_fields = row
        .try_get::<Option<String>, _>("extracted_fields")?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;

    Ok(Claim {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        employee_id: row.try_get("employee_id")?,
        claim_date: row.try_get("claim_date")?,
        category: row.try_get("category")?,
        amount: money::decimal_from_db(&row.try_get::<String, _>("amount")?)?,
        receipt_ref: row.try_get("receipt_ref")?,
        status: row.try_get("status")?,
        auto_approved: row.try_get("auto_approved")?,
        auto_approval_reason: row.try_get("auto_approval_reason")?,
        receipt_hash: row.try_get("receipt_hash")?,
        extracted_fields,
        consumed_by_payroll_item_id: row.try_get("consumed_by_payroll_item_id")?,
        decided_by: row.try_get("decided_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
