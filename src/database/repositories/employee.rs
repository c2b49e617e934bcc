use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::database::models::{CreateEmployeeInput, EmployeeSnapshot, EmploymentStatus};
use crate::money;
use crate::payroll::tables;

const SNAPSHOT_COLUMNS: &str = r#"
    id,
    tenant_id,
    name,
    nric,
    group_name,
    employment_type,
    employment_status,
    basic,
    fixed_allowance,
    hourly_rate,
    daily_rate,
    overtime_rate,
    ph_rate,
    commission_rate,
    epf_no,
    socso_no,
    tax_no,
    bank_name,
    bank_account,
    epf_contribution_type,
    employee_epf_rate,
    join_date,
    last_working_day,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: CreateEmployeeInput) -> Result<EmployeeSnapshot> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let epf_rate = input
            .employee_epf_rate
            .unwrap_or_else(tables::default_employee_epf_rate);

        sqlx::query(
            r#"
            INSERT INTO
                employees (
                    id, tenant_id, name, nric, group_name,
                    employment_type, employment_status,
                    basic, fixed_allowance, hourly_rate, daily_rate,
                    overtime_rate, ph_rate, commission_rate,
                    epf_no, socso_no, tax_no, bank_name, bank_account,
                    epf_contribution_type, employee_epf_rate,
                    join_date, created_at, updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(input.tenant_id)
        .bind(&input.name)
        .bind(&input.nric)
        .bind(&input.group_name)
        .bind(input.employment_type)
        .bind(EmploymentStatus::Active)
        .bind(money::amount_to_db(&input.basic))
        .bind(money::amount_to_db(&input.fixed_allowance))
        .bind(input.hourly_rate.as_ref().map(money::amount_to_db))
        .bind(input.daily_rate.as_ref().map(money::amount_to_db))
        .bind(input.overtime_rate.as_ref().map(money::amount_to_db))
        .bind(input.ph_rate.as_ref().map(money::amount_to_db))
        .bind(input.commission_rate.as_ref().map(money::rate_to_db))
        .bind(&input.epf_no)
        .bind(&input.socso_no)
        .bind(&input.tax_no)
        .bind(&input.bank_name)
        .bind(&input.bank_account)
        .bind(input.epf_contribution_type)
        .bind(money::rate_to_db(&epf_rate))
        .bind(input.join_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(input.tenant_id, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("employee {} vanished after insert", id))
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<EmployeeSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM employees WHERE tenant_id = ? AND id = ?"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_snapshot_row).transpose()
    }

    /// Employees a run will materialize: payable statuses, optionally
    /// narrowed to one department/outlet.
    pub async fn list_payable(
        &self,
        tenant_id: Uuid,
        group_scope: Option<&str>,
    ) -> Result<Vec<EmployeeSnapshot>> {
        let mut query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM employees \
             WHERE tenant_id = ? AND employment_status IN ('active', 'notice', 'clearing')"
        );
        if group_scope.is_some() {
            query.push_str(" AND group_name = ?");
        }
        query.push_str(" ORDER BY name");

        let mut q = sqlx::query(&query).bind(tenant_id);
        if let Some(scope) = group_scope {
            q = q.bind(scope);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(map_snapshot_row).collect()
    }

    /// Update the monthly basic salary on the live record. Historical
    /// payslips are unaffected; items carry their own copy.
    pub async fn update_basic(&self, tenant_id: Uuid, id: Uuid, basic: &BigDecimal) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE employees
            SET basic = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(money::amount_to_db(basic))
        .bind(Utc::now())
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: EmploymentStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE employees
            SET employment_status = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_snapshot_row(row: SqliteRow) -> Result<EmployeeSnapshot> {
    Ok(EmployeeSnapshot {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        nric: row.try_get("nric")?,
        group_name: row.try_get("group_name")?,
        employment_type: row.try_get("employment_type")?,
        employment_status: row.try_get("employment_status")?,
        basic: money::decimal_from_db(&row.try_get::<String, _>("basic")?)?,
        fixed_allowance: money::decimal_from_db(&row.try_get::<String, _>("fixed_allowance")?)?,
        hourly_rate: money::opt_decimal_from_db(row.try_get("hourly_rate")?)?,
        daily_rate: money::opt_decimal_from_db(row.try_get("daily_rate")?)?,
        overtime_rate: money::opt_decimal_from_db(row.try_get("overtime_rate")?)?,
        ph_rate: money::opt_decimal_from_db(row.try_get("ph_rate")?)?,
        commission_rate: money::opt_decimal_from_db(row.try_get("commission_rate")?)?,
        epf_no: row.try_get("epf_no")?,
        socso_no: row.try_get("socso_no")?,
        tax_no: row.try_get("tax_no")?,
        bank_name: row.try_get("bank_name")?,
        bank_account: row.try_get("bank_account")?,
        epf_contribution_type: row.try_get("epf_contribution_type")?,
        employee_epf_rate: money::decimal_from_db(&row.try_get::<String, _>("employee_epf_rate")?)?,
        join_date: row.try_get("join_date")?,
        last_working_day: row.try_get("last_working_day")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
