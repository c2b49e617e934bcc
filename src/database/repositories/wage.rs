use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::database::models::{Period, WageComponents};
use crate::money;

const COMPONENT_COLUMNS: &str = r#"
    id,
    tenant_id,
    employee_id,
    year,
    month,
    basic,
    fixed_allowance,
    ot_hours,
    ot_amount,
    ph_days_worked,
    ph_pay,
    commission,
    trade_commission,
    incentive,
    outstation,
    bonus,
    unpaid_leave_days,
    pcb,
    advance_repayment,
    other_deductions,
    other_deductions_note,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct WageComponentsRepository {
    pool: SqlitePool,
}

impl WageComponentsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write the period activity for one employee, replacing any earlier
    /// capture for the same period.
    pub async fn upsert(&self, components: &WageComponents) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO
                wage_components (
                    id, tenant_id, employee_id, year, month,
                    basic, fixed_allowance,
                    ot_hours, ot_amount, ph_days_worked, ph_pay,
                    commission, trade_commission, incentive, outstation, bonus,
                    unpaid_leave_days, pcb, advance_repayment,
                    other_deductions, other_deductions_note,
                    created_at, updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id, employee_id, year, month) DO UPDATE SET
                basic = excluded.basic,
                fixed_allowance = excluded.fixed_allowance,
                ot_hours = excluded.ot_hours,
                ot_amount = excluded.ot_amount,
                ph_days_worked = excluded.ph_days_worked,
                ph_pay = excluded.ph_pay,
                commission = excluded.commission,
                trade_commission = excluded.trade_commission,
                incentive = excluded.incentive,
                outstation = excluded.outstation,
                bonus = excluded.bonus,
                unpaid_leave_days = excluded.unpaid_leave_days,
                pcb = excluded.pcb,
                advance_repayment = excluded.advance_repayment,
                other_deductions = excluded.other_deductions,
                other_deductions_note = excluded.other_deductions_note,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(components.id)
        .bind(components.tenant_id)
        .bind(components.employee_id)
        .bind(components.year)
        .bind(components.month)
        .bind(components.basic.as_ref().map(money::amount_to_db))
        .bind(components.fixed_allowance.as_ref().map(money::amount_to_db))
        .bind(money::amount_to_db(&components.ot_hours))
        .bind(components.ot_amount.as_ref().map(money::amount_to_db))
        .bind(money::amount_to_db(&components.ph_days_worked))
        .bind(components.ph_pay.as_ref().map(money::amount_to_db))
        .bind(money::amount_to_db(&components.commission))
        .bind(money::amount_to_db(&components.trade_commission))
        .bind(money::amount_to_db(&components.incentive))
        .bind(money::amount_to_db(&components.outstation))
        .bind(money::amount_to_db(&components.bonus))
        .bind(money::amount_to_db(&components.unpaid_leave_days))
        .bind(components.pcb.as_ref().map(money::amount_to_db))
        .bind(money::amount_to_db(&components.advance_repayment))
        .bind(money::amount_to_db(&components.other_deductions))
        .bind(&components.other_deductions_note)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_for_period(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        period: Period,
    ) -> Result<Option<WageComponents>> {
        let row = sqlx::query(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM wage_components \
             WHERE tenant_id = ? AND employee_id = ? AND year = ? AND month = ?"
        ))
        .bind(tenant_id)
        .bind(employee_id)
        .bind(period.year)
        .bind(period.month)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_components_row).transpose()
    }

    /// Period activity, or an empty record that falls back to snapshot
    /// defaults when the month has no capture yet.
    pub async fn find_or_empty(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        period: Period,
    ) -> Result<WageComponents> {
        Ok(self
            .find_for_period(tenant_id, employee_id, period)
            .await?
            .unwrap_or_else(|| {
                WageComponents::empty(tenant_id, employee_id, period.year, period.month)
            }))
    }
}

fn map_components_row(row: SqliteRow) -> Result<WageComponents> {
    Ok(WageComponents {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        employee_id: row.try_get("employee_id")?,
        year: row.try_get("year")?,
        month: row.try_get("month")?,
        basic: money::opt_decimal_from_db(row.try_get("basic")?)?,
        fixed_allowance: money::opt_decimal_from_db(row.try_get("fixed_allowance")?)?,
        ot_hours: money::decimal_from_db(&row.try_get::<String, _>("ot_hours")?)?,
        ot_amount: money::opt_decimal_from_db(row.try_get("ot_amount")?)?,
        ph_days_worked: money::decimal_from_db(&row.try_get::<String, _>("ph_days_worked")?)?,
        ph_pay: money::opt_decimal_from_db(row.try_get("ph_pay")?)?,
        commission: money::decimal_from_db(&row.try_get::<String, _>("commission")?)?,
        trade_commission: money::decimal_from_db(&row.try_get::<String, _>("trade_commission")?)?,
        incentive: money::decimal_from_db(&row.try_get::<String, _>("incentive")?)?,
        outstation: money::decimal_from_db(&row.try_get::<String, _>("outstation")?)?,
        bonus: money::decimal_from_db(&row.try_get::<String, _>("bonus")?)?,
        unpaid_leave_days: money::decimal_from_db(
            &row.try_get::<String, _>("unpaid_leave_days")?,
        )?,
        pcb: money::opt_decimal_from_db(row.try_get("pcb")?)?,
        advance_repayment: money::decimal_from_db(
            &row.try_get::<String, _>("advance_repayment")?,
        )?,
        other_deductions: money::decimal_from_db(&row.try_get::<String, _>("other_deductions")?)?,
        other_deductions_note: row.try_get("other_deductions_note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
