use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::database::models::{
    DeductionsBreakdown, EarningsBreakdown, EmployeeIdentity, EmployerContributions, ItemDraft,
    ItemStatus, PayTotals, PayrollItem,
};
use crate::money;

const ITEM_COLUMNS: &str = r#"
    id,
    run_id,
    employee_id,
    status,
    error_message,
    employee_name,
    nric,
    group_name,
    epf_no,
    socso_no,
    tax_no,
    bank_name,
    bank_account,
    basic,
    fixed_allowance,
    ot_amount,
    ph_pay,
    commission,
    trade_commission,
    incentive,
    outstation,
    claims_amount,
    bonus,
    epf_base,
    epf_rounded_base,
    epf_employee,
    socso_employee,
    eis_employee,
    pcb,
    unpaid_leave_days,
    unpaid_leave_amount,
    advance_repayment,
    other_deductions,
    other_deductions_note,
    epf_employer,
    socso_employer,
    eis_employer,
    gross,
    total_deductions,
    net,
    employer_cost,
    claim_ids,
    warnings,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PayrollItemRepository {
    pool: SqlitePool,
}

impl PayrollItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write a draft item, replacing any earlier draft for the same
    /// employee in the same run. The row id is kept stable across
    /// rewrites so claim references stay valid.
    pub async fn upsert_draft(&self, run_id: Uuid, draft: &ItemDraft) -> Result<PayrollItem> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO
                payroll_items (
                    id, run_id, employee_id, status, error_message,
                    employee_name, nric, group_name, epf_no, socso_no, tax_no,
                    bank_name, bank_account,
                    basic, fixed_allowance, ot_amount, ph_pay, commission,
                    trade_commission, incentive, outstation, claims_amount, bonus,
                    epf_base, epf_rounded_base, epf_employee,
                    socso_employee, eis_employee, pcb,
                    unpaid_leave_days, unpaid_leave_amount,
                    advance_repayment, other_deductions, other_deductions_note,
                    epf_employer, socso_employer, eis_employer,
                    gross, total_deductions, net, employer_cost,
                    claim_ids, warnings, created_at, updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                 ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                 ?, ?, ?, ?, ?)
            ON CONFLICT (run_id, employee_id) DO UPDATE SET
                status = excluded.status,
                error_message = excluded.error_message,
                employee_name = excluded.employee_name,
                nric = excluded.nric,
                group_name = excluded.group_name,
                epf_no = excluded.epf_no,
                socso_no = excluded.socso_no,
                tax_no = excluded.tax_no,
                bank_name = excluded.bank_name,
                bank_account = excluded.bank_account,
                basic = excluded.basic,
                fixed_allowance = excluded.fixed_allowance,
                ot_amount = excluded.ot_amount,
                ph_pay = excluded.ph_pay,
                commission = excluded.commission,
                trade_commission = excluded.trade_commission,
                incentive = excluded.incentive,
                outstation = excluded.outstation,
                claims_amount = excluded.claims_amount,
                bonus = excluded.bonus,
                epf_base = excluded.epf_base,
                epf_rounded_base = excluded.epf_rounded_base,
                epf_employee = excluded.epf_employee,
                socso_employee = excluded.socso_employee,
                eis_employee = excluded.eis_employee,
                pcb = excluded.pcb,
                unpaid_leave_days = excluded.unpaid_leave_days,
                unpaid_leave_amount = excluded.unpaid_leave_amount,
                advance_repayment = excluded.advance_repayment,
                other_deductions = excluded.other_deductions,
                other_deductions_note = excluded.other_deductions_note,
                epf_employer = excluded.epf_employer,
                socso_employer = excluded.socso_employer,
                eis_employer = excluded.eis_employer,
                gross = excluded.gross,
                total_deductions = excluded.total_deductions,
                net = excluded.net,
                employer_cost = excluded.employer_cost,
                claim_ids = excluded.claim_ids,
                warnings = excluded.warnings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(draft.employee_id)
        .bind(ItemStatus::Ok)
        .bind(Option::<String>::None)
        .bind(&draft.identity.employee_name)
        .bind(&draft.identity.nric)
        .bind(&draft.identity.group_name)
        .bind(&draft.identity.epf_no)
        .bind(&draft.identity.socso_no)
        .bind(&draft.identity.tax_no)
        .bind(&draft.identity.bank_name)
        .bind(&draft.identity.bank_account)
        .bind(money::amount_to_db(&draft.earnings.basic))
        .bind(money::amount_to_db(&draft.earnings.fixed_allowance))
        .bind(money::amount_to_db(&draft.earnings.ot_amount))
        .bind(money::amount_to_db(&draft.earnings.ph_pay))
        .bind(money::amount_to_db(&draft.earnings.commission))
        .bind(money::amount_to_db(&draft.earnings.trade_commission))
        .bind(money::amount_to_db(&draft.earnings.incentive))
        .bind(money::amount_to_db(&draft.earnings.outstation))
        .bind(money::amount_to_db(&draft.earnings.claims_amount))
        .bind(money::amount_to_db(&draft.earnings.bonus))
        .bind(money::amount_to_db(&draft.employer.epf_base))
        .bind(money::amount_to_db(&draft.employer.epf_rounded_base))
        .bind(money::amount_to_db(&draft.deductions.epf_employee))
        .bind(money::amount_to_db(&draft.deductions.socso_employee))
        .bind(money::amount_to_db(&draft.deductions.eis_employee))
        .bind(money::amount_to_db(&draft.deductions.pcb))
        .bind(money::amount_to_db(&draft.deductions.unpaid_leave_days))
        .bind(money::amount_to_db(&draft.deductions.unpaid_leave_amount))
        .bind(money::amount_to_db(&draft.deductions.advance_repayment))
        .bind(money::amount_to_db(&draft.deductions.other_deductions))
        .bind(&draft.deductions.other_deductions_note)
        .bind(money::amount_to_db(&draft.employer.epf_employer))
        .bind(money::amount_to_db(&draft.employer.socso_employer))
        .bind(money::amount_to_db(&draft.employer.eis_employer))
        .bind(money::amount_to_db(&draft.totals.gross))
        .bind(money::amount_to_db(&draft.totals.total_deductions))
        .bind(money::amount_to_db(&draft.totals.net))
        .bind(money::amount_to_db(&draft.totals.employer_cost))
        .bind(serde_json::to_string(&draft.claim_ids)?)
        .bind(serde_json::to_string(&draft.warnings)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_run_and_employee(run_id, draft.employee_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("item for run {} vanished after upsert", run_id))
    }

    /// Record a failed materialization for one employee. The run keeps
    /// going; the error row is surfaced in the run summary.
    pub async fn upsert_error(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
        employee_name: &str,
        message: &str,
    ) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO
                payroll_items (id, run_id, employee_id, status, error_message, employee_name, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (run_id, employee_id) DO UPDATE SET
                status = excluded.status,
                error_message = excluded.error_message,
                employee_name = excluded.employee_name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(employee_id)
        .bind(ItemStatus::Error)
        .bind(message)
        .bind(employee_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_run_and_employee(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<PayrollItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM payroll_items WHERE run_id = ? AND employee_id = ?"
        ))
        .bind(run_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_item_row).transpose()
    }

    pub async fn list_for_run(&self, run_id: Uuid) -> Result<Vec<PayrollItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM payroll_items WHERE run_id = ? ORDER BY employee_name"
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_item_row).collect()
    }

    /// Same read inside the finalize transaction, so items cannot change
    /// under the state flip.
    pub async fn list_for_run_tx(
        &self,
        conn: &mut SqliteConnection,
        run_id: Uuid,
    ) -> Result<Vec<PayrollItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM payroll_items WHERE run_id = ? ORDER BY employee_name"
        ))
        .bind(run_id)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(map_item_row).collect()
    }
}

fn map_item_row(row: SqliteRow) -> Result<PayrollItem> {
    let claim_ids: Vec<Uuid> = serde_json::from_str(&row.try_get::<String, _>("claim_ids")?)?;
    let warnings = serde_json::from_str(&row.try_get::<String, _>("warnings")?)?;

    let amount = |name: &str| -> Result<bigdecimal::BigDecimal> {
        money::decimal_from_db(&row.try_get::<String, _>(name)?)
    };

    Ok(PayrollItem {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        employee_id: row.try_get("employee_id")?,
        status: row.try_get("status")?,
        error_message: row.try_get("error_message")?,
        identity: EmployeeIdentity {
            employee_name: row.try_get("employee_name")?,
            nric: row.try_get("nric")?,
            group_name: row.try_get("group_name")?,
            epf_no: row.try_get("epf_no")?,
            socso_no: row.try_get("socso_no")?,
            tax_no: row.try_get("tax_no")?,
            bank_name: row.try_get("bank_name")?,
            bank_account: row.try_get("bank_account")?,
        },
        earnings: EarningsBreakdown {
            basic: amount("basic")?,
            fixed_allowance: amount("fixed_allowance")?,
            ot_amount: amount("ot_amount")?,
            ph_pay: amount("ph_pay")?,
            commission: amount("commission")?,
            trade_commission: amount("trade_commission")?,
            incentive: amount("incentive")?,
            outstation: amount("outstation")?,
            claims_amount: amount("claims_amount")?,
            bonus: amount("bonus")?,
        },
        deductions: DeductionsBreakdown {
            epf_employee: amount("epf_employee")?,
            socso_employee: amount("socso_employee")?,
            eis_employee: amount("eis_employee")?,
            pcb: amount("pcb")?,
            unpaid_leave_days: amount("unpaid_leave_days")?,
            unpaid_leave_amount: amount("unpaid_leave_amount")?,
            advance_repayment: amount("advance_repayment")?,
            other_deductions: amount("other_deductions")?,
            other_deductions_note: row.try_get("other_deductions_note")?,
        },
        employer: EmployerContributions {
            epf_employer: amount("epf_employer")?,
            socso_employer: amount("socso_employer")?,
            eis_employer: amount("eis_employer")?,
            epf_base: amount("epf_base")?,
            epf_rounded_base: amount("epf_rounded_base")?,
        },
        totals: PayTotals {
            gross: amount("gross")?,
            total_deductions: amount("total_deductions")?,
            net: amount("net")?,
            employer_cost: amount("employer_cost")?,
        },
        claim_ids,
        warnings,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
