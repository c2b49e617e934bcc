#![allow(dead_code)]

use std::str::FromStr;

use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use gaji_core::database::init_database;
use gaji_core::database::models::{
    Claim, ClaimStatus, CreateEmployeeInput, EmploymentType, EpfContributionType, GroupingMode,
    Tenant,
};
use gaji_core::database::repositories::{ClaimRepository, TenantRepository};

// Test database wrapper
pub struct TestDb {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let database_url = format!("sqlite:{}/test.db", temp_dir.path().display());
        let pool = init_database(&database_url).await?;

        Ok(TestDb {
            pool,
            _temp_dir: temp_dir,
        })
    }
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub async fn create_tenant(pool: &SqlitePool) -> Result<Tenant> {
    TenantRepository::new(pool.clone())
        .create("Kopi Corp", GroupingMode::Outlet)
        .await
}

pub fn employee_input(
    tenant_id: Uuid,
    name: &str,
    group: Option<&str>,
    basic: &str,
    fixed_allowance: &str,
) -> CreateEmployeeInput {
    CreateEmployeeInput {
        tenant_id,
        name: name.to_string(),
        nric: Some("880101-14-5567".to_string()),
        group_name: group.map(|g| g.to_string()),
        employment_type: EmploymentType::Confirmed,
        basic: dec(basic),
        fixed_allowance: dec(fixed_allowance),
        hourly_rate: None,
        daily_rate: None,
        overtime_rate: Some(dec("20")),
        ph_rate: None,
        commission_rate: None,
        epf_no: Some("EPF123".to_string()),
        socso_no: Some("SOCSO456".to_string()),
        tax_no: None,
        bank_name: Some("Maybank".to_string()),
        bank_account: Some("5123456789".to_string()),
        epf_contribution_type: EpfContributionType::Standard,
        employee_epf_rate: None,
        join_date: None,
    }
}

/// Seed an already-approved claim, skipping the decision pipeline.
pub async fn insert_approved_claim(
    pool: &SqlitePool,
    tenant_id: Uuid,
    employee_id: Uuid,
    claim_date: NaiveDate,
    amount: &str,
) -> Result<Claim> {
    let now = Utc::now();
    ClaimRepository::new(pool.clone())
        .insert(&Claim {
            id: Uuid::new_v4(),
            tenant_id,
            employee_id,
            claim_date,
            category: "meal".to_string(),
            amount: dec(amount),
            receipt_ref: None,
            status: ClaimStatus::Approved,
            auto_approved: false,
            auto_approval_reason: None,
            receipt_hash: None,
            extracted_fields: None,
            consumed_by_payroll_item_id: None,
            decided_by: None,
            created_at: now,
            updated_at: now,
        })
        .await
}
