use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub grouping_mode: GroupingMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum GroupingMode {
        Department => "department",
        Outlet => "outlet",
    }
}

/// Per-tenant payroll policy. Lives in its own row so policy edits never
/// touch the tenant identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub tenant_id: Uuid,
    /// Required for unpaid-leave proration; a run aborts without it.
    pub working_days_per_month: Option<i64>,
    pub include_trade_commission_in_statutory: bool,
    pub auto_approve_meals_under_daily_cap: bool,
    pub meal_cap_amount: Option<BigDecimal>,
    pub meal_categories: Vec<String>,
    pub ai_verification_enabled: bool,
    pub ai_auto_approve_threshold: Option<BigDecimal>,
    pub block_on_negative_net: bool,
    pub tax_year: i64,
    pub timezone: String,
    pub updated_at: DateTime<Utc>,
}

impl TenantConfig {
    pub fn new(tenant_id: Uuid) -> Self {
        TenantConfig {
            tenant_id,
            working_days_per_month: Some(26),
            include_trade_commission_in_statutory: false,
            auto_approve_meals_under_daily_cap: false,
            meal_cap_amount: None,
            meal_categories: Vec::new(),
            ai_verification_enabled: false,
            ai_auto_approve_threshold: None,
            block_on_negative_net: false,
            tax_year: 2024,
            timezone: "Asia/Kuala_Lumpur".to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_meal_category(&self, category: &str) -> bool {
        self.meal_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}
