use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::database::models::{GroupingMode, Tenant, TenantConfig};
use crate::money;

#[derive(Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a tenant together with its default configuration row.
    pub async fn create(&self, name: &str, grouping_mode: GroupingMode) -> Result<Tenant> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO
                tenants (id, name, grouping_mode, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?)
            RETURNING
                id, name, grouping_mode, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(grouping_mode)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.upsert_config(&TenantConfig::new(tenant.id)).await?;

        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT
                id, name, grouping_mode, created_at, updated_at
            FROM
                tenants
            WHERE
                id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    pub async fn upsert_config(&self, config: &TenantConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO
                tenant_configs (
                    tenant_id,
                    working_days_per_month,
                    include_trade_commission_in_statutory,
                    auto_approve_meals_under_daily_cap,
                    meal_cap_amount,
                    meal_categories,
                    ai_verification_enabled,
                    ai_auto_approve_threshold,
                    block_on_negative_net,
                    tax_year,
                    timezone,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id) DO UPDATE SET
                working_days_per_month = excluded.working_days_per_month,
                include_trade_commission_in_statutory = excluded.include_trade_commission_in_statutory,
                auto_approve_meals_under_daily_cap = excluded.auto_approve_meals_under_daily_cap,
                meal_cap_amount = excluded.meal_cap_amount,
                meal_categories = excluded.meal_categories,
                ai_verification_enabled = excluded.ai_verification_enabled,
                ai_auto_approve_threshold = excluded.ai_auto_approve_threshold,
                block_on_negative_net = excluded.block_on_negative_net,
                tax_year = excluded.tax_year,
                timezone = excluded.timezone,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.tenant_id)
        .bind(config.working_days_per_month)
        .bind(config.include_trade_commission_in_statutory)
        .bind(config.auto_approve_meals_under_daily_cap)
        .bind(config.meal_cap_amount.as_ref().map(money::amount_to_db))
        .bind(serde_json::to_string(&config.meal_categories)?)
        .bind(config.ai_verification_enabled)
        .bind(
            config
                .ai_auto_approve_threshold
                .as_ref()
                .map(money::amount_to_db),
        )
        .bind(config.block_on_negative_net)
        .bind(config.tax_year)
        .bind(&config.timezone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_config(&self, tenant_id: Uuid) -> Result<Option<TenantConfig>> {
        let row = sqlx::query(
            r#"
            SELECT
                tenant_id,
                working_days_per_month,
                include_trade_commission_in_statutory,
                auto_approve_meals_under_daily_cap,
                meal_cap_amount,
                meal_categories,
                ai_verification_enabled,
                ai_auto_approve_threshold,
                block_on_negative_net,
                tax_year,
                timezone,
                updated_at
            FROM
                tenant_configs
            WHERE
                tenant_id = ?
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_config_row).transpose()
    }
}

fn map_config_row(row: SqliteRow) -> Result<TenantConfig> {
    let meal_categories: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("meal_categories")?)?;

    Ok(TenantConfig {
        tenant_id: row.try_get("tenant_id")?,
        working_days_per_month: row.try_get("working_days_per_month")?,
        include_trade_commission_in_statutory: row
            .try_get("include_trade_commission_in_statutory")?,
        auto_approve_meals_under_daily_cap: row.try_get("auto_approve_meals_under_daily_cap")?,
        meal_cap_amount: money::opt_decimal_from_db(row.try_get("meal_cap_amount")?)?,
        meal_categories,
        ai_verification_enabled: row.try_get("ai_verification_enabled")?,
        ai_auto_approve_threshold: money::opt_decimal_from_db(
            row.try_get("ai_auto_approve_threshold")?,
        )?,
        block_on_negative_net: row.try_get("block_on_negative_net")?,
        tax_year: row.try_get("tax_year")?,
        timezone: row.try_get("timezone")?,
        updated_at: row.try_get("updated_at")?,
    })
}
