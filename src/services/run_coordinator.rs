//! Payroll-run lifecycle: draft creation, per-employee materialization,
//! single-item edits, the finalize transaction and the audit-only
//! approval step.
//!
//! Materialization treats employees as independent units of work: one
//! bad item is recorded as an error row and the run keeps going.
//! Finalization is one serializable transaction that re-checks the run
//! state, flips it, and consumes every contributing claim exactly once.

use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::database::models::{
    EmployeeSnapshot, ItemDraft, ItemStatus, ItemWarning, Period, PayrollItem, PayrollRun,
    RunStatus, RunSummary, TenantConfig, WageOverrides,
};
use crate::database::repositories::{
    ClaimRepository, EmployeeRepository, PayrollItemRepository, PayrollRunRepository,
    TenantRepository, WageComponentsRepository,
};
use crate::error::PayrollError;
use crate::money;
use crate::payroll;
use crate::services::immutability;

const MAX_STORE_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 50;

/// Outcome of a materialization pass.
#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    /// False when a cancel request stopped the pass early; the partial
    /// draft can be resumed by materializing again.
    pub completed: bool,
    pub materialized: usize,
    pub errored: usize,
}

#[derive(Clone)]
pub struct RunCoordinator {
    pool: SqlitePool,
    run_repository: PayrollRunRepository,
    item_repository: PayrollItemRepository,
    employee_repository: EmployeeRepository,
    wage_repository: WageComponentsRepository,
    claim_repository: ClaimRepository,
    tenant_repository: TenantRepository,
}

impl RunCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            run_repository: PayrollRunRepository::new(pool.clone()),
            item_repository: PayrollItemRepository::new(pool.clone()),
            employee_repository: EmployeeRepository::new(pool.clone()),
            wage_repository: WageComponentsRepository::new(pool.clone()),
            claim_repository: ClaimRepository::new(pool.clone()),
            tenant_repository: TenantRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create (or return) the draft run for a period and scope. Errors
    /// when the period's run for that scope has already been finalized:
    /// corrections go into a new period, not a rebuilt run.
    pub async fn create_draft(
        &self,
        tenant_id: Uuid,
        year: i64,
        month: i64,
        group_scope: Option<&str>,
    ) -> Result<PayrollRun, PayrollError> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::InvalidWageInput(format!(
                "month must be 1..=12, got {month}"
            )));
        }

        let config = self.config_for(tenant_id).await?;
        let run = self
            .run_repository
            .insert_draft(tenant_id, year, month, group_scope, &config.timezone)
            .await?;

        if run.status != RunStatus::Draft {
            return Err(PayrollError::FinalizedRunImmutable(run.id));
        }

        log::info!(
            "Draft run {} ready for tenant {} period {}-{:02} scope {:?}",
            run.id,
            tenant_id,
            year,
            month,
            group_scope
        );

        Ok(run)
    }

    /// Build (or rebuild) draft items for every payable employee in
    /// scope. Item-level failures are isolated into error rows; transient
    /// store failures are retried with backoff before giving up on the
    /// employee.
    pub async fn materialize(
        &self,
        run_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<MaterializeOutcome, PayrollError> {
        let run = self.require_run(run_id).await?;
        immutability::ensure_mutable(&run)?;

        let config = self.config_for(run.tenant_id).await?;
        let employees = self
            .employee_repository
            .list_payable(run.tenant_id, run.group_scope.as_deref())
            .await?;
        let period = Period::new(run.year, run.month);

        let mut outcome = MaterializeOutcome {
            completed: true,
            materialized: 0,
            errored: 0,
        };

        for employee in &employees {
            if cancel.is_cancelled() {
                log::warn!(
                    "Materialization of run {} cancelled after {} of {} employees",
                    run_id,
                    outcome.materialized + outcome.errored,
                    employees.len()
                );
                outcome.completed = false;
                break;
            }

            match self
                .materialize_employee(&run, employee, &config, period)
                .await
            {
                Ok(()) => outcome.materialized += 1,
                Err(err) if matches!(err, PayrollError::InvalidWageInput(_)) => {
                    log::warn!(
                        "Item for employee {} in run {} failed: {}",
                        employee.id,
                        run_id,
                        err
                    );
                    self.item_repository
                        .upsert_error(run_id, employee.id, &employee.name, &err.to_string())
                        .await?;
                    outcome.errored += 1;
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "Run {} materialized: {} items, {} errors, completed: {}",
            run_id,
            outcome.materialized,
            outcome.errored,
            outcome.completed
        );

        Ok(outcome)
    }

    async fn materialize_employee(
        &self,
        run: &PayrollRun,
        employee: &EmployeeSnapshot,
        config: &TenantConfig,
        period: Period,
    ) -> Result<(), PayrollError> {
        let draft = self.build_item(run, employee, config, period, None).await?;

        self.with_retry(|| {
            let item_repository = self.item_repository.clone();
            let draft = draft.clone();
            let run_id = run.id;
            async move {
                item_repository.upsert_draft(run_id, &draft).await?;
                Ok(())
            }
        })
        .await
    }

    async fn build_item(
        &self,
        run: &PayrollRun,
        employee: &EmployeeSnapshot,
        config: &TenantConfig,
        period: Period,
        overrides: Option<&WageOverrides>,
    ) -> Result<ItemDraft, PayrollError> {
        let mut components = self
            .wage_repository
            .find_or_empty(run.tenant_id, employee.id, period)
            .await?;
        if let Some(overrides) = overrides {
            components.apply_overrides(overrides);
        }

        let claims = self
            .claim_repository
            .list_unconsumed_approved(run.tenant_id, employee.id, period.last_day())
            .await?;

        payroll::build(&components, employee, config, &claims)
    }

    /// Rebuild one draft item with ad-hoc input overrides.
    pub async fn edit_item(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
        overrides: &WageOverrides,
    ) -> Result<PayrollItem, PayrollError> {
        let run = self.require_run(run_id).await?;
        immutability::ensure_mutable(&run)?;

        let employee = self
            .employee_repository
            .find_by_id(run.tenant_id, employee_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("employee {employee_id}")))?;
        let config = self.config_for(run.tenant_id).await?;
        let period = Period::new(run.year, run.month);

        let draft = self
            .build_item(&run, &employee, &config, period, Some(overrides))
            .await?;

        Ok(self.item_repository.upsert_draft(run_id, &draft).await?)
    }

    /// Finalize a draft run. One transaction re-reads the run and its
    /// items, rejects blocking warnings, flips the state and consumes
    /// every contributing claim. A claim already consumed elsewhere
    /// aborts the whole transaction with `ClaimConsumedConcurrently`.
    pub async fn finalize(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let run = self.require_run(run_id).await?;
        immutability::ensure_mutable(&run)?;

        let config = self.config_for(run.tenant_id).await?;

        let mut tx = self.pool.begin().await.map_err(PayrollError::from)?;

        let result = self.finalize_in_tx(&mut tx, run_id, &config).await;
        match result {
            Ok(finalized) => {
                tx.commit().await.map_err(PayrollError::from)?;
                log::info!("Run {} finalized", run_id);
                Ok(finalized)
            }
            Err(err) => {
                log::warn!("Finalize of run {} failed: {}, rolling back", run_id, err);
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!(
                        "Rollback failed after error (orig: {}, rollback: {})",
                        err,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn finalize_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        run_id: Uuid,
        config: &TenantConfig,
    ) -> Result<PayrollRun, PayrollError> {
        // Re-read under the transaction: a concurrent finalize either
        // already flipped the state (caught here) or will fail its own
        // guarded transition below.
        let run = self
            .run_repository
            .find_by_id_tx(&mut *tx, run_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("run {run_id}")))?;
        immutability::ensure_mutable(&run)?;

        let items = self
            .item_repository
            .list_for_run_tx(&mut *tx, run_id)
            .await?;

        for item in &items {
            if item.status == ItemStatus::Error {
                return Err(PayrollError::InvalidTransition(format!(
                    "run {run_id} has unresolved error items"
                )));
            }
            if config.block_on_negative_net
                && item.warnings.contains(&ItemWarning::NegativeNetPay)
            {
                return Err(PayrollError::InvalidTransition(format!(
                    "item for employee {} has negative net pay",
                    item.employee_id
                )));
            }
        }

        let flipped = self
            .run_repository
            .transition_tx(
                &mut *tx,
                run_id,
                RunStatus::Draft,
                RunStatus::Finalized,
                Some(Utc::now()),
            )
            .await?;
        if !flipped {
            return Err(PayrollError::FinalizedRunImmutable(run_id));
        }

        // Consume claims last, inside the same transaction. The guarded
        // UPDATE is the single-consumption invariant.
        for item in &items {
            for claim_id in &item.claim_ids {
                let consumed = self
                    .claim_repository
                    .consume_tx(&mut *tx, *claim_id, item.id)
                    .await?;
                if !consumed {
                    return Err(PayrollError::ClaimConsumedConcurrently(*claim_id));
                }
            }
        }

        self.run_repository
            .find_by_id_tx(&mut *tx, run_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("run {run_id}")))
    }

    /// Audit-only transition; item data is untouched.
    pub async fn approve(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let mut tx = self.pool.begin().await.map_err(PayrollError::from)?;

        let flipped = self
            .run_repository
            .transition_tx(
                &mut *tx,
                run_id,
                RunStatus::Finalized,
                RunStatus::Approved,
                None,
            )
            .await?;
        if !flipped {
            tx.rollback().await.map_err(PayrollError::from)?;
            let run = self.require_run(run_id).await?;
            return Err(PayrollError::InvalidTransition(format!(
                "run {} is {}, only finalized runs can be approved",
                run_id, run.status
            )));
        }

        tx.commit().await.map_err(PayrollError::from)?;
        log::info!("Run {} approved", run_id);

        self.require_run(run_id).await
    }

    pub async fn get_run(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        self.require_run(run_id).await
    }

    pub async fn list_items(&self, run_id: Uuid) -> Result<Vec<PayrollItem>, PayrollError> {
        Ok(self.item_repository.list_for_run(run_id).await?)
    }

    pub async fn get_item(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<PayrollItem>, PayrollError> {
        Ok(self
            .item_repository
            .find_by_run_and_employee(run_id, employee_id)
            .await?)
    }

    /// Roll-up for downstream consumers: counts and totals over the
    /// run's items. Error rows count but contribute nothing to totals.
    pub async fn summarize(&self, run_id: Uuid) -> Result<RunSummary, PayrollError> {
        let run = self.require_run(run_id).await?;
        let items = self.item_repository.list_for_run(run_id).await?;

        let mut summary = RunSummary {
            run_id,
            status: run.status,
            item_count: items.len() as i64,
            error_count: 0,
            warning_count: 0,
            gross_total: money::zero(),
            net_total: money::zero(),
            employer_cost_total: money::zero(),
        };

        for item in &items {
            if item.status == ItemStatus::Error {
                summary.error_count += 1;
                continue;
            }
            summary.warning_count += item.warnings.len() as i64;
            summary.gross_total = add2(&summary.gross_total, &item.totals.gross);
            summary.net_total = add2(&summary.net_total, &item.totals.net);
            summary.employer_cost_total =
                add2(&summary.employer_cost_total, &item.totals.employer_cost);
        }

        Ok(summary)
    }

    async fn require_run(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        self.run_repository
            .find_by_id(run_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("run {run_id}")))
    }

    async fn config_for(&self, tenant_id: Uuid) -> Result<TenantConfig, PayrollError> {
        self.tenant_repository
            .find_config(tenant_id)
            .await?
            .ok_or_else(|| PayrollError::ConfigMissing(format!("tenant {tenant_id}")))
    }

    /// Exponential backoff with jitter over transient store failures.
    async fn with_retry<F, Fut>(&self, mut operation: F) -> Result<(), PayrollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PayrollError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < MAX_STORE_ATTEMPTS => {
                    let jitter_ms = rand::rng().random_range(0..RETRY_BASE_DELAY_MS);
                    let delay = Duration::from_millis(
                        RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1) + jitter_ms,
                    );
                    log::warn!(
                        "Store write failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt,
                        MAX_STORE_ATTEMPTS,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn add2(acc: &BigDecimal, value: &BigDecimal) -> BigDecimal {
    money::round2(&(acc + value))
}
