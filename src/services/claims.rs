//! Expense-claim intake and the tenant-policy auto-decision pipeline.
//!
//! A submitted claim is decided in order: duplicate receipt (reject),
//! meal under the daily cap (approve), AI-verified receipt (approve),
//! otherwise it stays pending for a supervisor. Supervisors may only
//! decide claims within their own department/outlet scope.

use bigdecimal::BigDecimal;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::database::models::{
    AutoDecisionReason, Claim, ClaimStatus, ClaimSubmission, EmployeeSnapshot, TenantConfig,
};
use crate::database::repositories::{ClaimRepository, EmployeeRepository, TenantRepository};
use crate::error::PayrollError;
use crate::money;

/// Extracted-vs-submitted amount tolerance for AI approval, in ringgit.
const AI_AMOUNT_TOLERANCE: &str = "0.05";

#[derive(Clone)]
pub struct ClaimService {
    claim_repository: ClaimRepository,
    employee_repository: EmployeeRepository,
    tenant_repository: TenantRepository,
}

impl ClaimService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            claim_repository: ClaimRepository::new(pool.clone()),
            employee_repository: EmployeeRepository::new(pool.clone()),
            tenant_repository: TenantRepository::new(pool),
        }
    }

    /// Run the auto-decision pipeline on a new claim and persist the
    /// outcome.
    pub async fn submit(
        &self,
        tenant_id: Uuid,
        submission: ClaimSubmission,
    ) -> Result<Claim, PayrollError> {
        if money::is_negative(&submission.amount) {
            return Err(PayrollError::InvalidWageInput(format!(
                "claim amount must not be negative, got {}",
                submission.amount
            )));
        }

        let config = self
            .tenant_repository
            .find_config(tenant_id)
            .await?
            .ok_or_else(|| PayrollError::ConfigMissing("tenant config".to_string()))?;

        let receipt_hash = match (&config.ai_verification_enabled, &submission.receipt_bytes) {
            (true, Some(bytes)) => Some(receipt_digest(bytes)),
            _ => None,
        };

        let decision = self
            .decide(tenant_id, &config, &submission, receipt_hash.as_deref())
            .await?;

        let now = Utc::now();
        let claim = Claim {
            id: Uuid::new_v4(),
            tenant_id,
            employee_id: submission.employee_id,
            claim_date: submission.claim_date,
            category: submission.category,
            amount: money::round2(&submission.amount),
            receipt_ref: submission.receipt_ref,
            status: decision.status,
            auto_approved: decision.auto_approved,
            auto_approval_reason: decision.reason,
            receipt_hash,
            extracted_fields: submission.extracted_fields,
            consumed_by_payroll_item_id: None,
            decided_by: None,
            created_at: now,
            updated_at: now,
        };

        log::info!(
            "Claim {} for employee {} decided {} ({:?})",
            claim.id,
            claim.employee_id,
            claim.status,
            claim.auto_approval_reason
        );

        Ok(self.claim_repository.insert(&claim).await?)
    }

    async fn decide(
        &self,
        tenant_id: Uuid,
        config: &TenantConfig,
        submission: &ClaimSubmission,
        receipt_hash: Option<&str>,
    ) -> Result<Decision, PayrollError> {
        // 1. A receipt already attached to a live claim, for any employee
        //    of the tenant, is rejected outright.
        if let Some(hash) = receipt_hash {
            if let Some(existing) = self
                .claim_repository
                .find_by_receipt_hash(tenant_id, hash)
                .await?
            {
                log::warn!(
                    "Claim submission reuses receipt of claim {} (hash {})",
                    existing.id,
                    hash
                );
                return Ok(Decision {
                    status: ClaimStatus::Rejected,
                    auto_approved: false,
                    reason: Some(AutoDecisionReason::DuplicateReceipt),
                });
            }
        }

        // 2. Meals under the tenant's daily cap.
        if config.auto_approve_meals_under_daily_cap
            && config.is_meal_category(&submission.category)
        {
            if let Some(cap) = &config.meal_cap_amount {
                if &submission.amount <= cap {
                    return Ok(Decision {
                        status: ClaimStatus::Approved,
                        auto_approved: true,
                        reason: Some(AutoDecisionReason::MealCap),
                    });
                }
            }
        }

        // 3. AI-verified receipts under the auto-approval threshold.
        if config.ai_verification_enabled
            && ai_verdict_approves(submission)
            && within_threshold(&submission.amount, config.ai_auto_approve_threshold.as_ref())
        {
            return Ok(Decision {
                status: ClaimStatus::Approved,
                auto_approved: true,
                reason: Some(AutoDecisionReason::AiVerified),
            });
        }

        Ok(Decision {
            status: ClaimStatus::Pending,
            auto_approved: false,
            reason: None,
        })
    }

    /// Supervisor decision on a pending claim. The supervisor must share
    /// scope with the claimant under the tenant's grouping mode.
    pub async fn decide_by_supervisor(
        &self,
        tenant_id: Uuid,
        claim_id: Uuid,
        supervisor_id: Uuid,
        approve: bool,
    ) -> Result<Claim, PayrollError> {
        let claim = self
            .claim_repository
            .find_by_id(tenant_id, claim_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("claim {claim_id}")))?;

        let supervisor = self
            .employee_repository
            .find_by_id(tenant_id, supervisor_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("employee {supervisor_id}")))?;
        let claimant = self
            .employee_repository
            .find_by_id(tenant_id, claim.employee_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("employee {}", claim.employee_id)))?;

        if !shares_scope(&supervisor, &claimant) {
            return Err(PayrollError::InvalidTransition(format!(
                "supervisor {} is outside claimant scope",
                supervisor_id
            )));
        }

        let status = if approve {
            ClaimStatus::Approved
        } else {
            ClaimStatus::Rejected
        };

        let applied = self
            .claim_repository
            .set_decision(tenant_id, claim_id, status, false, None, Some(supervisor_id))
            .await?;
        if !applied {
            return Err(PayrollError::InvalidTransition(format!(
                "claim {claim_id} is not pending"
            )));
        }

        self.claim_repository
            .find_by_id(tenant_id, claim_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("claim {claim_id}")))
    }

    pub async fn find_by_id(
        &self,
        tenant_id: Uuid,
        claim_id: Uuid,
    ) -> Result<Option<Claim>, PayrollError> {
        Ok(self.claim_repository.find_by_id(tenant_id, claim_id).await?)
    }
}

struct Decision {
    status: ClaimStatus,
    auto_approved: bool,
    reason: Option<AutoDecisionReason>,
}

/// Stable digest over the normalized receipt bytes.
pub fn receipt_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn ai_verdict_approves(submission: &ClaimSubmission) -> bool {
    let Some(fields) = &submission.extracted_fields else {
        return false;
    };
    if fields.get("verdict").and_then(|v| v.as_str()) != Some("auto_approve") {
        return false;
    }

    let Some(extracted) = fields
        .get("amount")
        .and_then(|v| v.as_str())
        .and_then(|raw| BigDecimal::from_str(raw).ok())
    else {
        return false;
    };

    let tolerance = BigDecimal::from_str(AI_AMOUNT_TOLERANCE).expect("static tolerance literal");
    (extracted - &submission.amount).abs() <= tolerance
}

fn within_threshold(amount: &BigDecimal, threshold: Option<&BigDecimal>) -> bool {
    match threshold {
        Some(threshold) => amount <= threshold,
        None => false,
    }
}

/// Same department/outlet under the tenant's grouping; employees without
/// a group only fall under a supervisor who also has none.
fn shares_scope(supervisor: &EmployeeSnapshot, claimant: &EmployeeSnapshot) -> bool {
    supervisor.tenant_id == claimant.tenant_id && supervisor.group_name == claimant.group_name
}
