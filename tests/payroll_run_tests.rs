mod common;

use common::{TestDb, create_tenant, dec, employee_input, insert_approved_claim};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use gaji_core::database::models::{
    ItemStatus, ItemWarning, RunStatus, WageComponents, WageOverrides,
};
use gaji_core::database::repositories::{
    ClaimRepository, EmployeeRepository, TenantRepository, WageComponentsRepository,
};
use gaji_core::{PayrollError, RunCoordinator};

#[tokio::test]
async fn test_full_run_pipeline_standard_employee() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(
            tenant.id,
            "Tan Wei Ming",
            Some("Outlet A"),
            "3000",
            "500",
        ))
        .await
        .unwrap();

    let mut components = WageComponents::empty(tenant.id, employee.id, 2024, 6);
    components.ot_amount = Some(dec("200"));
    WageComponentsRepository::new(db.pool.clone())
        .upsert(&components)
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    assert_eq!(run.status, RunStatus::Draft);

    let outcome = runs.materialize(run.id, &CancellationToken::new()).await.unwrap();
    assert!(outcome.completed);
    assert_eq!(outcome.materialized, 1);
    assert_eq!(outcome.errored, 0);

    let item = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Ok);
    assert_eq!(item.totals.gross, dec("3700.00"));
    assert_eq!(item.deductions.epf_employee, dec("330.00"));
    assert_eq!(item.employer.epf_employer, dec("390.00"));
    assert_eq!(item.deductions.socso_employee, dec("14.75"));
    assert_eq!(item.employer.socso_employer, dec("44.35"));
    assert_eq!(item.deductions.eis_employee, dec("5.90"));
    assert_eq!(item.employer.eis_employer, dec("5.90"));
    assert_eq!(item.totals.net, dec("3349.35"));
    assert_eq!(item.totals.employer_cost, dec("4140.25"));
    assert_eq!(item.identity.employee_name, "Tan Wei Ming");
}

#[tokio::test]
async fn test_create_draft_is_idempotent() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let first = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    let second = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    assert_eq!(first.id, second.id);

    // A different scope is a different run.
    let scoped = runs
        .create_draft(tenant.id, 2024, 6, Some("Outlet A"))
        .await
        .unwrap();
    assert_ne!(first.id, scoped.id);
}

#[tokio::test]
async fn test_create_draft_rejects_invalid_month() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let err = runs.create_draft(tenant.id, 2024, 13, None).await.unwrap_err();
    assert!(matches!(err, PayrollError::InvalidWageInput(_)));
}

#[tokio::test]
async fn test_edit_item_rebuilds_draft() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Lim Mei", None, "3000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();

    let before = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(before.totals.gross, dec("3000.00"));

    let overrides = WageOverrides {
        bonus: Some(dec("1000")),
        ..WageOverrides::default()
    };
    let after = runs.edit_item(run.id, employee.id, &overrides).await.unwrap();

    assert_eq!(after.totals.gross, dec("4000.00"));
    assert_eq!(after.earnings.bonus, dec("1000.00"));
    // Same row, rebuilt in place.
    assert_eq!(after.id, before.id);
}

#[tokio::test]
async fn test_finalized_run_is_immutable() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee_repository = EmployeeRepository::new(db.pool.clone());
    let employee = employee_repository
        .create(employee_input(tenant.id, "Tan Wei Ming", None, "3000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();
    let finalized = runs.finalize(run.id).await.unwrap();
    assert_eq!(finalized.status, RunStatus::Finalized);
    assert!(finalized.finalized_at.is_some());

    // A salary edit after finalization must not touch the run.
    employee_repository
        .update_basic(tenant.id, employee.id, &dec("9999"))
        .await
        .unwrap();

    let err = runs
        .materialize(run.id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::FinalizedRunImmutable(id) if id == run.id));

    let overrides = WageOverrides {
        basic: Some(dec("9999")),
        ..WageOverrides::default()
    };
    let err = runs.edit_item(run.id, employee.id, &overrides).await.unwrap_err();
    assert!(matches!(err, PayrollError::FinalizedRunImmutable(_)));

    let err = runs.finalize(run.id).await.unwrap_err();
    assert!(matches!(err, PayrollError::FinalizedRunImmutable(_)));

    // The stored payslip still reflects the salary at finalization time.
    let item = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.earnings.basic, dec("3000.00"));
}

#[tokio::test]
async fn test_approve_requires_finalized() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Lim Mei", None, "3000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();

    let err = runs.approve(run.id).await.unwrap_err();
    assert!(matches!(err, PayrollError::InvalidTransition(_)));

    runs.finalize(run.id).await.unwrap();
    let approved = runs.approve(run.id).await.unwrap();
    assert_eq!(approved.status, RunStatus::Approved);

    // No second approval.
    let err = runs.approve(run.id).await.unwrap_err();
    assert!(matches!(err, PayrollError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_error_item_blocks_finalize() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Bad Record", None, "-100", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    let outcome = runs.materialize(run.id, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.errored, 1);

    let item = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Error);
    assert!(item.error_message.is_some());

    let err = runs.finalize(run.id).await.unwrap_err();
    assert!(matches!(err, PayrollError::InvalidTransition(_)));

    // The run is still a draft; the bad input can be corrected.
    let run = runs.get_run(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Draft);
}

#[tokio::test]
async fn test_negative_net_blocks_finalize_when_configured() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let tenant_repository = TenantRepository::new(db.pool.clone());
    let mut config = tenant_repository.find_config(tenant.id).await.unwrap().unwrap();
    config.block_on_negative_net = true;
    tenant_repository.upsert_config(&config).await.unwrap();

    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Lim Mei", None, "3000", "0"))
        .await
        .unwrap();

    let mut components = WageComponents::empty(tenant.id, employee.id, 2024, 6);
    components.advance_repayment = dec("5000");
    WageComponentsRepository::new(db.pool.clone())
        .upsert(&components)
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();

    let item = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.warnings, vec![ItemWarning::NegativeNetPay]);

    let err = runs.finalize(run.id).await.unwrap_err();
    assert!(matches!(err, PayrollError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_finalize_consumes_claims() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Tan Wei Ming", None, "3000", "0"))
        .await
        .unwrap();
    let claim = insert_approved_claim(
        &db.pool,
        tenant.id,
        employee.id,
        chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        "45.00",
    )
    .await
    .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();

    let item = runs.get_item(run.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.earnings.claims_amount, dec("45.00"));
    assert_eq!(item.claim_ids, vec![claim.id]);
    // Claims never feed the statutory base.
    assert_eq!(item.employer.epf_base, dec("3000.00"));

    runs.finalize(run.id).await.unwrap();

    let consumed = ClaimRepository::new(db.pool.clone())
        .find_by_id(tenant.id, claim.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(consumed.consumed_by_payroll_item_id, Some(item.id));
}

#[tokio::test]
async fn test_late_claim_lands_in_next_open_run() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee = EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Lim Mei", None, "3000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let june = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(june.id, &CancellationToken::new()).await.unwrap();
    runs.finalize(june.id).await.unwrap();

    // Approved after June closed, dated inside June.
    let claim = insert_approved_claim(
        &db.pool,
        tenant.id,
        employee.id,
        chrono::NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        "80.00",
    )
    .await
    .unwrap();

    let july = runs.create_draft(tenant.id, 2024, 7, None).await.unwrap();
    runs.materialize(july.id, &CancellationToken::new()).await.unwrap();

    let item = runs.get_item(july.id, employee.id).await.unwrap().unwrap();
    assert_eq!(item.claim_ids, vec![claim.id]);
    assert_eq!(item.earnings.claims_amount, dec("80.00"));
}

#[tokio::test]
async fn test_materialize_respects_cancellation() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    EmployeeRepository::new(db.pool.clone())
        .create(employee_input(tenant.id, "Lim Mei", None, "3000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = runs.materialize(run.id, &cancel).await.unwrap();
    assert!(!outcome.completed);
    assert_eq!(outcome.materialized, 0);

    // The draft is resumable.
    let outcome = runs
        .materialize(run.id, &CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.completed);
    assert_eq!(outcome.materialized, 1);
}

#[tokio::test]
async fn test_run_summary_totals() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee_repository = EmployeeRepository::new(db.pool.clone());
    employee_repository
        .create(employee_input(tenant.id, "Tan Wei Ming", None, "3000", "500"))
        .await
        .unwrap();
    employee_repository
        .create(employee_input(tenant.id, "Lim Mei", None, "4000", "0"))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs.create_draft(tenant.id, 2024, 6, None).await.unwrap();
    runs.materialize(run.id, &CancellationToken::new()).await.unwrap();

    let summary = runs.summarize(run.id).await.unwrap();
    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.gross_total, dec("7500.00"));

    let items = runs.list_items(run.id).await.unwrap();
    let expected_net = items
        .iter()
        .fold(dec("0"), |acc, item| acc + &item.totals.net);
    assert_eq!(summary.net_total, expected_net);
}

#[tokio::test]
async fn test_scoped_run_only_covers_group() {
    let db = TestDb::new().await.unwrap();
    let tenant = create_tenant(&db.pool).await.unwrap();
    let employee_repository = EmployeeRepository::new(db.pool.clone());
    let in_scope = employee_repository
        .create(employee_input(
            tenant.id,
            "Tan Wei Ming",
            Some("Outlet A"),
            "3000",
            "0",
        ))
        .await
        .unwrap();
    employee_repository
        .create(employee_input(
            tenant.id,
            "Lim Mei",
            Some("Outlet B"),
            "4000",
            "0",
        ))
        .await
        .unwrap();

    let runs = RunCoordinator::new(db.pool.clone());
    let run = runs
        .create_draft(tenant.id, 2024, 6, Some("Outlet A"))
        .await
        .unwrap();
    let outcome = runs.materialize(run.id, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.materialized, 1);

    let items = runs.list_items(run.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].employee_id, in_scope.id);
}
