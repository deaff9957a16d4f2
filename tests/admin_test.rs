mod common;

use anyhow::Result;
use common::{admin, funded_customer, new_model, test_service};
use holdfast::application::AppError;
use holdfast::domain::{Owner, TxKind, TxStatus};

#[tokio::test]
async fn approving_twice_hits_the_optimistic_guard() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = uuid::Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;

    let record = service.recharge(customer, 100_000).await?;
    service.approve_transaction(record.id, admin()).await?;

    let second = service.approve_transaction(record.id, admin()).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    // The balance was credited exactly once.
    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 100_000);
    Ok(())
}

#[tokio::test]
async fn rejecting_an_approved_record_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = uuid::Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;

    let record = service.recharge(customer, 100_000).await?;
    service.approve_transaction(record.id, admin()).await?;

    let result = service.reject_transaction(record.id, admin(), None).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn holds_are_not_approvable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 100_000).await?;
    let model = new_model(&service).await?;

    let result = service.create_booking(customer, model, 30_000, 20).await?;

    // A hold is `held`, not `pending`; money held for a booking moves only
    // through the settlement paths.
    let approve = service.approve_transaction(result.hold.id, admin()).await;
    assert!(matches!(approve, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn rejected_earning_leaves_total_pending() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 100_000).await?;
    let model = new_model(&service).await?;

    let booking = service.create_booking(customer, model, 30_000, 20).await?.booking;
    service.confirm_booking(booking.id).await?;
    let completion = service.complete_booking(booking.id).await?;
    let earning = completion.earning.expect("earning present");

    assert_eq!(service.get_available(Owner::Model(model)).await?, 0);

    service
        .reject_transaction(earning.id, admin(), Some("payout blocked".into()))
        .await?;

    // Neither pending nor spendable any more.
    let entry = service.get_balance(Owner::Model(model)).await?;
    assert_eq!(entry.available, 0);
    match entry.wallet.totals {
        holdfast::domain::WalletTotals::Model(t) => {
            assert_eq!(t.total_pending, 0);
            assert_eq!(t.total_balance, 0);
        }
        holdfast::domain::WalletTotals::Customer(_) => panic!("expected model totals"),
    }

    let report = service.reconcile(false).await?;
    assert!(report.is_consistent());
    Ok(())
}

#[tokio::test]
async fn pending_queue_filters_by_kind() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = uuid::Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;
    service.recharge(customer, 10_000).await?;
    service.recharge(customer, 20_000).await?;

    let all = service.list_pending(None).await?;
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.status == TxStatus::Pending));

    let recharges = service.list_pending(Some(TxKind::Recharge)).await?;
    assert_eq!(recharges.len(), 2);

    let withdrawals = service.list_pending(Some(TxKind::Withdrawal)).await?;
    assert!(withdrawals.is_empty());
    Ok(())
}

#[tokio::test]
async fn adjustments_require_a_non_zero_delta() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = uuid::Uuid::new_v4();
    let owner = Owner::Customer(customer);
    service.create_wallet(owner).await?;

    let result = service
        .adjust_wallet(owner, 0, admin(), "noop".into())
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    Ok(())
}

#[tokio::test]
async fn unknown_ids_surface_as_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let missing_tx = service
        .approve_transaction(uuid::Uuid::new_v4(), admin())
        .await;
    assert!(matches!(missing_tx, Err(AppError::TransactionNotFound(_))));

    let missing_booking = service.complete_booking(uuid::Uuid::new_v4()).await;
    assert!(matches!(missing_booking, Err(AppError::BookingNotFound(_))));

    let missing_wallet = service
        .get_balance(Owner::Customer(uuid::Uuid::new_v4()))
        .await;
    assert!(matches!(missing_wallet, Err(AppError::WalletNotFound(_))));
    Ok(())
}
