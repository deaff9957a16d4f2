mod common;

use anyhow::Result;
use common::{admin, funded_customer, funded_model, new_model, test_service};
use holdfast::application::{AppError, ReferralSource};
use holdfast::domain::{Owner, TxStatus, WalletStatus, WalletTotals};
use uuid::Uuid;

#[tokio::test]
async fn each_owner_gets_exactly_one_wallet() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = Uuid::new_v4();

    service.create_wallet(Owner::Customer(customer)).await?;
    let duplicate = service.create_wallet(Owner::Customer(customer)).await;
    assert!(matches!(duplicate, Err(AppError::WalletAlreadyExists(_))));

    // The same id as a model is a different owner.
    service.create_wallet(Owner::Model(customer)).await?;
    Ok(())
}

#[tokio::test]
async fn recharge_counts_only_after_approval() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;

    let record = service.recharge(customer, 100_000).await?;
    assert_eq!(record.status, TxStatus::Pending);
    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 0);

    let actor = admin();
    let approved = service.approve_transaction(record.id, actor).await?;
    assert_eq!(approved.status, TxStatus::Approved);
    assert_eq!(approved.approved_by, Some(actor));
    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 100_000);
    Ok(())
}

#[tokio::test]
async fn rejected_recharge_never_reaches_the_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;

    let record = service.recharge(customer, 100_000).await?;
    let actor = admin();
    let rejected = service
        .reject_transaction(record.id, actor, Some("card declined".into()))
        .await?;
    assert_eq!(rejected.status, TxStatus::Rejected);
    assert_eq!(rejected.rejected_by, Some(actor));
    assert_eq!(rejected.reason.as_deref(), Some("card declined"));
    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 0);
    Ok(())
}

#[tokio::test]
async fn suspended_wallet_refuses_operations() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 100_000).await?;
    let model = new_model(&service).await?;
    let owner = Owner::Customer(customer);

    service.set_wallet_status(owner, WalletStatus::Suspended).await?;

    assert!(matches!(
        service.recharge(customer, 10_000).await,
        Err(AppError::WalletSuspended(_))
    ));
    assert!(matches!(
        service.create_booking(customer, model, 10_000, 20).await,
        Err(AppError::WalletSuspended(_))
    ));
    assert!(matches!(
        service
            .adjust_wallet(owner, 10_000, admin(), "should fail".into())
            .await,
        Err(AppError::WalletSuspended(_))
    ));

    service.set_wallet_status(owner, WalletStatus::Active).await?;
    service.recharge(customer, 10_000).await?;
    Ok(())
}

#[tokio::test]
async fn adjustment_is_ledger_recorded_and_reconcilable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = Uuid::new_v4();
    let owner = Owner::Customer(customer);
    service.create_wallet(owner).await?;

    let actor = admin();
    let record = service
        .adjust_wallet(owner, 50_000, actor, "goodwill credit".into())
        .await?;
    assert_eq!(record.status, TxStatus::Approved);
    assert_eq!(record.approved_by, Some(actor));
    assert_eq!(service.get_available(owner).await?, 50_000);

    // The manual edit is explainable by a from-scratch recompute.
    let report = service.reconcile(false).await?;
    assert!(report.is_consistent());
    Ok(())
}

#[tokio::test]
async fn negative_adjustment_may_overdraw_but_stays_explainable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 10_000).await?;
    let owner = Owner::Customer(customer);

    service
        .adjust_wallet(owner, -30_000, admin(), "clawback".into())
        .await?;
    assert_eq!(service.get_available(owner).await?, -20_000);

    let report = service.reconcile(false).await?;
    assert!(report.is_consistent());
    Ok(())
}

#[tokio::test]
async fn call_refunds_add_to_refunded_and_available() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 50_000).await?;
    let owner = Owner::Customer(customer);

    service.record_call_refund(customer, 5_000, false).await?;
    service.record_call_refund(customer, 1_500, true).await?;

    let entry = service.get_balance(owner).await?;
    match entry.wallet.totals {
        WalletTotals::Customer(t) => {
            assert_eq!(t.total_refunded, 6_500);
            assert_eq!(t.total_balance, 50_000);
        }
        WalletTotals::Model(_) => panic!("expected customer totals"),
    }
    assert_eq!(entry.available, 56_500);
    Ok(())
}

#[tokio::test]
async fn referral_bonus_credits_the_model_immediately() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let model = new_model(&service).await?;

    service
        .credit_referral(model, 2_000, ReferralSource::Booking, None)
        .await?;
    service
        .credit_referral(model, 1_000, ReferralSource::Subscription, None)
        .await?;

    assert_eq!(service.get_available(Owner::Model(model)).await?, 3_000);
    Ok(())
}

#[tokio::test]
async fn subscription_debits_customer_and_credits_payee() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 50_000).await?;
    let model = new_model(&service).await?;

    let result = service
        .record_subscription(customer, model, 10_000, 20)
        .await?;
    assert_eq!(result.split.net_payee, 8_000);
    assert_eq!(result.payment.amount, -10_000);

    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 40_000);

    let entry = service.get_balance(Owner::Model(model)).await?;
    match entry.wallet.totals {
        WalletTotals::Model(t) => assert_eq!(t.total_pending, 8_000),
        WalletTotals::Customer(_) => panic!("expected model totals"),
    }

    let report = service.reconcile(false).await?;
    assert!(report.is_consistent());
    Ok(())
}

#[tokio::test]
async fn subscription_fails_without_funds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = funded_customer(&service, 5_000).await?;
    let model = new_model(&service).await?;

    let result = service.record_subscription(customer, model, 10_000, 20).await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

    // Neither side saw a write.
    assert_eq!(service.get_available(Owner::Customer(customer)).await?, 5_000);
    assert!(
        service
            .list_transactions(Some(Owner::Model(model)))
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn withdrawal_requests_count_pending_against_available() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let model = funded_model(&service, 100_000).await?;
    let owner = Owner::Model(model);

    let first = service.request_withdrawal(model, 60_000).await?;
    assert_eq!(first.status, TxStatus::Pending);
    // A pending request does not reduce available yet...
    assert_eq!(service.get_available(owner).await?, 100_000);

    // ...but a second request cannot ride on the same funds.
    let second = service.request_withdrawal(model, 60_000).await;
    assert!(matches!(
        second,
        Err(AppError::InsufficientFunds {
            available: 40_000,
            required: 60_000,
            ..
        })
    ));

    service.approve_transaction(first.id, admin()).await?;
    let entry = service.get_balance(owner).await?;
    match entry.wallet.totals {
        WalletTotals::Model(t) => assert_eq!(t.total_withdraw, 60_000),
        WalletTotals::Customer(_) => panic!("expected model totals"),
    }
    assert_eq!(entry.available, 40_000);
    Ok(())
}

#[tokio::test]
async fn withdrawal_approval_rechecks_availability() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let model = funded_model(&service, 50_000).await?;
    let owner = Owner::Model(model);

    let request = service.request_withdrawal(model, 50_000).await?;

    // The balance shrinks before the admin gets to it.
    service
        .adjust_wallet(owner, -30_000, admin(), "chargeback clawback".into())
        .await?;

    let result = service.approve_transaction(request.id, admin()).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientFunds {
            available: 20_000,
            required: 50_000,
            ..
        })
    ));

    // The request is still pending; nothing moved.
    assert_eq!(service.get_available(owner).await?, 20_000);
    let report = service.reconcile(false).await?;
    assert!(report.is_consistent());
    Ok(())
}

#[tokio::test]
async fn rejected_withdrawal_frees_the_pending_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let model = funded_model(&service, 100_000).await?;

    let request = service.request_withdrawal(model, 60_000).await?;
    service
        .reject_transaction(request.id, admin(), Some("payout details invalid".into()))
        .await?;

    // The full amount is requestable again.
    service.request_withdrawal(model, 100_000).await?;
    Ok(())
}
