use anyhow::Result;
use holdfast::Repository;
use holdfast::domain::{Owner, TransactionRecord, TxKind, TxStatus};
use tempfile::TempDir;
use uuid::Uuid;

async fn test_repo() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("ledger.db");
    let repo =
        Repository::init(&format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap())).await?;
    Ok((repo, temp_dir))
}

fn pending_recharge(amount: i64) -> TransactionRecord {
    TransactionRecord::new(
        Owner::Customer(Uuid::new_v4()),
        TxKind::Recharge,
        amount,
        TxStatus::Pending,
    )
}

#[tokio::test]
async fn zero_amounts_are_rejected_before_any_write() -> Result<()> {
    let (repo, _temp) = test_repo().await?;

    let mut record = pending_recharge(0);
    assert!(repo.append_transaction(&mut record).await.is_err());
    assert!(repo.list_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn appends_get_strictly_increasing_sequence_numbers() -> Result<()> {
    let (repo, _temp) = test_repo().await?;

    let mut first = pending_recharge(10_000);
    let mut second = pending_recharge(20_000);
    let mut third = pending_recharge(30_000);
    repo.append_transaction(&mut first).await?;
    repo.append_transaction(&mut second).await?;
    repo.append_transaction(&mut third).await?;

    assert!(first.sequence < second.sequence);
    assert!(second.sequence < third.sequence);

    // Listing follows ledger order.
    let listed = repo.list_transactions().await?;
    let sequences: Vec<_> = listed.iter().map(|r| r.sequence).collect();
    assert_eq!(
        sequences,
        vec![first.sequence, second.sequence, third.sequence]
    );
    Ok(())
}

#[tokio::test]
async fn status_transitions_require_the_expected_current_state() -> Result<()> {
    let (repo, _temp) = test_repo().await?;

    let mut record = pending_recharge(10_000);
    repo.append_transaction(&mut record).await?;

    // A transition from the wrong state writes nothing.
    assert!(
        !repo
            .transition_transaction(record.id, TxStatus::Held, TxStatus::Released)
            .await?
    );

    assert!(
        repo.transition_transaction(record.id, TxStatus::Pending, TxStatus::Approved)
            .await?
    );

    // A second identical transition loses the optimistic guard.
    assert!(
        !repo
            .transition_transaction(record.id, TxStatus::Pending, TxStatus::Approved)
            .await?
    );

    let stored = repo.get_transaction(record.id).await?.expect("record exists");
    assert_eq!(stored.status, TxStatus::Approved);
    Ok(())
}

#[tokio::test]
async fn transitions_touch_only_the_status_field() -> Result<()> {
    let (repo, _temp) = test_repo().await?;

    let mut record = pending_recharge(10_000);
    repo.append_transaction(&mut record).await?;
    repo.transition_transaction(record.id, TxStatus::Pending, TxStatus::Cancelled)
        .await?;

    let stored = repo.get_transaction(record.id).await?.expect("record exists");
    assert_eq!(stored.amount, record.amount);
    assert_eq!(stored.kind, record.kind);
    assert_eq!(stored.owner, record.owner);
    assert_eq!(stored.sequence, record.sequence);
    Ok(())
}

#[tokio::test]
async fn owner_slices_are_disjoint() -> Result<()> {
    let (repo, _temp) = test_repo().await?;

    let customer = Owner::Customer(Uuid::new_v4());
    let model = Owner::Model(Uuid::new_v4());

    let mut a = TransactionRecord::new(customer, TxKind::Recharge, 10_000, TxStatus::Pending);
    let mut b = TransactionRecord::new(model, TxKind::BookingEarning, 5_000, TxStatus::Pending);
    repo.append_transaction(&mut a).await?;
    repo.append_transaction(&mut b).await?;

    let customer_slice = repo.list_transactions_for_owner(customer).await?;
    assert_eq!(customer_slice.len(), 1);
    assert_eq!(customer_slice[0].id, a.id);

    let model_slice = repo.list_transactions_for_owner(model).await?;
    assert_eq!(model_slice.len(), 1);
    assert_eq!(model_slice[0].id, b.id);
    Ok(())
}
