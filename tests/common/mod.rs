// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use holdfast::application::SettlementService;
use holdfast::domain::{Cents, CustomerId, ModelId, Owner};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SettlementService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SettlementService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// A fresh admin actor id
pub fn admin() -> Uuid {
    Uuid::new_v4()
}

/// Create a customer wallet funded through an approved recharge
pub async fn funded_customer(service: &SettlementService, amount: Cents) -> Result<CustomerId> {
    let customer = Uuid::new_v4();
    service.create_wallet(Owner::Customer(customer)).await?;
    let record = service.recharge(customer, amount).await?;
    service.approve_transaction(record.id, admin()).await?;
    Ok(customer)
}

/// Create a model wallet with no balance
pub async fn new_model(service: &SettlementService) -> Result<ModelId> {
    let model = Uuid::new_v4();
    service.create_wallet(Owner::Model(model)).await?;
    Ok(model)
}

/// Create a model wallet funded through an administrative adjustment
pub async fn funded_model(service: &SettlementService, amount: Cents) -> Result<ModelId> {
    let model = new_model(service).await?;
    service
        .adjust_wallet(Owner::Model(model), amount, admin(), "test funding".into())
        .await?;
    Ok(model)
}
