use std::io::Write;

use anyhow::Result;

use crate::application::SettlementService;
use crate::domain::{Owner, WalletTotals, format_amount};

/// Exporter for the finance surface: reads only through the service's
/// query and aggregation functions, never mutates.
pub struct Exporter<'a> {
    service: &'a SettlementService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SettlementService) -> Self {
        Self { service }
    }

    /// Export the ledger to CSV, optionally limited to one owner.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        owner: Option<Owner>,
        writer: W,
    ) -> Result<usize> {
        let records = self.service.list_transactions(owner).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "sequence",
            "owner_kind",
            "owner_id",
            "kind",
            "amount",
            "status",
            "booking_id",
            "reason",
            "created_at",
        ])?;

        let mut count = 0;
        for record in &records {
            csv_writer.write_record([
                record.id.to_string(),
                record.sequence.to_string(),
                record.owner.kind().to_string(),
                record.owner.id().to_string(),
                record.kind.as_str().to_string(),
                record.amount.to_string(),
                record.status.as_str().to_string(),
                record
                    .booking_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                record.reason.clone().unwrap_or_default(),
                record.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export every wallet's totals and derived available amount to CSV.
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.list_balances().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "owner_kind",
            "owner_id",
            "status",
            "total_balance",
            "spend_or_withdraw",
            "refunded_or_pending",
            "available",
        ])?;

        let mut count = 0;
        for entry in &balances {
            let (debit_total, credit_total) = match entry.wallet.totals {
                WalletTotals::Customer(t) => (t.total_spend, t.total_refunded),
                WalletTotals::Model(t) => (t.total_withdraw, t.total_pending),
            };
            csv_writer.write_record([
                entry.wallet.owner.kind().to_string(),
                entry.wallet.owner.id().to_string(),
                entry.wallet.status.as_str().to_string(),
                format_amount(entry.wallet.totals.total_balance()),
                format_amount(debit_total),
                format_amount(credit_total),
                format_amount(entry.available),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
