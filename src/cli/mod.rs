use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::application::{
    DisputeOutcome, DisputeResolution, ReferralSource, SettlementService,
};
use crate::domain::{
    BookingParty, Owner, TxKind, WalletStatus, WalletTotals, format_amount, parse_amount,
};
use crate::io::Exporter;

/// Holdfast - wallet ledger and booking settlement
#[derive(Parser)]
#[command(name = "holdfast")]
#[command(about = "A wallet ledger and booking-settlement engine with a hold/release lifecycle")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "holdfast.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Exactly one wallet owner.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct OwnerArg {
    /// Customer ID
    #[arg(long)]
    pub customer: Option<Uuid>,

    /// Model ID
    #[arg(long)]
    pub model: Option<Uuid>,
}

impl OwnerArg {
    fn owner(&self) -> Result<Owner> {
        match (self.customer, self.model) {
            (Some(id), None) => Ok(Owner::Customer(id)),
            (None, Some(id)) => Ok(Owner::Model(id)),
            _ => bail!("exactly one of --customer or --model is required"),
        }
    }
}

/// An optional wallet owner filter.
#[derive(Args)]
#[group(required = false, multiple = false)]
pub struct OwnerFilter {
    /// Customer ID
    #[arg(long)]
    pub customer: Option<Uuid>,

    /// Model ID
    #[arg(long)]
    pub model: Option<Uuid>,
}

impl OwnerFilter {
    fn owner(&self) -> Option<Owner> {
        match (self.customer, self.model) {
            (Some(id), None) => Some(Owner::Customer(id)),
            (None, Some(id)) => Some(Owner::Model(id)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PartyArg {
    Customer,
    Model,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Complete,
    Refund,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportTarget {
    Transactions,
    Balances,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Record a customer top-up (pending until approved)
    Recharge {
        /// Customer ID
        customer: Uuid,

        /// Amount to add (e.g., "300.00" or "300")
        amount: String,
    },

    /// Book a model's service, holding the price against the customer
    Book {
        /// Customer ID
        customer: Uuid,

        /// Model ID
        model: Uuid,

        /// Service price (e.g., "300.00")
        price: String,

        /// Platform commission rate in whole percent
        #[arg(long, default_value_t = 20)]
        rate: i64,
    },

    /// Confirm a pending booking
    Confirm {
        /// Booking ID
        booking: Uuid,
    },

    /// Complete a booking: release the hold and credit the model
    Complete {
        /// Booking ID
        booking: Uuid,
    },

    /// Cancel a booking and refund the hold
    Cancel {
        /// Booking ID
        booking: Uuid,
    },

    /// Reject a booking and refund the hold
    Reject {
        /// Booking ID
        booking: Uuid,

        /// Reason shown to the customer
        #[arg(long)]
        reason: Option<String>,
    },

    /// Flag a booking as disputed
    Dispute {
        /// Booking ID
        booking: Uuid,
    },

    /// Resolve a disputed booking
    Resolve {
        /// Booking ID
        booking: Uuid,

        /// Resolution: complete pays the model, refund returns the hold
        #[arg(value_enum)]
        outcome: OutcomeArg,
    },

    /// Record a party's check-in on a booking
    Checkin {
        /// Booking ID
        booking: Uuid,

        /// Which side is checking in
        #[arg(value_enum)]
        party: PartyArg,
    },

    /// Show a booking
    Show {
        /// Booking ID
        booking: Uuid,
    },

    /// Record a model's withdrawal request (pending until approved)
    Withdraw {
        /// Model ID
        model: Uuid,

        /// Amount to withdraw (e.g., "100.00")
        amount: String,
    },

    /// Record a subscription payment from a customer to a model
    Subscribe {
        /// Customer ID
        customer: Uuid,

        /// Model ID
        model: Uuid,

        /// Subscription price (e.g., "25.00")
        price: String,

        /// Platform commission rate in whole percent
        #[arg(long, default_value_t = 20)]
        rate: i64,
    },

    /// Credit a referral bonus to a model
    Referral {
        /// Model ID
        model: Uuid,

        /// Bonus amount (e.g., "5.00")
        amount: String,

        /// The bonus comes from a subscription rather than a booking
        #[arg(long)]
        subscription: bool,

        /// Booking the bonus belongs to, if any
        #[arg(long)]
        booking: Option<Uuid>,
    },

    /// Credit a call refund to a customer
    CallRefund {
        /// Customer ID
        customer: Uuid,

        /// Refund amount (e.g., "10.00")
        amount: String,

        /// The refund covers unused minutes
        #[arg(long)]
        unused: bool,
    },

    /// Administrative commands
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Show balance for one owner or all wallets
    Balance {
        #[command(flatten)]
        owner: OwnerFilter,
    },

    /// List ledger records
    Ledger {
        #[command(flatten)]
        owner: OwnerFilter,
    },

    /// Audit wallet totals against the ledger
    Reconcile {
        /// Rewrite drifted wallets to the recomputed totals
        #[arg(long)]
        repair: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export data as CSV to stdout
    Export {
        /// What to export
        #[arg(value_enum)]
        target: ExportTarget,

        #[command(flatten)]
        owner: OwnerFilter,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create the wallet for an owner
    Create {
        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Show an owner's wallet
    Show {
        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Suspend a wallet
    Suspend {
        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Reactivate a suspended wallet
    Activate {
        #[command(flatten)]
        owner: OwnerArg,
    },

    /// List all wallets
    List,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List pending transactions awaiting a decision
    Pending {
        /// Limit to one kind (e.g., "recharge", "withdrawal")
        #[arg(long)]
        kind: Option<String>,
    },

    /// Approve a pending transaction
    Approve {
        /// Transaction ID
        transaction: Uuid,

        /// Acting admin ID
        #[arg(long)]
        actor: Uuid,
    },

    /// Reject a pending transaction
    Reject {
        /// Transaction ID
        transaction: Uuid,

        /// Acting admin ID
        #[arg(long)]
        actor: Uuid,

        /// Reason recorded on the ledger
        #[arg(long)]
        reason: Option<String>,
    },

    /// Manually adjust a wallet balance (always ledger-recorded)
    Adjust {
        #[command(flatten)]
        owner: OwnerArg,

        /// Signed delta (e.g., "50.00" or "-50.00")
        #[arg(long, allow_hyphen_values = true)]
        delta: String,

        /// Acting admin ID
        #[arg(long)]
        actor: Uuid,

        /// Reason recorded on the ledger
        #[arg(long)]
        reason: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                SettlementService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Wallet(wallet_cmd) => {
                let service = SettlementService::connect(&self.database).await?;
                run_wallet_command(&service, wallet_cmd).await?;
            }

            Commands::Recharge { customer, amount } => {
                let service = SettlementService::connect(&self.database).await?;
                let amount = parse_amount(&amount)
                    .context("Invalid amount format. Use '300.00' or '300'")?;
                let record = service.recharge(customer, amount).await?;
                println!(
                    "Recharge of {} recorded as {} (pending approval)",
                    format_amount(record.amount),
                    record.id
                );
            }

            Commands::Book {
                customer,
                model,
                price,
                rate,
            } => {
                let service = SettlementService::connect(&self.database).await?;
                let price =
                    parse_amount(&price).context("Invalid price format. Use '300.00' or '300'")?;
                let result = service.create_booking(customer, model, price, rate).await?;
                println!(
                    "Booking {} created: {} held against customer {}",
                    result.booking.id,
                    format_amount(result.booking.price),
                    customer
                );
            }

            Commands::Confirm { booking } => {
                let service = SettlementService::connect(&self.database).await?;
                let booking = service.confirm_booking(booking).await?;
                println!("Booking {} confirmed", booking.id);
            }

            Commands::Complete { booking } => {
                let service = SettlementService::connect(&self.database).await?;
                let result = service.complete_booking(booking).await?;
                println!(
                    "Booking {} completed: payee {} / commission {}",
                    result.booking.id,
                    format_amount(result.split.net_payee),
                    format_amount(result.split.commission)
                );
            }

            Commands::Cancel { booking } => {
                let service = SettlementService::connect(&self.database).await?;
                let result = service.cancel_booking(booking).await?;
                println!(
                    "Booking {} cancelled, {} refunded",
                    result.booking.id,
                    format_amount(result.refund.amount)
                );
            }

            Commands::Reject { booking, reason } => {
                let service = SettlementService::connect(&self.database).await?;
                let result = service.reject_booking(booking, reason).await?;
                println!(
                    "Booking {} rejected, {} refunded",
                    result.booking.id,
                    format_amount(result.refund.amount)
                );
            }

            Commands::Dispute { booking } => {
                let service = SettlementService::connect(&self.database).await?;
                let booking = service.dispute_booking(booking).await?;
                println!("Booking {} disputed", booking.id);
            }

            Commands::Resolve { booking, outcome } => {
                let service = SettlementService::connect(&self.database).await?;
                let outcome = match outcome {
                    OutcomeArg::Complete => DisputeOutcome::Complete,
                    OutcomeArg::Refund => DisputeOutcome::Refund,
                };
                match service.resolve_dispute(booking, outcome).await? {
                    DisputeResolution::Completed(result) => println!(
                        "Dispute resolved: booking {} completed, payee {}",
                        result.booking.id,
                        format_amount(result.split.net_payee)
                    ),
                    DisputeResolution::Refunded(result) => println!(
                        "Dispute resolved: booking {} refunded {}",
                        result.booking.id,
                        format_amount(result.refund.amount)
                    ),
                }
            }

            Commands::Checkin { booking, party } => {
                let service = SettlementService::connect(&self.database).await?;
                let party = match party {
                    PartyArg::Customer => BookingParty::Customer,
                    PartyArg::Model => BookingParty::Model,
                };
                let booking = service.check_in(booking, party).await?;
                println!("Check-in recorded on booking {}", booking.id);
            }

            Commands::Show { booking } => {
                let service = SettlementService::connect(&self.database).await?;
                let booking = service.get_booking(booking).await?;
                print_booking(&booking);
            }

            Commands::Withdraw { model, amount } => {
                let service = SettlementService::connect(&self.database).await?;
                let amount = parse_amount(&amount)
                    .context("Invalid amount format. Use '100.00' or '100'")?;
                let record = service.request_withdrawal(model, amount).await?;
                println!(
                    "Withdrawal of {} recorded as {} (pending approval)",
                    format_amount(record.amount.abs()),
                    record.id
                );
            }

            Commands::Subscribe {
                customer,
                model,
                price,
                rate,
            } => {
                let service = SettlementService::connect(&self.database).await?;
                let price =
                    parse_amount(&price).context("Invalid price format. Use '25.00' or '25'")?;
                let result = service
                    .record_subscription(customer, model, price, rate)
                    .await?;
                println!(
                    "Subscription recorded: {} paid, payee {} / commission {}",
                    format_amount(price),
                    format_amount(result.split.net_payee),
                    format_amount(result.split.commission)
                );
            }

            Commands::Referral {
                model,
                amount,
                subscription,
                booking,
            } => {
                let service = SettlementService::connect(&self.database).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '5.00' or '5'")?;
                let source = if subscription {
                    ReferralSource::Subscription
                } else {
                    ReferralSource::Booking
                };
                let record = service
                    .credit_referral(model, amount, source, booking)
                    .await?;
                println!(
                    "Referral bonus of {} credited as {}",
                    format_amount(record.amount),
                    record.id
                );
            }

            Commands::CallRefund {
                customer,
                amount,
                unused,
            } => {
                let service = SettlementService::connect(&self.database).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '10.00' or '10'")?;
                let record = service.record_call_refund(customer, amount, unused).await?;
                println!(
                    "Call refund of {} credited as {}",
                    format_amount(record.amount),
                    record.id
                );
            }

            Commands::Admin(admin_cmd) => {
                let service = SettlementService::connect(&self.database).await?;
                run_admin_command(&service, admin_cmd).await?;
            }

            Commands::Balance { owner } => {
                let service = SettlementService::connect(&self.database).await?;
                run_balance_command(&service, owner.owner()).await?;
            }

            Commands::Ledger { owner } => {
                let service = SettlementService::connect(&self.database).await?;
                let records = service.list_transactions(owner.owner()).await?;
                for record in records {
                    print_record(&record);
                }
            }

            Commands::Reconcile { repair, json } => {
                let service = SettlementService::connect(&self.database).await?;
                let report = service.reconcile(repair).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else if report.is_consistent() {
                    println!("All {} wallets match the ledger", report.checked);
                } else {
                    println!(
                        "{} of {} wallets drifted{}",
                        report.drifted.len(),
                        report.checked,
                        if report.repaired { " (repaired)" } else { "" }
                    );
                    for drift in &report.drifted {
                        println!(
                            "  {}: stored {:?}, computed {:?}",
                            drift.owner, drift.stored, drift.computed
                        );
                    }
                }
            }

            Commands::Export { target, owner } => {
                let service = SettlementService::connect(&self.database).await?;
                let exporter = Exporter::new(&service);
                let count = match target {
                    ExportTarget::Transactions => {
                        exporter
                            .export_transactions_csv(owner.owner(), std::io::stdout())
                            .await?
                    }
                    ExportTarget::Balances => {
                        exporter.export_balances_csv(std::io::stdout()).await?
                    }
                };
                eprintln!("Exported {} rows", count);
            }
        }

        Ok(())
    }
}

async fn run_wallet_command(service: &SettlementService, command: WalletCommands) -> Result<()> {
    match command {
        WalletCommands::Create { owner } => {
            let wallet = service.create_wallet(owner.owner()?).await?;
            println!("Wallet {} created for {}", wallet.id, wallet.owner);
        }
        WalletCommands::Show { owner } => {
            let entry = service.get_balance(owner.owner()?).await?;
            print_balance(&entry.wallet.owner, &entry.wallet.totals, entry.available);
            println!("  status: {}", entry.wallet.status);
        }
        WalletCommands::Suspend { owner } => {
            let owner = owner.owner()?;
            service
                .set_wallet_status(owner, WalletStatus::Suspended)
                .await?;
            println!("Wallet for {} suspended", owner);
        }
        WalletCommands::Activate { owner } => {
            let owner = owner.owner()?;
            service
                .set_wallet_status(owner, WalletStatus::Active)
                .await?;
            println!("Wallet for {} activated", owner);
        }
        WalletCommands::List => {
            for entry in service.list_balances().await? {
                print_balance(&entry.wallet.owner, &entry.wallet.totals, entry.available);
            }
        }
    }
    Ok(())
}

async fn run_admin_command(service: &SettlementService, command: AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Pending { kind } => {
            let kind = match kind {
                Some(s) => Some(
                    TxKind::from_str(&s).with_context(|| format!("Unknown kind '{}'", s))?,
                ),
                None => None,
            };
            for record in service.list_pending(kind).await? {
                print_record(&record);
            }
        }
        AdminCommands::Approve { transaction, actor } => {
            let record = service.approve_transaction(transaction, actor).await?;
            println!("Transaction {} approved ({})", record.id, record.kind);
        }
        AdminCommands::Reject {
            transaction,
            actor,
            reason,
        } => {
            let record = service.reject_transaction(transaction, actor, reason).await?;
            println!("Transaction {} rejected ({})", record.id, record.kind);
        }
        AdminCommands::Adjust {
            owner,
            delta,
            actor,
            reason,
        } => {
            let owner = owner.owner()?;
            let delta =
                parse_amount(&delta).context("Invalid delta format. Use '50.00' or '-50.00'")?;
            let record = service.adjust_wallet(owner, delta, actor, reason).await?;
            println!(
                "Wallet for {} adjusted by {} ({})",
                owner,
                format_amount(delta),
                record.id
            );
        }
    }
    Ok(())
}

async fn run_balance_command(service: &SettlementService, owner: Option<Owner>) -> Result<()> {
    match owner {
        Some(owner) => {
            let entry = service.get_balance(owner).await?;
            print_balance(&entry.wallet.owner, &entry.wallet.totals, entry.available);
        }
        None => {
            for entry in service.list_balances().await? {
                print_balance(&entry.wallet.owner, &entry.wallet.totals, entry.available);
            }
        }
    }
    Ok(())
}

fn print_balance(owner: &Owner, totals: &WalletTotals, available: i64) {
    match totals {
        WalletTotals::Customer(t) => println!(
            "{}: balance {} | spend {} | refunded {} | available {}",
            owner,
            format_amount(t.total_balance),
            format_amount(t.total_spend),
            format_amount(t.total_refunded),
            format_amount(available)
        ),
        WalletTotals::Model(t) => println!(
            "{}: balance {} | withdrawn {} | pending {} | available {}",
            owner,
            format_amount(t.total_balance),
            format_amount(t.total_withdraw),
            format_amount(t.total_pending),
            format_amount(available)
        ),
    }
}

fn print_booking(booking: &crate::domain::Booking) {
    println!("Booking {}", booking.id);
    println!("  customer: {}", booking.customer_id);
    println!("  model: {}", booking.model_id);
    println!(
        "  price: {} (commission {}%)",
        format_amount(booking.price),
        booking.commission_rate
    );
    println!(
        "  status: {} / payment {}",
        booking.status, booking.payment_status
    );
    if let Some(at) = booking.customer_checked_in_at {
        println!("  customer checked in: {}", at.to_rfc3339());
    }
    if let Some(at) = booking.model_checked_in_at {
        println!("  model checked in: {}", at.to_rfc3339());
    }
}

fn print_record(record: &crate::domain::TransactionRecord) {
    println!(
        "{} #{} {} {} {} [{}]{}",
        record.id,
        record.sequence,
        record.owner,
        record.kind,
        format_amount(record.amount),
        record.status,
        record
            .reason
            .as_deref()
            .map(|r| format!(" - {}", r))
            .unwrap_or_default()
    );
}
