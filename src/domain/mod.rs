pub mod balance;
pub mod commission;

mod booking;
mod money;
mod owner;
mod transaction;
mod wallet;

pub use booking::*;
pub use commission::{CommissionError, CommissionSplit};
pub use money::*;
pub use owner::*;
pub use transaction::*;
pub use wallet::*;
