//! Credit ledger calculator for estate-credits.
//!
//! This crate turns a persisted profile row into a normalized credit snapshot and
//! answers three questions about it, without touching storage or the clock:
//!
//! - **How many credits are left?** `remaining_credits`
//! - **May the actor run a report?** `can_perform_action`
//! - **Which field records one unit of use?** `plan_consumption`
//!
//! # Consumption order
//!
//! Tier allowances are always spent before purchased top-ups:
//!
//! - `PRO`: monthly allowance (resets each calendar month), then top-ups
//! - `UNLIMITED_PRO`: never gated, usage is still counted
//! - `FREE_TRIAL` / `STARTER_PACK`: lifetime registration bonus, then top-ups
//!
//! Anonymous actors have no lifetime allowance; they are limited to the
//! single device trial (see [`device`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod consumption;
pub mod device;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod month;
pub mod plan;
pub mod profile;
pub mod purchase;
pub mod usage;

pub use consumption::{ConsumptionInstruction, CreditSource};
pub use device::{trial_available, DeviceId, DEVICE_TRIAL_USES};
pub use error::{LedgerError, Result};
pub use ids::{IdError, UsageId, UserId};
pub use ledger::{
    can_perform_action, derive_state, plan_consumption, remaining_credits, CreditLedger,
    CreditPolicy, CreditState, UNLIMITED_CREDITS,
};
pub use month::BillingMonth;
pub use plan::{PlanType, FREE_LIFETIME_ALLOWANCE, PRO_MONTHLY_ALLOWANCE};
pub use profile::ProfileRecord;
pub use purchase::{Purchase, STARTER_PACK_CREDITS};
pub use usage::UsageRecord;
