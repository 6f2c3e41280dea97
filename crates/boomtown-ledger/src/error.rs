//! Error types for the ledger layer.

use boomtown_types::Money;

/// Errors that can occur when moving cash or building records.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The payer cannot cover the amount.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// The amount required.
        needed: Money,
        /// The balance available.
        available: Money,
    },

    /// The deduction would sink the balance below the overdraft floor.
    #[error("overdraft floor reached: balance {balance} cannot absorb {amount}")]
    OverdraftFloor {
        /// The balance before the deduction.
        balance: Money,
        /// The amount that could not be absorbed.
        amount: Money,
    },

    /// An arithmetic operation overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// A negative amount was passed where only positive amounts make sense.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    /// A required builder field was not set.
    #[error("missing transaction field: {0}")]
    MissingField(&'static str),
}
