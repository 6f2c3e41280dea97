//! Checked cash movement.
//!
//! Action-layer debits use [`debit`]: they fail outright when the payer
//! cannot cover the amount. Tick-time upkeep uses [`debit_to_floor`]: a
//! building's upkeep may push its owner negative, but only down to the
//! configured overdraft floor.

use boomtown_types::Money;

use crate::error::LedgerError;

/// Deduct `amount` from `balance`, failing if the balance cannot cover it.
///
/// # Errors
///
/// [`LedgerError::NonPositiveAmount`] for zero/negative amounts,
/// [`LedgerError::InsufficientFunds`] when the balance is short, and
/// [`LedgerError::ArithmeticOverflow`] on arithmetic failure.
pub fn debit(balance: Money, amount: Money) -> Result<Money, LedgerError> {
    if amount.minor() <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    if !balance.covers(amount) {
        return Err(LedgerError::InsufficientFunds {
            needed: amount,
            available: balance,
        });
    }
    balance
        .checked_sub(amount)
        .ok_or(LedgerError::ArithmeticOverflow)
}

/// Deduct `amount` from `balance`, allowing the result to go negative but
/// never below `floor`. Used by the tick earnings pass: an owner still
/// pays upkeep on a loss-making building.
///
/// The deduction is clamped at the floor rather than rejected: whatever
/// the balance can absorb is taken.
///
/// # Errors
///
/// [`LedgerError::NonPositiveAmount`] for zero/negative amounts and
/// [`LedgerError::ArithmeticOverflow`] on arithmetic failure.
pub fn debit_to_floor(
    balance: Money,
    amount: Money,
    floor: Money,
) -> Result<Money, LedgerError> {
    if amount.minor() <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    let target = balance
        .checked_sub(amount)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    if target.minor() < floor.minor() {
        Ok(Money::from_minor(floor.minor().min(balance.minor())))
    } else {
        Ok(target)
    }
}

/// Add `amount` to `balance`.
///
/// # Errors
///
/// [`LedgerError::NonPositiveAmount`] for zero/negative amounts and
/// [`LedgerError::ArithmeticOverflow`] on arithmetic failure.
pub fn credit(balance: Money, amount: Money) -> Result<Money, LedgerError> {
    if amount.minor() <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    balance
        .checked_add(amount)
        .ok_or(LedgerError::ArithmeticOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn debit_takes_exact_amount() {
        let after = debit(Money::from_minor(50_000), Money::from_minor(1_000)).unwrap();
        assert_eq!(after, Money::from_minor(49_000));
    }

    #[test]
    fn debit_rejects_shortfall() {
        let err = debit(Money::from_minor(500), Money::from_minor(1_000)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn debit_rejects_non_positive() {
        assert!(debit(Money::from_minor(500), Money::ZERO).is_err());
        assert!(debit(Money::from_minor(500), Money::from_minor(-10)).is_err());
    }

    #[test]
    fn floor_debit_goes_negative_but_stops_at_floor() {
        let floor = Money::from_minor(-10_000);
        let after = debit_to_floor(Money::from_minor(100), Money::from_minor(400), floor).unwrap();
        assert_eq!(after, Money::from_minor(-300));

        let clamped =
            debit_to_floor(Money::from_minor(-9_900), Money::from_minor(500), floor).unwrap();
        assert_eq!(clamped, floor);
    }

    #[test]
    fn floor_debit_never_raises_a_sunk_balance() {
        // A balance already below the floor is left where it is.
        let floor = Money::from_minor(-10_000);
        let after =
            debit_to_floor(Money::from_minor(-12_000), Money::from_minor(100), floor).unwrap();
        assert_eq!(after, Money::from_minor(-12_000));
    }

    #[test]
    fn credit_adds() {
        let after = credit(Money::from_minor(1_000), Money::from_minor(270)).unwrap();
        assert_eq!(after, Money::from_minor(1_270));
    }
}
