//! The social sublayer: map chat, hero messages, temple donations, and
//! offshore savings at the bank.

use chrono::Utc;

use boomtown_ledger::{TransactionBuilder, credit, debit};
use boomtown_types::{
    ChatKind, ChatMessage, ChatMessageId, GameCompany, GameError, GameMap, ModerationStatus,
    Money, TransactionKind, TransactionRecord,
};

use crate::actions::validation::{ensure_funds, ensure_not_imprisoned, ensure_on_map};

/// The longest accepted chat or hero message body.
const MAX_MESSAGE_LEN: usize = 500;

/// Build a chat or hero message after the moderation gate has spoken.
///
/// `status` is the gate's verdict mapped to visibility: only approved
/// messages render on the map; pending ones wait for an admin.
pub fn post_message(
    company: &GameCompany,
    map: &GameMap,
    kind: ChatKind,
    body: String,
    status: ModerationStatus,
) -> Result<ChatMessage, GameError> {
    ensure_not_imprisoned(company)?;
    ensure_on_map(company, map)?;
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(GameError::invalid("message is empty"));
    }
    if trimmed.len() > MAX_MESSAGE_LEN {
        return Err(GameError::invalid("message is too long"));
    }

    Ok(ChatMessage {
        id: ChatMessageId::new(),
        map_id: map.id,
        company: company.id,
        kind,
        body: trimmed.to_owned(),
        moderation_status: status,
        created_at: Utc::now(),
    })
}

/// Outcome of a temple donation.
#[derive(Debug, Clone)]
pub struct DonationOutcome {
    /// The donor with cash debited.
    pub company: GameCompany,
    /// The audit record (the donation leaderboard sums these).
    pub transaction: TransactionRecord,
}

/// Donate to the map's temple. Donations feed the global leaderboard.
pub fn donate(
    company: GameCompany,
    map: &GameMap,
    amount: Money,
) -> Result<DonationOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    if amount.minor() <= 0 {
        return Err(GameError::invalid("donation must be positive"));
    }
    ensure_funds(&company, amount)?;

    let mut company = company;
    company.cash = debit(company.cash, amount).map_err(|e| GameError::internal(e.to_string()))?;

    let transaction = TransactionBuilder::new(TransactionKind::Donation, company.id)
        .map(map.id)
        .amount(Money::from_minor(amount.minor().saturating_neg()))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(DonationOutcome {
        company,
        transaction,
    })
}

/// Outcome of an offshore deposit or withdrawal at the bank.
#[derive(Debug, Clone)]
pub struct OffshoreOutcome {
    /// The company with balances moved.
    pub company: GameCompany,
    /// The audit record.
    pub transaction: TransactionRecord,
}

/// Move liquid cash into offshore savings at the bank.
///
/// Offshore savings count toward net worth but cannot be spent, and they
/// survive leaving a location.
pub fn offshore_deposit(
    company: GameCompany,
    map: &GameMap,
    amount: Money,
) -> Result<OffshoreOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    if amount.minor() <= 0 {
        return Err(GameError::invalid("deposit must be positive"));
    }
    ensure_funds(&company, amount)?;

    let mut company = company;
    company.cash = debit(company.cash, amount).map_err(|e| GameError::internal(e.to_string()))?;
    company.offshore =
        credit(company.offshore, amount).map_err(|e| GameError::internal(e.to_string()))?;

    let transaction = TransactionBuilder::new(TransactionKind::OffshoreDeposit, company.id)
        .map(map.id)
        .amount(Money::from_minor(amount.minor().saturating_neg()))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(OffshoreOutcome {
        company,
        transaction,
    })
}

/// Withdraw offshore savings back into liquid cash.
pub fn offshore_withdraw(
    company: GameCompany,
    map: &GameMap,
    amount: Money,
) -> Result<OffshoreOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    if amount.minor() <= 0 {
        return Err(GameError::invalid("withdrawal must be positive"));
    }
    if !company.offshore.covers(amount) {
        return Err(GameError::precondition("insufficient offshore savings"));
    }

    let mut company = company;
    company.offshore =
        debit(company.offshore, amount).map_err(|e| GameError::internal(e.to_string()))?;
    company.cash = credit(company.cash, amount).map_err(|e| GameError::internal(e.to_string()))?;

    let transaction = TransactionBuilder::new(TransactionKind::OffshoreWithdrawal, company.id)
        .map(map.id)
        .amount(amount)
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(OffshoreOutcome {
        company,
        transaction,
    })
}
