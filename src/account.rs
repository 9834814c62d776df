use rust_decimal::Decimal;
use thiserror::Error;

use crate::command::{BalanceAction, BalanceCommand, Polarity};

pub type AccountId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEventKind {
    Credited,
    Debited,
    Refunded(Polarity),
}

/// Carries the resulting balance, so applying an event cannot overflow.
#[derive(Debug)]
pub struct AccountEvent {
    amount: Decimal,
    balance: Decimal,
    kind: AccountEventKind,
}

impl AccountEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn kind(&self) -> AccountEventKind {
        self.kind
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    // reported to callers exactly like an amount that does not fit a Decimal
    #[error("the field amount must be numeric")]
    BalanceOutOfRange { kind: AccountEventKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub currency: String,
    pub lang: String,
    pub session_token: String,
    balance: Decimal,
}

impl Account {
    pub fn new(
        id: impl Into<AccountId>,
        username: impl Into<String>,
        currency: impl Into<String>,
        lang: impl Into<String>,
        session_token: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            currency: currency.into(),
            lang: lang.into(),
            session_token: session_token.into(),
            balance,
        }
    }

    /// The player every fresh process starts with.
    pub fn seed() -> Self {
        Self::new("1-en", "player", "USD", "en", "abc123", Decimal::new(1000, 1))
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        self.balance = event.balance;
    }

    /// Balance may go negative: debits are not checked against available funds.
    pub fn handle_command(&self, command: &BalanceCommand) -> Result<AccountEvent, AccountError> {
        let kind = match command.action {
            BalanceAction::Credit => AccountEventKind::Credited,
            BalanceAction::Debit => AccountEventKind::Debited,
            BalanceAction::Refund(polarity) => AccountEventKind::Refunded(polarity),
        };
        let balance = match kind {
            AccountEventKind::Credited | AccountEventKind::Refunded(Polarity::Add) => {
                self.balance.checked_add(command.amount)
            }
            AccountEventKind::Debited | AccountEventKind::Refunded(Polarity::Subtract) => {
                self.balance.checked_sub(command.amount)
            }
        }
        .ok_or(AccountError::BalanceOutOfRange { kind })?;
        Ok(AccountEvent {
            amount: command.amount,
            balance,
            kind,
        })
    }
}
