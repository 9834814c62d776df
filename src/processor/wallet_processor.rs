use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    account::Account,
    command::{
        BalanceAction, BalanceCommand, BalanceRequest, Field, FieldError, RefundRequest,
        TransactionRequest, decimal_from_number, require, transaction_polarity,
    },
    store::{AccountHandle, AccountStore, lock},
};

use super::{BalanceResponse, TransactionResponse, WalletError};

/// Runs the wallet operations against an [`AccountStore`].
///
/// Every operation is an ordered list of checks and the first failing one wins,
/// so the order below is part of the contract with callers. The account lock is
/// taken once the account is found and held until the balance is updated.
pub struct WalletProcessor<S> {
    store: S,
}

impl<S> WalletProcessor<S>
where
    S: AccountStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn balance(&self, request: &BalanceRequest) -> Result<BalanceResponse, WalletError> {
        let token = require(&request.session_token, "session_token")?;
        let handle = token
            .as_str()
            .and_then(|token| self.store.find_by_session_token(token))
            .ok_or_else(|| WalletError::AccountNotFound(token.to_string()))?;
        let acc = lock(&handle);
        Ok(BalanceResponse {
            error: 0,
            balance: acc.balance(),
            external_id: acc.id.clone(),
            session_token: acc.session_token.clone(),
            currency: acc.currency.clone(),
            lang: acc.lang.clone(),
            username: acc.username.clone(),
        })
    }

    pub fn credit(&self, request: &TransactionRequest) -> Result<TransactionResponse, WalletError> {
        let handle = self.locate(&request.external_id)?;
        let mut acc = lock(&handle);
        let amount = validate(&acc, request, FieldError::Required { field: "amount" })?;
        execute(
            &mut acc,
            BalanceCommand {
                action: BalanceAction::Credit,
                amount,
            },
        )
    }

    pub fn debit(&self, request: &TransactionRequest) -> Result<TransactionResponse, WalletError> {
        let handle = self.locate(&request.external_id)?;
        let mut acc = lock(&handle);
        let amount = validate(&acc, request, FieldError::AmountRequired)?;
        execute(
            &mut acc,
            BalanceCommand {
                action: BalanceAction::Debit,
                amount,
            },
        )
    }

    pub fn refund(&self, request: &RefundRequest) -> Result<TransactionResponse, WalletError> {
        let handle = self.locate(&request.transaction.external_id)?;
        let transaction_id = require(&request.transaction_id, "transaction_id")?;
        let mut acc = lock(&handle);
        let amount = validate(&acc, &request.transaction, FieldError::AmountRequired)?;
        let polarity = transaction_polarity(transaction_id);
        execute(
            &mut acc,
            BalanceCommand {
                action: BalanceAction::Refund(polarity),
                amount,
            },
        )
    }

    fn locate(&self, external_id: &Option<Field>) -> Result<AccountHandle, WalletError> {
        let external_id = require(external_id, "external_id")?;
        external_id
            .as_str()
            .and_then(|id| self.store.find_by_id(id))
            .ok_or_else(|| WalletError::AccountNotFound(external_id.to_string()))
    }
}

fn validate(
    acc: &Account,
    request: &TransactionRequest,
    amount_required: FieldError,
) -> Result<Decimal, WalletError> {
    let currency = require(&request.currency, "currency")?;
    if !currency.matches(&acc.currency) {
        return Err(WalletError::CurrencyMismatch(currency.to_string()));
    }

    let timestamp = require(&request.timestamp, "timestamp")?.to_number();
    if timestamp == 0.0 || timestamp.is_nan() {
        return Err(FieldError::NotNumeric { field: "timestamp" }.into());
    }

    let amount = request
        .amount
        .as_ref()
        .filter(|amount| amount.is_truthy())
        .ok_or(amount_required)?;
    // infinities and values beyond Decimal's range are reported as non-numeric too
    decimal_from_number(amount.to_number())
        .ok_or(FieldError::NotNumeric { field: "amount" }.into())
}

fn execute(
    acc: &mut Account,
    command: BalanceCommand,
) -> Result<TransactionResponse, WalletError> {
    let evt = acc.handle_command(&command)?;
    acc.apply(&evt);
    tracing::info!(
        account = %acc.id,
        kind = ?evt.kind(),
        amount = %evt.amount(),
        balance = %acc.balance(),
        "balance updated"
    );
    Ok(TransactionResponse {
        error: 0,
        balance: acc.balance(),
        currency: acc.currency.clone(),
        transaction_id: Uuid::new_v4().to_string(),
    })
}
