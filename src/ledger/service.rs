use std::sync::Arc;

use tracing::{error, info, warn};

use super::model::{Amount, Balance, UserId, same_account};
use super::repository::AccountStore;
use crate::error::CustomError;

pub struct LedgerService {
    store: Arc<dyn AccountStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        LedgerService { store }
    }

    pub async fn deposit(&self, user_id: UserId, amount: Amount) -> Result<(), CustomError> {
        let result = self.store.deposit(user_id, &amount).await;
        log_outcome("deposit", user_id, &amount, &result);
        result
    }

    pub async fn withdraw(&self, user_id: UserId, amount: Amount) -> Result<(), CustomError> {
        let result = self.store.withdraw(user_id, &amount).await;
        log_outcome("withdraw", user_id, &amount, &result);
        result
    }

    /// Moves `amount` from `from` to `to`. The withdrawal is applied first and
    /// both legs share one atomic unit, so a recipient that does not exist
    /// leaves the sender's balance as it was.
    pub async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: Amount,
    ) -> Result<(), CustomError> {
        if from == to {
            return Err(same_account());
        }
        let result = self.store.transfer(from, to, &amount).await;
        match &result {
            Ok(()) => info!(from, to, amount = %amount.value(), "transfer applied"),
            Err(CustomError::DBError(e)) => error!(from, to, error = %e, "transfer failed"),
            Err(e) => warn!(from, to, amount = %amount.value(), reason = %e, "transfer rejected"),
        }
        result
    }

    pub async fn balance(&self, user_id: UserId) -> Result<Balance, CustomError> {
        let account = self.store.get(user_id).await?;
        Ok(account.balance)
    }
}

fn log_outcome(op: &str, user_id: UserId, amount: &Amount, result: &Result<(), CustomError>) {
    match result {
        Ok(()) => info!(op, user_id, amount = %amount.value(), "balance updated"),
        Err(CustomError::DBError(e)) => error!(op, user_id, error = %e, "store failure"),
        Err(e) => warn!(op, user_id, amount = %amount.value(), reason = %e, "operation rejected"),
    }
}
