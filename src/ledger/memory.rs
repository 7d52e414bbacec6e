use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::model::{Account, Amount, Balance, UserId, same_account};
use super::repository::AccountStore;
use crate::error::CustomError;

type Slot = Arc<Mutex<i64>>;

/// In-process account store. Each account has its own mutex; the map lock is
/// only held long enough to clone a slot handle.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<UserId, Slot>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces an account. Accounts are provisioned outside the
    /// ledger, so this is only reachable from setup code.
    pub fn insert(&self, user_id: UserId, balance: Decimal) -> Result<(), CustomError> {
        let cents = to_cents(balance)?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| CustomError::StoreUnavailable)?;
        accounts.insert(user_id, Arc::new(Mutex::new(cents)));
        Ok(())
    }

    fn slot(&self, user_id: UserId) -> Result<Slot, CustomError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| CustomError::StoreUnavailable)?;
        accounts
            .get(&user_id)
            .cloned()
            .ok_or(CustomError::AccountNotFound)
    }
}

fn to_cents(balance: Decimal) -> Result<i64, CustomError> {
    use rust_decimal::prelude::ToPrimitive;

    if balance.is_sign_negative() || balance.scale() > 2 {
        return Err(CustomError::Validation(format!("invalid balance {}", balance)));
    }
    balance
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(CustomError::BalanceOverflow)
}

fn debit(balance: &mut i64, amount: &Amount) -> Result<(), CustomError> {
    if *balance < amount.cents() {
        return Err(CustomError::InsufficientBalance);
    }
    *balance -= amount.cents();
    Ok(())
}

fn credit(balance: &mut i64, amount: &Amount) -> Result<(), CustomError> {
    *balance = balance
        .checked_add(amount.cents())
        .ok_or(CustomError::BalanceOverflow)?;
    Ok(())
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, user_id: UserId) -> Result<Account, CustomError> {
        let slot = self.slot(user_id)?;
        let cents = *slot.lock().await;
        Ok(Account {
            user_id,
            balance: Balance::from_cents(cents),
        })
    }

    async fn withdraw(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError> {
        let slot = self.slot(user_id)?;
        let mut balance = slot.lock().await;
        debit(&mut balance, amount)
    }

    async fn deposit(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError> {
        let slot = self.slot(user_id)?;
        let mut balance = slot.lock().await;
        credit(&mut balance, amount)
    }

    async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: &Amount,
    ) -> Result<(), CustomError> {
        // Locking one slot twice would never return.
        if from == to {
            return Err(same_account());
        }
        let from_slot = self.slot(from)?;
        let to_slot = self.slot(to)?;

        // Lock in id order so opposite transfers cannot deadlock.
        let (mut from_balance, mut to_balance) = if from < to {
            let f = from_slot.lock().await;
            let t = to_slot.lock().await;
            (f, t)
        } else {
            let t = to_slot.lock().await;
            let f = from_slot.lock().await;
            (f, t)
        };

        let mut credited = *to_balance;
        credit(&mut credited, amount)?;
        debit(&mut from_balance, amount)?;
        *to_balance = credited;
        Ok(())
    }
}
