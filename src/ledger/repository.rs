use async_trait::async_trait;
use sqlx::{AnyConnection, AnyPool};

use super::model::{Account, AccountRow, Amount, UserId};
use crate::error::CustomError;

/// Balance storage. Every mutating call is one atomic unit: operations on
/// the same account behave as if strictly serialized.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Account, CustomError>;

    /// Fails with `InsufficientBalance` and leaves the balance untouched when
    /// the account holds less than `amount`.
    async fn withdraw(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError>;

    async fn deposit(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError>;

    /// Withdraw from `from`, then deposit into `to`, as a single unit. Either
    /// both legs are applied or neither is.
    async fn transfer(&self, from: UserId, to: UserId, amount: &Amount)
    -> Result<(), CustomError>;
}

pub struct AccountRepository {
    pool: AnyPool,
}

impl AccountRepository {
    pub fn new(pool: AnyPool) -> Self {
        AccountRepository { pool }
    }

    pub fn print_pool_stats(&self) {
        tracing::debug!(
            total = self.pool.size(),
            idle = self.pool.num_idle(),
            "db pool stats"
        );
    }
}

async fn withdraw_in(
    conn: &mut AnyConnection,
    user_id: UserId,
    amount: &Amount,
) -> Result<(), CustomError> {
    // The guard and the decrement are one statement, so a concurrent writer
    // on the same row is either fully before or fully after us.
    let result = sqlx::query(
        r#"
        UPDATE users
        SET balance = balance - $1
        WHERE id = $2 AND balance >= $3
        "#,
    )
    .bind(amount.cents())
    .bind(user_id)
    .bind(amount.cents())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }
    match account_exists(conn, user_id).await? {
        true => Err(CustomError::InsufficientBalance),
        false => Err(CustomError::AccountNotFound),
    }
}

async fn deposit_in(
    conn: &mut AnyConnection,
    user_id: UserId,
    amount: &Amount,
) -> Result<(), CustomError> {
    // Bounded so the sum never leaves BIGINT; SQLite would otherwise turn
    // the column into REAL instead of failing.
    let result = sqlx::query(
        r#"
        UPDATE users
        SET balance = balance + $1
        WHERE id = $2 AND balance <= $3
        "#,
    )
    .bind(amount.cents())
    .bind(user_id)
    .bind(i64::MAX - amount.cents())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }
    match account_exists(conn, user_id).await? {
        true => Err(CustomError::BalanceOverflow),
        false => Err(CustomError::AccountNotFound),
    }
}

/// Takes the row locks of both transfer parties, lowest id first, so two
/// opposite transfers queue on the same row instead of deadlocking.
async fn lock_in_id_order(
    conn: &mut AnyConnection,
    from: UserId,
    to: UserId,
) -> Result<(), CustomError> {
    for user_id in lock_order(from, to) {
        sqlx::query(r#"UPDATE users SET balance = balance WHERE id = $1"#)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn lock_order(from: UserId, to: UserId) -> [UserId; 2] {
    if from < to { [from, to] } else { [to, from] }
}

async fn account_exists(conn: &mut AnyConnection, user_id: UserId) -> Result<bool, CustomError> {
    let row: Option<(i64,)> = sqlx::query_as(r#"SELECT id FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn get(&self, user_id: UserId) -> Result<Account, CustomError> {
        sqlx::query_as::<_, AccountRow>(r#"SELECT id, balance FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Account::from)
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => CustomError::AccountNotFound,
                _ => CustomError::DBError(e),
            })
    }

    async fn withdraw(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError> {
        let mut tx = self.pool.begin().await?;
        withdraw_in(&mut tx, user_id, amount).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn deposit(&self, user_id: UserId, amount: &Amount) -> Result<(), CustomError> {
        let mut tx = self.pool.begin().await?;
        deposit_in(&mut tx, user_id, amount).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: &Amount,
    ) -> Result<(), CustomError> {
        // Dropping `tx` on an early return rolls back the withdrawal leg.
        let mut tx = self.pool.begin().await?;
        lock_in_id_order(&mut tx, from, to).await?;
        withdraw_in(&mut tx, from, amount).await?;
        deposit_in(&mut tx, to, amount).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_lowest_id_first() {
        assert_eq!(lock_order(1, 2), [1, 2]);
        assert_eq!(lock_order(2, 1), [1, 2]);
        assert_eq!(lock_order(-5, 3), [-5, 3]);
    }
}
