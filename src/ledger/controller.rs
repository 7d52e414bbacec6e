use std::sync::Arc;

use super::model::{
    MessageResponse, OperationType, TransactionRequest, TransferRequest, incorrect_operation,
};
use super::repository::AccountStore;
use super::service::LedgerService;
use crate::{
    constants::{NOT_FOUND, OK_RESPONSE},
    error::CustomError,
    utils::{des_from_str, error_body, ser_to_str},
};

/// HTTP-facing side of the ledger: turns request bodies into service calls
/// and service results into `(status line, JSON body)` pairs.
pub struct LedgerController {
    service: LedgerService,
}

impl LedgerController {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        LedgerController {
            service: LedgerService::new(store),
        }
    }

    pub async fn balance(&self, raw_user_id: &str) -> (String, String) {
        // A non-numeric id can never match an account.
        let Ok(user_id) = raw_user_id.parse() else {
            return (NOT_FOUND.to_string(), error_body(&CustomError::AccountNotFound));
        };
        match self.service.balance(user_id).await {
            Ok(balance) => (OK_RESPONSE.to_string(), balance.to_string()),
            Err(e) => respond_error(e),
        }
    }

    /// Shared handler for `/deposit` and `/withdraw`. The body's `type` must
    /// name the operation the route stands for.
    pub async fn transaction(&self, route: OperationType, request: &str) -> (String, String) {
        respond(self.run_transaction(route, request).await)
    }

    pub async fn transfer(&self, request: &str) -> (String, String) {
        respond(self.run_transfer(request).await)
    }

    async fn run_transaction(&self, route: OperationType, request: &str) -> Result<(), CustomError> {
        let req: TransactionRequest = des_from_str(request)?;
        let tx = req.validate()?;
        if tx.kind != route {
            return Err(incorrect_operation());
        }
        match tx.kind {
            OperationType::Deposit => self.service.deposit(tx.user_id, tx.amount).await,
            OperationType::Withdraw => self.service.withdraw(tx.user_id, tx.amount).await,
        }
    }

    async fn run_transfer(&self, request: &str) -> Result<(), CustomError> {
        let req: TransferRequest = des_from_str(request)?;
        let transfer = req.validate()?;
        self.service
            .transfer(transfer.from, transfer.to, transfer.amount)
            .await
    }
}

fn respond(result: Result<(), CustomError>) -> (String, String) {
    match result {
        Ok(()) => match ser_to_str(&MessageResponse { message: "success" }) {
            Ok(body) => (OK_RESPONSE.to_string(), body),
            Err(e) => respond_error(e),
        },
        Err(e) => respond_error(e),
    }
}

pub fn respond_error(e: CustomError) -> (String, String) {
    (e.status_line().to_string(), error_body(&e))
}
