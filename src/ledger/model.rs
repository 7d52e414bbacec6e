use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CustomError;

static AMOUNT_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d{1,2})?$").expect("amount pattern compiles"));

pub type UserId = i64;

/// Account balance, always carried with two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A positive transaction amount with at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    value: Decimal,
    cents: i64,
}

impl Amount {
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Accepts either a JSON number or a numeric string.
    pub fn from_json(value: &Value) -> Result<Self, CustomError> {
        match value {
            Value::Number(n) => n.to_string().parse(),
            Value::String(s) => s.parse(),
            _ => Err(invalid_amount()),
        }
    }
}

impl FromStr for Amount {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !AMOUNT_FORMAT.is_match(s) {
            return Err(invalid_amount());
        }
        let value = Decimal::from_str(s).map_err(|_| invalid_amount())?;
        if value < Decimal::new(1, 2) {
            return Err(CustomError::Validation(
                "The amount field must be at least 0.01.".to_string(),
            ));
        }
        let cents = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .ok_or_else(|| CustomError::Validation("The amount field is too large.".to_string()))?;
        Ok(Amount { value, cents })
    }
}

fn invalid_amount() -> CustomError {
    CustomError::Validation("The amount field format is invalid.".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub user_id: UserId,
    pub balance: Balance,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub balance: i64,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            user_id: row.id,
            balance: Balance::from_cents(row.balance),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Deposit,
    Withdraw,
}

impl FromStr for OperationType {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(OperationType::Deposit),
            "withdraw" => Ok(OperationType::Withdraw),
            _ => Err(incorrect_operation()),
        }
    }
}

pub fn incorrect_operation() -> CustomError {
    CustomError::Validation("Incorrect Operation type".to_string())
}

pub fn same_account() -> CustomError {
    CustomError::Validation(
        "The to user id field and from user id must be different.".to_string(),
    )
}

/// Body of `POST /deposit` and `POST /withdraw`.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub user_id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub amount: Option<Value>,
}

pub struct ValidTransaction {
    pub user_id: UserId,
    pub kind: OperationType,
    pub amount: Amount,
}

impl TransactionRequest {
    pub fn validate(&self) -> Result<ValidTransaction, CustomError> {
        let user_id = parse_user_id("user_id", self.user_id.as_ref())?;
        let kind = match self.kind.as_ref() {
            Some(Value::String(kind)) => kind.parse()?,
            None | Some(Value::Null) => return Err(required("type")),
            Some(_) => return Err(incorrect_operation()),
        };
        let amount = parse_amount(self.amount.as_ref())?;
        Ok(ValidTransaction {
            user_id,
            kind,
            amount,
        })
    }
}

/// Body of `POST /transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_user_id: Option<Value>,
    pub to_user_id: Option<Value>,
    pub amount: Option<Value>,
}

pub struct ValidTransfer {
    pub from: UserId,
    pub to: UserId,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn validate(&self) -> Result<ValidTransfer, CustomError> {
        let from = parse_user_id("from_user_id", self.from_user_id.as_ref())?;
        let to = parse_user_id("to_user_id", self.to_user_id.as_ref())?;
        let amount = parse_amount(self.amount.as_ref())?;
        Ok(ValidTransfer { from, to, amount })
    }
}

fn required(field: &str) -> CustomError {
    CustomError::Validation(format!("The {} field is required.", field))
}

fn parse_amount(value: Option<&Value>) -> Result<Amount, CustomError> {
    match value {
        None | Some(Value::Null) => Err(required("amount")),
        Some(value) => Amount::from_json(value),
    }
}

/// Integer ids may arrive as JSON numbers or as digit strings.
pub fn parse_user_id(field: &str, value: Option<&Value>) -> Result<UserId, CustomError> {
    let invalid = || CustomError::Validation(format!("The {} field must be an integer.", field));
    match value {
        None | Some(Value::Null) => Err(required(field)),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[derive(Serialize)]
pub struct MessageResponse<'a> {
    pub message: &'a str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn amount_accepts_up_to_two_decimals() {
        let amount: Amount = "25.50".parse().unwrap();
        assert_eq!(amount.value(), dec!(25.50));
        assert_eq!(amount.cents(), 2550);

        assert_eq!("40".parse::<Amount>().unwrap().cents(), 4000);
        assert_eq!("0.01".parse::<Amount>().unwrap().cents(), 1);
    }

    #[test]
    fn amount_rejects_bad_formats() {
        for raw in [
            "10.123",
            "-5",
            "abc",
            "",
            "1e3",
            "10.",
            ".5",
            "0",
            "0.00",
            "1000000000000000000000000000",
            "99999999999999999999.99",
        ] {
            assert!(
                matches!(raw.parse::<Amount>(), Err(CustomError::Validation(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn amount_from_json_number_and_string() {
        assert_eq!(Amount::from_json(&json!(25.5)).unwrap().cents(), 2550);
        assert_eq!(Amount::from_json(&json!(40.00)).unwrap().cents(), 4000);
        assert_eq!(Amount::from_json(&json!("30.00")).unwrap().cents(), 3000);
        assert!(Amount::from_json(&json!(10.123)).is_err());
        assert!(Amount::from_json(&json!(true)).is_err());
    }

    #[test]
    fn balance_displays_two_decimals() {
        assert_eq!(Balance::from_cents(10000).to_string(), "100.00");
        assert_eq!(Balance::from_cents(2550).to_string(), "25.50");
        assert_eq!(Balance::ZERO.to_string(), "0.00");
    }

    #[test]
    fn transaction_request_validation() {
        let req: TransactionRequest =
            serde_json::from_value(json!({"user_id": 1, "type": "deposit", "amount": 10})).unwrap();
        let valid = req.validate().unwrap();
        assert_eq!(valid.user_id, 1);
        assert_eq!(valid.kind, OperationType::Deposit);

        let req: TransactionRequest =
            serde_json::from_value(json!({"user_id": "7", "type": "refund", "amount": 10})).unwrap();
        let err = req.validate().err().unwrap();
        assert_eq!(err.to_string(), "Incorrect Operation type");

        let req: TransactionRequest =
            serde_json::from_value(json!({"type": "withdraw", "amount": 10})).unwrap();
        let err = req.validate().err().unwrap();
        assert_eq!(err.to_string(), "The user_id field is required.");
    }

    #[test]
    fn null_fields_count_as_missing() {
        let req: TransactionRequest =
            serde_json::from_value(json!({"user_id": 1, "type": "deposit", "amount": null}))
                .unwrap();
        let err = req.validate().err().unwrap();
        assert_eq!(err.to_string(), "The amount field is required.");

        let req: TransferRequest =
            serde_json::from_value(json!({"from_user_id": 1, "to_user_id": 2, "amount": null}))
                .unwrap();
        let err = req.validate().err().unwrap();
        assert_eq!(err.to_string(), "The amount field is required.");

        let req: TransactionRequest =
            serde_json::from_value(json!({"user_id": 1, "type": null, "amount": 1})).unwrap();
        let err = req.validate().err().unwrap();
        assert_eq!(err.to_string(), "The type field is required.");
    }

    #[test]
    fn transfer_request_rejects_non_integer_ids() {
        let req: TransferRequest =
            serde_json::from_value(json!({"from_user_id": 1.5, "to_user_id": 2, "amount": 1}))
                .unwrap();
        assert!(matches!(req.validate(), Err(CustomError::Validation(_))));
    }
}
