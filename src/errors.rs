use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::Currency;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("loaned value must be positive: {amount}")]
    NonPositiveLoanValue {
        amount: Money,
    },

    #[error("client tax id is required")]
    MissingClientIdentifier,

    #[error("loaned item reference is required")]
    MissingItemReference,

    #[error("duplicate process number: {process_number}")]
    DuplicateProcessNumber {
        process_number: String,
    },

    #[error("returned value must not be negative: {amount}")]
    NegativeReturnValue {
        amount: Money,
    },

    #[error("currency mismatch: loan is in {loan_currency}, return submitted in {return_currency}")]
    CurrencyMismatch {
        loan_currency: Currency,
        return_currency: Currency,
    },

    #[error("loan {process_number} is already settled; a zero-value return records nothing")]
    RedundantZeroReturn {
        process_number: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("return event not found: {id}")]
    ReturnEventNotFound {
        id: Uuid,
    },

    #[error("physical entry already confirmed for return event {id} at {confirmed_at}")]
    PhysicalEntryAlreadyConfirmed {
        id: Uuid,
        confirmed_at: DateTime<Utc>,
    },

    #[error("invalid snapshot: {message}")]
    InvalidSnapshot {
        message: String,
    },
}

impl LoanError {
    /// true for input the caller can correct and resubmit
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoanError::NonPositiveLoanValue { .. }
                | LoanError::MissingClientIdentifier
                | LoanError::MissingItemReference
                | LoanError::DuplicateProcessNumber { .. }
                | LoanError::NegativeReturnValue { .. }
                | LoanError::CurrencyMismatch { .. }
                | LoanError::RedundantZeroReturn { .. }
        )
    }

    /// true for lookups against unknown identifiers
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoanError::LoanNotFound { .. } | LoanError::ReturnEventNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
