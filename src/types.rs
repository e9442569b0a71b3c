use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a return event
pub type ReturnEventId = Uuid;

/// currency of a loaned or returned value; never converted implicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Brl,
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Brl => write!(f, "BRL"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// which department originated the loan; partitions reporting, not logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginContext {
    Sales,
    TechnicalDepartment,
}

/// loan status, always derived from the event history plus current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// no returns yet, within the overdue threshold
    Loaned,
    /// no returns yet, past the overdue threshold
    Overdue,
    /// partially returned, latest return physically received
    PartialReturnDocumented,
    /// latest return documented but not yet in stock
    AwaitingPhysicalEntry,
    /// balance fully cleared
    Settled,
    /// returned value exceeds the loaned value
    Surplus,
}

impl LoanStatus {
    /// settled or surplus loans have nothing outstanding
    pub fn is_closed(&self) -> bool {
        matches!(self, LoanStatus::Settled | LoanStatus::Surplus)
    }
}

/// client the equipment was lent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    /// legal-entity tax id (CNPJ/CPF)
    pub tax_id: String,
    pub name: String,
}

impl ClientRef {
    pub fn new(tax_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.into(),
            name: name.into(),
        }
    }
}

/// equipment reference code plus free-text description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub reference: String,
    pub description: String,
}

impl ItemRef {
    pub fn new(reference: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            description: description.into(),
        }
    }
}

/// amount and currency pair served to read models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanBalance {
    pub amount: Money,
    pub currency: Currency,
}

impl fmt::Display for LoanBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
