use std::fmt;

use crate::entities::payment::PaymentStatus;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTransition {
    Verify,
    Reject,
}

impl PaymentTransition {
    pub fn target(&self) -> PaymentStatus {
        match self {
            PaymentTransition::Verify => PaymentStatus::Completed,
            PaymentTransition::Reject => PaymentStatus::Failed,
        }
    }

    /// Both transitions leave `Pending` and nothing else.
    pub fn apply(&self, current: PaymentStatus) -> AppResult<PaymentStatus> {
        if current == PaymentStatus::Pending {
            Ok(self.target())
        } else {
            Err(AppError::InvalidTransition(format!(
                "Cannot {} payment with status {} (requires Pending)",
                self, current
            )))
        }
    }
}

impl fmt::Display for PaymentTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentTransition::Verify => f.write_str("verify"),
            PaymentTransition::Reject => f.write_str("reject"),
        }
    }
}
