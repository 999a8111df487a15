//! Funding cell selection and transaction assembly

mod assemble;
mod inventory;

pub use assemble::{assemble, split_change};
pub use inventory::{CellInventory, CellReservations, Selection};

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::chain::{ChainError, ONE_CKB};
use crate::error::ServiceError;

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("insufficient balance: need {need}, available {available}")]
    InsufficientBalance { need: u64, available: u64 },
    #[error("not enough change: need {need} plus floor {floor}, selected {selected}")]
    NotEnoughChange { need: u64, floor: u64, selected: u64 },
    #[error("transaction build failed: {0}")]
    Build(String),
    #[error("cell inventory: {0}")]
    Inventory(#[from] ChainError),
}

impl From<FundingError> for ServiceError {
    fn from(e: FundingError) -> Self {
        match e {
            FundingError::InsufficientBalance { need, available } => ServiceError::App(
                AppError::new(ErrorCode::InsufficientBalance)
                    .with_detail("need_ckb", need / ONE_CKB)
                    .with_detail("available_ckb", available / ONE_CKB),
            ),
            FundingError::NotEnoughChange { .. } => {
                ServiceError::App(AppError::new(ErrorCode::NotEnoughChange))
            }
            FundingError::Build(msg) => {
                tracing::error!(error = %msg, "transaction build failed");
                ServiceError::App(AppError::new(ErrorCode::TxBuildFailed))
            }
            FundingError::Inventory(chain) => chain.into(),
        }
    }
}
