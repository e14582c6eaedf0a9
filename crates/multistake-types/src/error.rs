//! Error types for the multi-staking module
//!
//! Every failure aborts the current call and is surfaced to the caller with
//! the keys and amounts needed to diagnose it. Nothing is recovered locally.

use thiserror::Error;

use crate::Coin;

/// Result type for multi-staking operations
pub type Result<T> = std::result::Result<T, MultiStakingError>;

/// Failures reported by the ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Account cannot cover a debit
    #[error("Insufficient funds in {address}: requested {requested}, available {available}")]
    InsufficientFunds {
        address: String,
        requested: Coin,
        available: Coin,
    },

    /// Module account lacks the permission for an operation
    #[error("Module {module} does not have {permission} permission")]
    MissingPermission { module: String, permission: String },

    /// Module account was never registered with the ledger
    #[error("Module account {module} does not exist")]
    UnknownModule { module: String },

    /// Balance or supply overflow
    #[error("Ledger overflow for denom {denom}")]
    Overflow { denom: String },

    /// Burn larger than the recorded supply
    #[error("Supply underflow for denom {denom}: burning {requested}, supply {supply}")]
    SupplyUnderflow {
        denom: String,
        requested: u128,
        supply: u128,
    },
}

/// Multi-staking error types
#[derive(Debug, Clone, Error)]
pub enum MultiStakingError {
    // ========================================================================
    // Not Found
    // ========================================================================

    /// No lock record for the pair
    #[error("Lock {lock_id} not found")]
    LockNotFound { lock_id: String },

    /// No unlock record for the pair
    #[error("Unlock {unlock_id} not found")]
    UnlockNotFound { unlock_id: String },

    /// No unlock entry at the requested height
    #[error("Unlock entry not found for {unlock_id} at height {height}")]
    UnlockEntryNotFound { unlock_id: String, height: i64 },

    /// Validator has no allowed denomination registered
    #[error("Validator {validator} has no allowed token")]
    ValidatorTokenNotSet { validator: String },

    /// Denomination has no conversion ratio registered
    #[error("No conversion ratio set for denom {denom}")]
    ConversionRatioNotSet { denom: String },

    // ========================================================================
    // Settlement Errors
    // ========================================================================

    /// Settlement amount above the recorded owed balance
    #[error("Unlock amount {unlock_amount} greater than lock amount {locked_amount}")]
    AmountExceedsLocked {
        unlock_amount: u128,
        locked_amount: u128,
    },

    /// Ledger collaborator failure, propagated unchanged
    #[error("Ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    // ========================================================================
    // Lock / Unlock Errors
    // ========================================================================

    /// Coin denomination does not match the expected one
    #[error("Denom mismatch: expected {expected}, got {actual}")]
    DenomMismatch { expected: String, actual: String },

    /// Unlock request larger than the locked coin
    #[error("Insufficient locked amount: locked {locked}, requested {requested}")]
    InsufficientLocked { locked: Coin, requested: Coin },

    /// Entry already present at the height with a different ratio
    #[error("Unlock entry for {unlock_id} at height {height} has a different conversion ratio")]
    UnlockEntryConflict { unlock_id: String, height: i64 },

    /// Conversion ratio must be strictly positive
    #[error("Invalid conversion ratio {ratio}")]
    InvalidConversionRatio { ratio: String },

    // ========================================================================
    // Encoding Errors
    // ========================================================================

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("Invalid store key: {reason}")]
    InvalidKey { reason: String },

    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl MultiStakingError {
    /// True for the "requested thing does not exist" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::LockNotFound { .. }
                | Self::UnlockNotFound { .. }
                | Self::UnlockEntryNotFound { .. }
                | Self::ValidatorTokenNotSet { .. }
                | Self::ConversionRatioNotSet { .. }
        )
    }
}

impl From<serde_json::Error> for MultiStakingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
