//! Multistake Types - Canonical domain types for multi-asset staking
//!
//! This crate contains all foundational types for the multi-staking module with
//! zero dependencies on other multistake crates. It defines:
//!
//! - Account and validator addresses, module and intermediary accounts
//! - Coins and denomination-keyed coin multisets
//! - Decimal conversion ratios and round-half-up settlement math
//! - The LockID/UnlockID byte codec used as storage keys
//! - Lock and unlock records
//! - The ledger and staking collaborator traits
//!
//! # Module Invariants
//!
//! 1. Escrow conservation: locked + unlocking coins equal the escrow balance
//! 2. Every locked or unlocking coin carries its validator's allowed denom
//!
//! # Value Flow
//!
//! ```text
//! Lock → Bonded token → Unlock entry (ratio snapshot) → Settlement → Payout
//! ```

pub mod address;
pub mod coin;
pub mod decimal;
pub mod keys;
pub mod records;
pub mod expected;
pub mod error;

pub use address::*;
pub use coin::*;
pub use decimal::*;
pub use keys::*;
pub use records::*;
pub use expected::*;
pub use error::*;

/// Block height as tracked by the host state machine
pub type Height = i64;
