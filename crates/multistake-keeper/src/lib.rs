//! Multistake Keeper - Multi-asset staking escrow and unbonding settlement
//!
//! The keeper owns two ledgers:
//! - the **Lock Ledger**, one escrowed coin per (staker, validator) pair
//! - the **Unlock Queue**, pending withdrawals with a ratio snapshot each
//!
//! and orchestrates three flows against the ledger collaborator:
//!
//! ```text
//! lock_coins ──▶ Lock Ledger ──begin_unlock──▶ Unlock Queue
//!                                                  │
//!                       complete_matured_unlock ◀──┘ (maturity)
//!                        └─ complete_unbonding: burn bonded, burn slashed, pay out
//! ```
//!
//! The Invariant Auditor checks escrow conservation and validator
//! denomination consistency at arbitrary checkpoints.

pub mod config;
pub mod store;
pub mod keeper;
pub mod lock;
pub mod unbonding;
pub mod invariants;

pub use config::KeeperConfig;
pub use invariants::{
    all_invariants, format_invariant, module_account_invariant, register_invariants,
    validator_lock_denom_invariant, BrokenInvariant, InvariantRegistry,
};
pub use keeper::Keeper;
pub use store::KvStore;
