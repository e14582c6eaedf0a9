//! Collaborator interfaces consumed by the multi-staking keeper
//!
//! The ledger owns token balances and is the source of truth for what the
//! escrow account holds. The staking collaborator only supplies the bond
//! denomination.

use crate::{AccAddress, Coin, Coins, LedgerError};

/// Fungible ledger operations the keeper relies on
pub trait BankKeeper {
    /// Move coins from an account into a module account
    fn send_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        module: &str,
        coins: &Coins,
    ) -> Result<(), LedgerError>;

    /// Move coins from a module account to an account
    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &AccAddress,
        coins: &Coins,
    ) -> Result<(), LedgerError>;

    /// Move coins between two accounts
    fn send_coins(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        coins: &Coins,
    ) -> Result<(), LedgerError>;

    /// Create coins in a module account (requires the minter permission)
    fn mint_coins(&mut self, module: &str, coins: &Coins) -> Result<(), LedgerError>;

    /// Destroy coins held by a module account (requires the burner permission)
    fn burn_coins(&mut self, module: &str, coins: &Coins) -> Result<(), LedgerError>;

    /// Every non-zero balance of an address
    fn get_all_balances(&self, address: &AccAddress) -> Coins;

    /// Balance of one denomination
    fn get_balance(&self, address: &AccAddress, denom: &str) -> Coin {
        Coin::new(denom, self.get_all_balances(address).amount_of(denom))
    }
}

/// Ledger state that can be rolled back to an earlier point
///
/// A checkpoint must be cheaper than cloning the ledger: append-only history
/// is recorded by length and truncated on revert.
pub trait LedgerCheckpoint {
    type Checkpoint;

    /// Capture the current balances and supply
    fn checkpoint(&self) -> Self::Checkpoint;

    /// Restore the state captured by `checkpoint`
    fn revert(&mut self, checkpoint: Self::Checkpoint);
}

/// Read-side view of the single-asset staking state machine
pub trait StakingKeeper {
    /// Denomination of the bonded-representation token
    fn bond_denom(&self) -> String;
}

/// Staking collaborator with a fixed bond denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticStakingKeeper {
    bond_denom: String,
}

impl StaticStakingKeeper {
    pub fn new(bond_denom: impl Into<String>) -> Self {
        Self {
            bond_denom: bond_denom.into(),
        }
    }
}

impl StakingKeeper for StaticStakingKeeper {
    fn bond_denom(&self) -> String {
        self.bond_denom.clone()
    }
}
