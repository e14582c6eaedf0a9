//! Multistake Bank - In-memory fungible ledger
//!
//! The bank is:
//! - Multi-denomination (every account holds a `Coins` multiset)
//! - Account-keyed by `AccAddress`
//! - Module-aware (named module accounts with mint/burn permissions)
//! - Journaled (every credit and debit is appended to an immutable log)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Total supply changes only through mint and burn
//! 3. A multi-coin movement applies fully or not at all

use std::collections::HashMap;

use multistake_types::{
    module_address, AccAddress, BankKeeper, Coin, Coins, LedgerCheckpoint, LedgerError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capability granted to a module account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Minter,
    Burner,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Minter => write!(f, "minter"),
            Permission::Burner => write!(f, "burner"),
        }
    }
}

/// A named account controlled by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccount {
    pub name: String,
    pub address: AccAddress,
    pub permissions: Vec<Permission>,
}

impl ModuleAccount {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Type of ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// Reason for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// Supply created by a module
    Mint { module: String },
    /// Supply destroyed by a module
    Burn { module: String },
    /// Movement between two accounts
    Transfer { counterparty: AccAddress },
    /// Genesis or test funding
    Fund,
}

/// A single ledger entry (one side of a movement)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub account: AccAddress,
    pub coin: Coin,
    pub entry_type: EntryType,
    pub balance_after: u128,
    pub reason: EntryReason,
}

/// Account state in the bank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balances: Coins,
    pub entry_count: u64,
}

/// Balances and supply at a point in time, plus the journal length
#[derive(Debug, Clone)]
pub struct BankCheckpoint {
    accounts: HashMap<AccAddress, AccountState>,
    supply: Coins,
    entry_len: usize,
}

/// The in-memory bank
#[derive(Debug, Clone, Default)]
pub struct Bank {
    accounts: HashMap<AccAddress, AccountState>,
    modules: HashMap<String, ModuleAccount>,
    supply: Coins,
    entries: Vec<LedgerEntry>,
}

impl Bank {
    /// Create an empty bank with no module accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module account and return its address
    pub fn register_module(&mut self, name: &str, permissions: &[Permission]) -> AccAddress {
        let address = module_address(name);
        self.modules.insert(
            name.to_string(),
            ModuleAccount {
                name: name.to_string(),
                address: address.clone(),
                permissions: permissions.to_vec(),
            },
        );
        address
    }

    pub fn module_account(&self, name: &str) -> Option<&ModuleAccount> {
        self.modules.get(name)
    }

    /// Create coins directly in an account (genesis allocation)
    pub fn fund_account(&mut self, address: &AccAddress, coins: &Coins) -> Result<(), LedgerError> {
        let mut supply = self.supply.clone();
        for coin in coins.iter() {
            supply.add(&coin).map_err(|_| LedgerError::Overflow {
                denom: coin.denom.clone(),
            })?;
        }
        self.credit_all(address, coins, EntryReason::Fund)?;
        self.supply = supply;
        Ok(())
    }

    /// Total amount in existence of a denomination
    pub fn total_supply(&self, denom: &str) -> u128 {
        self.supply.amount_of(denom)
    }

    /// Get account state
    pub fn account_state(&self, address: &AccAddress) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    /// Get all entries for an account
    pub fn account_entries(&self, address: &AccAddress) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| &e.account == address)
            .cloned()
            .collect()
    }

    /// Get the total number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get recent entries (newest first)
    pub fn recent_entries(&self, limit: usize) -> Vec<LedgerEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    fn module_with(&self, name: &str, permission: Option<Permission>) -> Result<&ModuleAccount, LedgerError> {
        let module = self
            .modules
            .get(name)
            .ok_or_else(|| LedgerError::UnknownModule {
                module: name.to_string(),
            })?;
        if let Some(permission) = permission {
            if !module.has_permission(permission) {
                return Err(LedgerError::MissingPermission {
                    module: name.to_string(),
                    permission: permission.to_string(),
                });
            }
        }
        Ok(module)
    }

    fn record(&mut self, address: &AccAddress, coin: Coin, entry_type: EntryType, balance_after: u128, reason: EntryReason) {
        let sequence = self.entries.len() as u64;
        self.entries.push(LedgerEntry {
            sequence,
            account: address.clone(),
            coin,
            entry_type,
            balance_after,
            reason,
        });
    }

    /// Debit every coin or none of them
    fn debit_all(&mut self, address: &AccAddress, coins: &Coins, reason: EntryReason) -> Result<(), LedgerError> {
        let current = self
            .accounts
            .get(address)
            .map(|a| a.balances.clone())
            .unwrap_or_default();

        let mut updated = current.clone();
        for coin in coins.iter() {
            if updated.checked_sub(&coin).is_none() {
                return Err(LedgerError::InsufficientFunds {
                    address: address.to_string(),
                    available: Coin::new(coin.denom.clone(), current.amount_of(&coin.denom)),
                    requested: coin,
                });
            }
        }

        let state = self.accounts.entry(address.clone()).or_default();
        state.balances = updated.clone();
        state.entry_count += coins.len() as u64;
        for coin in coins.iter() {
            let after = updated.amount_of(&coin.denom);
            self.record(address, coin, EntryType::Debit, after, reason.clone());
        }
        Ok(())
    }

    /// Credit every coin or none of them
    fn credit_all(&mut self, address: &AccAddress, coins: &Coins, reason: EntryReason) -> Result<(), LedgerError> {
        let mut updated = self
            .accounts
            .get(address)
            .map(|a| a.balances.clone())
            .unwrap_or_default();
        for coin in coins.iter() {
            updated.add(&coin).map_err(|_| LedgerError::Overflow {
                denom: coin.denom.clone(),
            })?;
        }

        let state = self.accounts.entry(address.clone()).or_default();
        state.balances = updated.clone();
        state.entry_count += coins.len() as u64;
        for coin in coins.iter() {
            let after = updated.amount_of(&coin.denom);
            self.record(address, coin, EntryType::Credit, after, reason.clone());
        }
        Ok(())
    }

    /// Execute a transfer between two accounts
    ///
    /// This is atomic: both debit and credit happen together or neither does.
    fn transfer(&mut self, from: &AccAddress, to: &AccAddress, coins: &Coins) -> Result<(), LedgerError> {
        let checkpoint = self.checkpoint();
        self.debit_all(
            from,
            coins,
            EntryReason::Transfer {
                counterparty: to.clone(),
            },
        )?;
        if let Err(e) = self.credit_all(
            to,
            coins,
            EntryReason::Transfer {
                counterparty: from.clone(),
            },
        ) {
            self.revert(checkpoint);
            return Err(e);
        }
        debug!("Transferred {} from {} to {}", coins, from, to);
        Ok(())
    }
}

impl BankKeeper for Bank {
    fn send_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        module: &str,
        coins: &Coins,
    ) -> Result<(), LedgerError> {
        let to = self.module_with(module, None)?.address.clone();
        self.transfer(from, &to, coins)
    }

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &AccAddress,
        coins: &Coins,
    ) -> Result<(), LedgerError> {
        let from = self.module_with(module, None)?.address.clone();
        self.transfer(&from, to, coins)
    }

    fn send_coins(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        coins: &Coins,
    ) -> Result<(), LedgerError> {
        self.transfer(from, to, coins)
    }

    fn mint_coins(&mut self, module: &str, coins: &Coins) -> Result<(), LedgerError> {
        let address = self.module_with(module, Some(Permission::Minter))?.address.clone();
        let mut supply = self.supply.clone();
        for coin in coins.iter() {
            supply.add(&coin).map_err(|_| LedgerError::Overflow {
                denom: coin.denom.clone(),
            })?;
        }
        self.credit_all(
            &address,
            coins,
            EntryReason::Mint {
                module: module.to_string(),
            },
        )?;
        self.supply = supply;
        debug!("Module {} minted {}", module, coins);
        Ok(())
    }

    fn burn_coins(&mut self, module: &str, coins: &Coins) -> Result<(), LedgerError> {
        let address = self.module_with(module, Some(Permission::Burner))?.address.clone();
        let mut supply = self.supply.clone();
        for coin in coins.iter() {
            if supply.checked_sub(&coin).is_none() {
                return Err(LedgerError::SupplyUnderflow {
                    supply: self.supply.amount_of(&coin.denom),
                    requested: coin.amount,
                    denom: coin.denom,
                });
            }
        }
        self.debit_all(
            &address,
            coins,
            EntryReason::Burn {
                module: module.to_string(),
            },
        )?;
        self.supply = supply;
        debug!("Module {} burned {}", module, coins);
        Ok(())
    }

    fn get_all_balances(&self, address: &AccAddress) -> Coins {
        self.accounts
            .get(address)
            .map(|a| a.balances.clone())
            .unwrap_or_default()
    }
}

impl LedgerCheckpoint for Bank {
    type Checkpoint = BankCheckpoint;

    fn checkpoint(&self) -> BankCheckpoint {
        BankCheckpoint {
            accounts: self.accounts.clone(),
            supply: self.supply.clone(),
            entry_len: self.entries.len(),
        }
    }

    fn revert(&mut self, checkpoint: BankCheckpoint) {
        self.accounts = checkpoint.accounts;
        self.supply = checkpoint.supply;
        self.entries.truncate(checkpoint.entry_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> AccAddress {
        AccAddress::from_bytes(vec![b; 20]).unwrap()
    }

    fn coins(denom: &str, amount: u128) -> Coins {
        Coins::from(Coin::new(denom, amount))
    }

    #[test]
    fn test_fund_and_balance() {
        let mut bank = Bank::new();
        let account = addr(1);

        assert!(bank.get_all_balances(&account).is_empty());

        bank.fund_account(&account, &coins("ario", 1000)).unwrap();
        assert_eq!(bank.get_balance(&account, "ario"), Coin::new("ario", 1000));
        assert_eq!(bank.total_supply("ario"), 1000);
    }

    #[test]
    fn test_no_negative_balance() {
        let mut bank = Bank::new();
        let from = addr(1);
        bank.fund_account(&from, &coins("ario", 100)).unwrap();

        let result = bank.send_coins(&from, &addr(2), &coins("ario", 200));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(bank.get_balance(&from, "ario").amount, 100);
        assert!(bank.get_all_balances(&addr(2)).is_empty());
    }

    #[test]
    fn test_multi_coin_transfer_is_all_or_nothing() {
        let mut bank = Bank::new();
        let from = addr(1);
        bank.fund_account(&from, &coins("ario", 100)).unwrap();

        let mut both = coins("ario", 50);
        both.add(&Coin::new("ausdt", 1)).unwrap();
        assert!(bank.send_coins(&from, &addr(2), &both).is_err());
        assert_eq!(bank.get_balance(&from, "ario").amount, 100);
    }

    #[test]
    fn test_transfer() {
        let mut bank = Bank::new();
        let from = addr(1);
        let to = addr(2);
        bank.fund_account(&from, &coins("ario", 1000)).unwrap();

        bank.send_coins(&from, &to, &coins("ario", 400)).unwrap();

        assert_eq!(bank.get_balance(&from, "ario").amount, 600);
        assert_eq!(bank.get_balance(&to, "ario").amount, 400);
        assert_eq!(bank.total_supply("ario"), 1000);
    }

    #[test]
    fn test_module_mint_and_burn() {
        let mut bank = Bank::new();
        let module = bank.register_module("multistaking", &[Permission::Minter, Permission::Burner]);

        bank.mint_coins("multistaking", &coins("stake", 500)).unwrap();
        assert_eq!(bank.get_balance(&module, "stake").amount, 500);
        assert_eq!(bank.total_supply("stake"), 500);

        bank.burn_coins("multistaking", &coins("stake", 200)).unwrap();
        assert_eq!(bank.get_balance(&module, "stake").amount, 300);
        assert_eq!(bank.total_supply("stake"), 300);
    }

    #[test]
    fn test_module_permissions() {
        let mut bank = Bank::new();
        bank.register_module("escrow", &[]);

        assert!(matches!(
            bank.mint_coins("escrow", &coins("stake", 1)),
            Err(LedgerError::MissingPermission { .. })
        ));
        assert!(matches!(
            bank.burn_coins("escrow", &coins("stake", 1)),
            Err(LedgerError::MissingPermission { .. })
        ));
        assert!(matches!(
            bank.burn_coins("missing", &coins("stake", 1)),
            Err(LedgerError::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_burn_beyond_supply_is_rejected() {
        let mut bank = Bank::new();
        let module = bank.register_module("multistaking", &[Permission::Burner]);
        bank.fund_account(&module, &coins("ario", 50)).unwrap();
        // Balance without backing supply
        bank.supply = Coins::from(Coin::new("ario", 10));

        let result = bank.burn_coins("multistaking", &coins("ario", 30));
        assert_eq!(
            result,
            Err(LedgerError::SupplyUnderflow {
                denom: "ario".to_string(),
                requested: 30,
                supply: 10,
            })
        );
        assert_eq!(bank.get_balance(&module, "ario").amount, 50);
        assert_eq!(bank.total_supply("ario"), 10);
    }

    #[test]
    fn test_revert_restores_balances_supply_and_journal() {
        let mut bank = Bank::new();
        bank.register_module("multistaking", &[Permission::Minter]);
        bank.fund_account(&addr(1), &coins("ario", 100)).unwrap();
        let checkpoint = bank.checkpoint();

        bank.mint_coins("multistaking", &coins("stake", 7)).unwrap();
        bank.send_coins(&addr(1), &addr(2), &coins("ario", 40)).unwrap();
        assert_eq!(bank.entry_count(), 4);

        bank.revert(checkpoint);
        assert_eq!(bank.entry_count(), 1);
        assert_eq!(bank.total_supply("stake"), 0);
        assert_eq!(bank.get_balance(&addr(1), "ario").amount, 100);
        assert!(bank.get_all_balances(&addr(2)).is_empty());
    }

    #[test]
    fn test_entry_tracking() {
        let mut bank = Bank::new();
        let module = bank.register_module("multistaking", &[Permission::Burner]);
        let staker = addr(3);
        bank.fund_account(&staker, &coins("ario", 100)).unwrap();

        bank.send_coins_from_account_to_module(&staker, "multistaking", &coins("ario", 30))
            .unwrap();
        bank.burn_coins("multistaking", &coins("ario", 30)).unwrap();

        let entries = bank.account_entries(&module);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, EntryType::Credit);
        assert_eq!(
            entries[1].reason,
            EntryReason::Burn {
                module: "multistaking".to_string()
            }
        );
        assert_eq!(bank.entry_count(), 4);
        assert_eq!(bank.recent_entries(1)[0].balance_after, 0);
    }
}
