//! The multi-staking keeper: state access for the Lock Ledger, the Unlock
//! Queue and the per-validator and per-denomination registries.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use multistake_types::{
    conversion_ratio_key, lock_key, module_address, unlock_key, validate_ratio,
    validator_token_key, AccAddress, BankKeeper, ConversionRatio, Height, LedgerCheckpoint, LockId,
    MultiStakingError, MultiStakingLock, MultiStakingUnlock, Result, StakingKeeper,
    UnlockEntry, UnlockId, ValAddress, LOCK_PREFIX, UNLOCK_PREFIX,
};

use crate::{KeeperConfig, KvStore};

/// Module keeper holding its store and the collaborator capabilities
///
/// Built once and passed by reference; there is no ambient state.
#[derive(Debug, Clone)]
pub struct Keeper<B, S> {
    pub(crate) config: KeeperConfig,
    pub(crate) store: KvStore,
    pub(crate) bank: B,
    pub(crate) staking: S,
    escrow: AccAddress,
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Create a keeper over an empty store
    pub fn new(config: KeeperConfig, bank: B, staking: S) -> Self {
        let escrow = module_address(&config.module_name);
        Self {
            config,
            store: KvStore::new(),
            bank,
            staking,
            escrow,
        }
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn module_name(&self) -> &str {
        &self.config.module_name
    }

    /// Account holding every escrowed coin
    pub fn escrow_address(&self) -> &AccAddress {
        &self.escrow
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn staking(&self) -> &S {
        &self.staking
    }

    /// Run `f` as one transaction: on error, store and bank are restored
    /// to their state before the call.
    pub fn execute_atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T>
    where
        B: LedgerCheckpoint,
    {
        let store = self.store.clone();
        let checkpoint = self.bank.checkpoint();
        let result = f(self);
        if let Err(ref e) = result {
            warn!("Transaction rolled back: {}", e);
            self.store = store;
            self.bank.revert(checkpoint);
        }
        result
    }

    // ========================================================================
    // Encoding helpers
    // ========================================================================

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.store.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key, bytes);
        Ok(())
    }

    // ========================================================================
    // Validator Denomination Registry
    // ========================================================================

    pub fn set_validator_allowed_token(&mut self, validator: &ValAddress, denom: &str) -> Result<()> {
        self.write(validator_token_key(validator), &denom.to_string())
    }

    /// Denomination a validator accepts, if one is registered
    pub fn get_validator_allowed_token(&self, validator: &ValAddress) -> Result<Option<String>> {
        self.read(&validator_token_key(validator))
    }

    pub(crate) fn require_validator_allowed_token(&self, validator: &ValAddress) -> Result<String> {
        self.get_validator_allowed_token(validator)?
            .ok_or_else(|| MultiStakingError::ValidatorTokenNotSet {
                validator: validator.to_string(),
            })
    }

    // ========================================================================
    // Conversion ratios
    // ========================================================================

    pub fn set_conversion_ratio(&mut self, denom: &str, ratio: ConversionRatio) -> Result<()> {
        validate_ratio(ratio)?;
        self.write(conversion_ratio_key(denom), &ratio)
    }

    /// Current locked-units-per-bonded-unit ratio of a denomination
    pub fn conversion_ratio(&self, denom: &str) -> Result<ConversionRatio> {
        self.read(&conversion_ratio_key(denom))?
            .ok_or_else(|| MultiStakingError::ConversionRatioNotSet {
                denom: denom.to_string(),
            })
    }

    // ========================================================================
    // Lock Ledger
    // ========================================================================

    pub fn get_multi_staking_lock(&self, lock_id: &LockId) -> Result<Option<MultiStakingLock>> {
        self.read(&lock_key(lock_id))
    }

    /// Store a lock; a lock with nothing escrowed is deleted instead
    pub fn set_multi_staking_lock(&mut self, lock: &MultiStakingLock) -> Result<()> {
        if lock.is_empty() {
            self.remove_multi_staking_lock(&lock.lock_id);
            return Ok(());
        }
        self.write(lock_key(&lock.lock_id), lock)
    }

    pub fn remove_multi_staking_lock(&mut self, lock_id: &LockId) -> bool {
        self.store.delete(&lock_key(lock_id))
    }

    /// Every lock record, lazily, in key order
    pub fn multi_staking_locks(&self) -> impl Iterator<Item = Result<MultiStakingLock>> + '_ {
        self.store
            .prefix_iter(&[LOCK_PREFIX])
            .map(|(_, value)| {
                serde_json::from_slice::<MultiStakingLock>(value).map_err(MultiStakingError::from)
            })
    }

    /// Visit lock records until `visit` returns true
    pub fn multi_staking_lock_iterator(
        &self,
        mut visit: impl FnMut(MultiStakingLock) -> bool,
    ) -> Result<()> {
        for lock in self.multi_staking_locks() {
            if visit(lock?) {
                break;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Unlock Queue
    // ========================================================================

    pub fn get_multi_staking_unlock(&self, unlock_id: &UnlockId) -> Result<Option<MultiStakingUnlock>> {
        self.read(&unlock_key(unlock_id))
    }

    /// Look up an unlock record by its encoded (staker, validator) key
    pub fn get_multi_staking_unlock_by_bytes(&self, id_bytes: &[u8]) -> Result<Option<MultiStakingUnlock>> {
        let unlock_id = UnlockId::from_bytes(id_bytes)?;
        self.get_multi_staking_unlock(&unlock_id)
    }

    /// Store an unlock record; a record without entries is pruned
    pub fn set_multi_staking_unlock(&mut self, unlock: &MultiStakingUnlock) -> Result<()> {
        if unlock.is_empty() {
            self.store.delete(&unlock_key(&unlock.unlock_id));
            return Ok(());
        }
        self.write(unlock_key(&unlock.unlock_id), unlock)
    }

    pub fn get_unlock_entry_at_height(&self, unlock_id: &UnlockId, height: Height) -> Result<UnlockEntry> {
        self.get_multi_staking_unlock(unlock_id)?
            .and_then(|unlock| unlock.entry_at_height(height).cloned())
            .ok_or_else(|| MultiStakingError::UnlockEntryNotFound {
                unlock_id: unlock_id.to_string(),
                height,
            })
    }

    /// Delete one entry, pruning the record when it becomes empty
    pub fn remove_unlock_entry(&mut self, unlock_id: &UnlockId, height: Height) -> Result<UnlockEntry> {
        let mut unlock = self
            .get_multi_staking_unlock(unlock_id)?
            .ok_or_else(|| MultiStakingError::UnlockNotFound {
                unlock_id: unlock_id.to_string(),
            })?;
        let entry = unlock
            .remove_entry(height)
            .ok_or_else(|| MultiStakingError::UnlockEntryNotFound {
                unlock_id: unlock_id.to_string(),
                height,
            })?;
        self.set_multi_staking_unlock(&unlock)?;
        Ok(entry)
    }

    /// Every unlock record, lazily, in key order
    pub fn multi_staking_unlocks(&self) -> impl Iterator<Item = Result<MultiStakingUnlock>> + '_ {
        self.store
            .prefix_iter(&[UNLOCK_PREFIX])
            .map(|(_, value)| {
                serde_json::from_slice::<MultiStakingUnlock>(value).map_err(MultiStakingError::from)
            })
    }

    /// Visit unlock records until `visit` returns true
    pub fn multi_staking_unlock_iterator(
        &self,
        mut visit: impl FnMut(MultiStakingUnlock) -> bool,
    ) -> Result<()> {
        for unlock in self.multi_staking_unlocks() {
            if visit(unlock?) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multistake_bank::{Bank, Permission};
    use multistake_types::{Coin, Coins, StaticStakingKeeper};
    use rust_decimal_macros::dec;

    type TestKeeper = Keeper<Bank, StaticStakingKeeper>;

    fn keeper() -> TestKeeper {
        Keeper::new(KeeperConfig::default(), Bank::new(), StaticStakingKeeper::new("stake"))
    }

    fn acc(b: u8) -> AccAddress {
        AccAddress::from_bytes(vec![b; 20]).unwrap()
    }

    fn val(b: u8) -> ValAddress {
        ValAddress::from_bytes(vec![b; 20]).unwrap()
    }

    fn entry(height: Height, amount: u128) -> UnlockEntry {
        UnlockEntry {
            creation_height: height,
            balance: amount,
            conversion_ratio: dec!(1),
            unlocking_coin: Coin::new("ario", amount),
        }
    }

    #[test]
    fn test_lock_round_trip_and_zero_deletes() {
        let mut k = keeper();
        let id = LockId::new(acc(1), val(2));
        assert!(k.get_multi_staking_lock(&id).unwrap().is_none());

        let lock = MultiStakingLock::new(id.clone(), Coin::new("ario", 10));
        k.set_multi_staking_lock(&lock).unwrap();
        assert_eq!(k.get_multi_staking_lock(&id).unwrap(), Some(lock));

        k.set_multi_staking_lock(&MultiStakingLock::new(id.clone(), Coin::zero("ario")))
            .unwrap();
        assert!(k.get_multi_staking_lock(&id).unwrap().is_none());
    }

    #[test]
    fn test_lock_iteration_visits_each_once_and_stops_early() {
        let mut k = keeper();
        for b in 1..=3 {
            k.set_multi_staking_lock(&MultiStakingLock::new(
                LockId::new(acc(b), val(9)),
                Coin::new("ario", b as u128),
            ))
            .unwrap();
        }
        // Unlock records live under another prefix and must not leak in
        let mut unlock = MultiStakingUnlock::new(UnlockId::new(acc(1), val(9)));
        unlock.push_entry(entry(1, 1));
        k.set_multi_staking_unlock(&unlock).unwrap();

        let total: u128 = k
            .multi_staking_locks()
            .map(|l| l.unwrap().locked_coin.amount)
            .sum();
        assert_eq!(total, 6);

        let mut visited = 0;
        k.multi_staking_lock_iterator(|_| {
            visited += 1;
            visited == 2
        })
        .unwrap();
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_unlock_entry_lookup_and_removal() {
        let mut k = keeper();
        let id = UnlockId::new(acc(1), val(2));
        let mut unlock = MultiStakingUnlock::new(id.clone());
        unlock.push_entry(entry(10, 5));
        unlock.push_entry(entry(20, 7));
        k.set_multi_staking_unlock(&unlock).unwrap();

        assert_eq!(k.get_unlock_entry_at_height(&id, 20).unwrap().balance, 7);
        assert!(matches!(
            k.get_unlock_entry_at_height(&id, 15),
            Err(MultiStakingError::UnlockEntryNotFound { .. })
        ));

        let by_bytes = k.get_multi_staking_unlock_by_bytes(&id.to_bytes()).unwrap();
        assert_eq!(by_bytes.unwrap().entries.len(), 2);

        k.remove_unlock_entry(&id, 10).unwrap();
        k.remove_unlock_entry(&id, 20).unwrap();
        assert!(k.get_multi_staking_unlock(&id).unwrap().is_none());
        assert!(matches!(
            k.remove_unlock_entry(&id, 20),
            Err(MultiStakingError::UnlockNotFound { .. })
        ));
    }

    #[test]
    fn test_registries() {
        let mut k = keeper();
        assert!(k.get_validator_allowed_token(&val(1)).unwrap().is_none());
        k.set_validator_allowed_token(&val(1), "ario").unwrap();
        assert_eq!(k.get_validator_allowed_token(&val(1)).unwrap().as_deref(), Some("ario"));

        assert!(matches!(
            k.conversion_ratio("ario"),
            Err(MultiStakingError::ConversionRatioNotSet { .. })
        ));
        k.set_conversion_ratio("ario", dec!(1.5)).unwrap();
        assert_eq!(k.conversion_ratio("ario").unwrap(), dec!(1.5));
        assert!(k.set_conversion_ratio("ario", dec!(0)).is_err());
    }

    #[test]
    fn test_execute_atomic_rolls_back_store() {
        let mut k = keeper();
        let id = LockId::new(acc(1), val(2));
        let result: Result<()> = k.execute_atomic(|k| {
            k.set_multi_staking_lock(&MultiStakingLock::new(id.clone(), Coin::new("ario", 1)))?;
            Err(MultiStakingError::AmountOverflow)
        });
        assert!(result.is_err());
        assert!(k.get_multi_staking_lock(&id).unwrap().is_none());
    }

    #[test]
    fn test_execute_atomic_rolls_back_bank_journal() {
        let mut bank = Bank::new();
        bank.register_module("multistaking", &[Permission::Minter]);
        let mut k = Keeper::new(KeeperConfig::default(), bank, StaticStakingKeeper::new("stake"));

        k.execute_atomic(|k| {
            k.bank.mint_coins("multistaking", &Coins::from(Coin::new("stake", 5)))?;
            Ok(())
        })
        .unwrap();
        let entries = k.bank().entry_count();

        let result: Result<()> = k.execute_atomic(|k| {
            k.bank.mint_coins("multistaking", &Coins::from(Coin::new("stake", 9)))?;
            Err(MultiStakingError::AmountOverflow)
        });
        assert!(result.is_err());
        assert_eq!(k.bank().entry_count(), entries);
        assert_eq!(k.bank().total_supply("stake"), 5);
    }
}
