//! Lock and unlock records
//!
//! A `MultiStakingLock` is the escrowed coin of one (staker, validator) pair.
//! A `MultiStakingUnlock` is the ordered list of pending withdrawals of that
//! pair, each with the conversion ratio snapshotted when it was requested.

use serde::{Deserialize, Serialize};

use crate::{Coin, ConversionRatio, Height, LockId, Result, UnlockId};

/// Escrowed coin for a (staker, validator) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiStakingLock {
    pub lock_id: LockId,
    pub locked_coin: Coin,
}

impl MultiStakingLock {
    pub fn new(lock_id: LockId, locked_coin: Coin) -> Self {
        Self {
            lock_id,
            locked_coin,
        }
    }

    /// Increase the locked amount (denominations must match)
    pub fn add_coin(&mut self, coin: &Coin) -> Result<()> {
        self.locked_coin = self.locked_coin.checked_add(coin)?;
        Ok(())
    }

    /// Decrease the locked amount (denominations must match)
    pub fn remove_coin(&mut self, coin: &Coin) -> Result<()> {
        self.locked_coin = self.locked_coin.checked_sub(coin)?;
        Ok(())
    }

    /// A lock with nothing escrowed is deleted rather than stored
    pub fn is_empty(&self) -> bool {
        self.locked_coin.is_zero()
    }
}

/// A pending withdrawal awaiting settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEntry {
    /// Height at which the unlock was requested; unique per `UnlockId`
    pub creation_height: Height,
    /// Amount owed in the locked denomination absent slashing
    pub balance: u128,
    /// Locked units per bonded unit at request time
    pub conversion_ratio: ConversionRatio,
    /// Locked coin that left the lock for this entry
    pub unlocking_coin: Coin,
}

/// All pending withdrawals for a (staker, validator) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiStakingUnlock {
    pub unlock_id: UnlockId,
    /// Ordered by creation height (insertion order)
    pub entries: Vec<UnlockEntry>,
}

impl MultiStakingUnlock {
    pub fn new(unlock_id: UnlockId) -> Self {
        Self {
            unlock_id,
            entries: Vec::new(),
        }
    }

    pub fn entry_at_height(&self, height: Height) -> Option<&UnlockEntry> {
        self.entries.iter().find(|e| e.creation_height == height)
    }

    pub fn entry_at_height_mut(&mut self, height: Height) -> Option<&mut UnlockEntry> {
        self.entries.iter_mut().find(|e| e.creation_height == height)
    }

    /// Append an entry, keeping entries ordered by height
    pub fn push_entry(&mut self, entry: UnlockEntry) {
        let at = self
            .entries
            .partition_point(|e| e.creation_height <= entry.creation_height);
        self.entries.insert(at, entry);
    }

    /// Remove and return the entry at a height
    pub fn remove_entry(&mut self, height: Height) -> Option<UnlockEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.creation_height == height)?;
        Some(self.entries.remove(index))
    }

    /// An unlock with no entries is logically absent
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
