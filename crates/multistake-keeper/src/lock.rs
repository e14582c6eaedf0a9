//! Lock and unlock-request flows
//!
//! Locking escrows a coin and mints bonded tokens into the staker's
//! intermediary account. Requesting an unlock moves value out of the lock
//! into a new unlock entry carrying the current conversion ratio. Neither
//! flow changes what the escrow account holds relative to the ledgers, so
//! escrow conservation holds after each call.

use tracing::info;

use multistake_types::{
    bonded_to_locked, intermediary_account, locked_to_bonded, AccAddress, BankKeeper, Coin, Coins,
    Height, LedgerCheckpoint, LockId, MultiStakingError, MultiStakingLock, MultiStakingUnlock,
    Result, StakingKeeper, UnlockEntry, UnlockId, ValAddress,
};

use crate::Keeper;

impl<B: BankKeeper + LedgerCheckpoint, S: StakingKeeper> Keeper<B, S> {
    /// Escrow `coin` against `validator` and return the bonded coin minted
    /// into the staker's intermediary account.
    pub fn lock_coins(&mut self, staker: &AccAddress, validator: &ValAddress, coin: &Coin) -> Result<Coin> {
        let allowed = self.require_validator_allowed_token(validator)?;
        if coin.denom != allowed {
            return Err(MultiStakingError::DenomMismatch {
                expected: allowed,
                actual: coin.denom.clone(),
            });
        }
        let bond_denom = self.staking.bond_denom();
        if coin.is_zero() {
            return Ok(Coin::zero(bond_denom));
        }

        let ratio = self.conversion_ratio(&coin.denom)?;
        let bonded = Coin::new(bond_denom, locked_to_bonded(coin.amount, ratio)?);
        let intermediary = intermediary_account(staker)?;

        let lock_id = LockId::new(staker.clone(), validator.clone());
        let mut lock = self
            .get_multi_staking_lock(&lock_id)?
            .unwrap_or_else(|| MultiStakingLock::new(lock_id, Coin::zero(allowed)));
        lock.add_coin(coin)?;

        self.execute_atomic(|k| {
            let module = k.config.module_name.clone();
            k.bank
                .send_coins_from_account_to_module(staker, &module, &Coins::from(coin.clone()))?;
            let minted = Coins::from(bonded.clone());
            k.bank.mint_coins(&module, &minted)?;
            k.bank.send_coins_from_module_to_account(&module, &intermediary, &minted)?;
            k.set_multi_staking_lock(&lock)
        })?;

        info!("Locked {} from {} on {}, minted {}", coin, staker, validator, bonded);
        Ok(bonded)
    }

    /// Move up to `coin` out of the lock into an unlock entry at `height`.
    ///
    /// Only the part of `coin` backed by whole bonded units leaves the lock:
    /// the entry owes `round_half_up(bonded × ratio)` and any remainder stays
    /// locked. Returns the bonded amount the staking collaborator must
    /// undelegate. A second request at the same height merges into the
    /// existing entry.
    pub fn begin_unlock(
        &mut self,
        staker: &AccAddress,
        validator: &ValAddress,
        coin: &Coin,
        height: Height,
    ) -> Result<Coin> {
        let lock_id = LockId::new(staker.clone(), validator.clone());
        let mut lock = self
            .get_multi_staking_lock(&lock_id)?
            .ok_or_else(|| MultiStakingError::LockNotFound {
                lock_id: lock_id.to_string(),
            })?;
        lock.locked_coin.checked_sub(coin)?;

        let ratio = self.conversion_ratio(&coin.denom)?;
        let bond_amount = locked_to_bonded(coin.amount, ratio)?;
        let bonded = Coin::new(self.staking.bond_denom(), bond_amount);
        let coin = Coin::new(coin.denom.clone(), bonded_to_locked(bond_amount, ratio)?);
        if coin.is_zero() {
            return Ok(bonded);
        }
        lock.remove_coin(&coin)?;

        let unlock_id = UnlockId::from(&lock_id);
        let mut unlock = self
            .get_multi_staking_unlock(&unlock_id)?
            .unwrap_or_else(|| MultiStakingUnlock::new(unlock_id.clone()));

        match unlock.entry_at_height_mut(height) {
            Some(existing) => {
                if existing.conversion_ratio != ratio {
                    return Err(MultiStakingError::UnlockEntryConflict {
                        unlock_id: unlock_id.to_string(),
                        height,
                    });
                }
                existing.balance = existing
                    .balance
                    .checked_add(coin.amount)
                    .ok_or(MultiStakingError::AmountOverflow)?;
                existing.unlocking_coin = existing.unlocking_coin.checked_add(&coin)?;
            }
            None => unlock.push_entry(UnlockEntry {
                creation_height: height,
                balance: coin.amount,
                conversion_ratio: ratio,
                unlocking_coin: coin.clone(),
            }),
        }

        self.execute_atomic(|k| {
            k.set_multi_staking_lock(&lock)?;
            k.set_multi_staking_unlock(&unlock)
        })?;

        info!(
            "Unlock of {} requested by {} on {} at height {}, undelegating {}",
            coin, staker, validator, height, bonded
        );
        Ok(bonded)
    }
}
