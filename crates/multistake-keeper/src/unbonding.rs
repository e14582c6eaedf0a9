//! Unbonding-completion settlement
//!
//! When the staking collaborator releases a matured unbonding, the bonded
//! tokens are retired and the owed locked-denomination amount is paid to the
//! staker, net of any slashing that happened while the stake was bonded.

use tracing::{info, warn};

use multistake_types::{
    bonded_to_locked, staker_account, AccAddress, BankKeeper, Coin, Coins, Height,
    LedgerCheckpoint, MultiStakingError, Result, StakingKeeper, UnlockId, ValAddress,
};

use crate::Keeper;

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Send `coins` from `account` to the module and burn them there.
    pub fn burn_token(&mut self, account: &AccAddress, coins: &Coins) -> Result<()> {
        let module = self.config.module_name.clone();
        self.bank
            .send_coins_from_account_to_module(account, &module, coins)?;
        self.bank.burn_coins(&module, coins)?;
        Ok(())
    }

    /// Settle the unlock entry created at `height` for the staker owning
    /// `intermediary` and return the payout.
    ///
    /// `balance` is the bonded amount the staking collaborator actually
    /// released. The entry is not removed here; the caller consumes it once
    /// the whole transaction succeeds. Ledger errors abort the call and must
    /// be rolled back by the enclosing transaction.
    pub fn complete_unbonding(
        &mut self,
        intermediary: &AccAddress,
        validator: &ValAddress,
        height: Height,
        balance: u128,
    ) -> Result<Coins> {
        let staker = staker_account(intermediary)?;
        let unlock_id = UnlockId::new(staker.clone(), validator.clone());
        let entry = self.get_unlock_entry_at_height(&unlock_id, height)?;

        let unlock_denom = self.require_validator_allowed_token(validator)?;
        let unlock_amount = bonded_to_locked(balance, entry.conversion_ratio)?;

        if unlock_amount > entry.balance {
            return Err(MultiStakingError::AmountExceedsLocked {
                unlock_amount,
                locked_amount: entry.balance,
            });
        }

        let bonded = Coin::new(self.staking.bond_denom(), balance);
        self.burn_token(intermediary, &Coins::from(bonded))?;

        let payout = if entry.balance > unlock_amount {
            let slashed = Coin::new(unlock_denom.clone(), entry.balance - unlock_amount);
            warn!(
                "Unlock {} at height {} was slashed: owed {}, released {}, burning {}",
                unlock_id, height, entry.balance, unlock_amount, slashed
            );
            self.burn_token(intermediary, &Coins::from(slashed))?;
            Coin::new(unlock_denom, unlock_amount)
        } else {
            Coin::new(unlock_denom, entry.balance)
        };

        let payout = Coins::from(payout);
        self.bank.send_coins(intermediary, &staker, &payout)?;

        info!(
            "Completed unbonding of {} on {} at height {}: paid {}",
            staker, validator, height, payout
        );
        Ok(payout)
    }

    /// Host-side completion of a matured unlock, as one transaction:
    /// release the escrowed coin to the intermediary account, settle, and
    /// consume the entry. On any error nothing changes and the entry stays
    /// pending.
    pub fn complete_matured_unlock(
        &mut self,
        intermediary: &AccAddress,
        validator: &ValAddress,
        height: Height,
        balance: u128,
    ) -> Result<Coins>
    where
        B: LedgerCheckpoint,
    {
        self.execute_atomic(|k| {
            let staker = staker_account(intermediary)?;
            let unlock_id = UnlockId::new(staker, validator.clone());
            let entry = k.get_unlock_entry_at_height(&unlock_id, height)?;

            let module = k.config.module_name.clone();
            k.bank.send_coins_from_module_to_account(
                &module,
                intermediary,
                &Coins::from(entry.unlocking_coin),
            )?;

            let payout = k.complete_unbonding(intermediary, validator, height, balance)?;
            k.remove_unlock_entry(&unlock_id, height)?;
            Ok(payout)
        })
    }
}
