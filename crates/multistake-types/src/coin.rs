//! Coin types
//!
//! Amounts are unsigned integers in the smallest unit of a denomination.
//! `Coins` is a denomination-keyed multiset in which a zero amount and an
//! absent denomination are the same thing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{MultiStakingError, Result};

/// A single amount of one denomination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    /// Create a new coin
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Create a zero coin of the given denomination
    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Checked addition (denominations must match)
    pub fn checked_add(&self, other: &Coin) -> Result<Coin> {
        self.require_same_denom(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MultiStakingError::AmountOverflow)?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    /// Checked subtraction (denominations must match)
    pub fn checked_sub(&self, other: &Coin) -> Result<Coin> {
        self.require_same_denom(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or_else(|| {
            MultiStakingError::InsufficientLocked {
                locked: self.clone(),
                requested: other.clone(),
            }
        })?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    fn require_same_denom(&self, other: &Coin) -> Result<()> {
        if self.denom != other.denom {
            return Err(MultiStakingError::DenomMismatch {
                expected: self.denom.clone(),
                actual: other.denom.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted multiset of coins keyed by denomination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Amount held of a denomination (zero when absent)
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of denominations with a non-zero amount
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add a coin in place
    pub fn add(&mut self, coin: &Coin) -> Result<()> {
        if coin.is_zero() {
            return Ok(());
        }
        let current = self.amount_of(&coin.denom);
        let updated = current
            .checked_add(coin.amount)
            .ok_or(MultiStakingError::AmountOverflow)?;
        self.0.insert(coin.denom.clone(), updated);
        Ok(())
    }

    /// Add every coin of another multiset in place
    pub fn add_all(&mut self, other: &Coins) -> Result<()> {
        for coin in other.iter() {
            self.add(&coin)?;
        }
        Ok(())
    }

    /// Subtract a coin in place; `None` when the amount would go negative
    pub fn checked_sub(&mut self, coin: &Coin) -> Option<()> {
        let current = self.amount_of(&coin.denom);
        let updated = current.checked_sub(coin.amount)?;
        if updated == 0 {
            self.0.remove(&coin.denom);
        } else {
            self.0.insert(coin.denom.clone(), updated);
        }
        Some(())
    }

    /// Iterate coins in denomination order
    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, amount)| Coin::new(denom.clone(), *amount))
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        let mut coins = Coins::new();
        if !coin.is_zero() {
            coins.0.insert(coin.denom, coin.amount);
        }
        coins
    }
}

impl FromIterator<Coin> for Coins {
    /// Collect coins, summing duplicates. Overflowing sums saturate.
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        let mut coins = Coins::new();
        for coin in iter {
            if coin.is_zero() {
                continue;
            }
            let entry = coins.0.entry(coin.denom).or_insert(0);
            *entry = entry.saturating_add(coin.amount);
        }
        coins
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_absent_are_equal() {
        let mut a = Coins::new();
        a.add(&Coin::zero("stake")).unwrap();
        assert_eq!(a, Coins::new());

        let mut b = Coins::from(Coin::new("ario", 5));
        b.checked_sub(&Coin::new("ario", 5)).unwrap();
        assert_eq!(b, Coins::new());
    }

    #[test]
    fn test_add_merges_denoms() {
        let mut coins = Coins::new();
        coins.add(&Coin::new("ario", 10)).unwrap();
        coins.add(&Coin::new("ausdt", 3)).unwrap();
        coins.add(&Coin::new("ario", 5)).unwrap();

        assert_eq!(coins.amount_of("ario"), 15);
        assert_eq!(coins.amount_of("ausdt"), 3);
        assert_eq!(coins.len(), 2);
        assert_eq!(coins.to_string(), "15ario,3ausdt");
    }

    #[test]
    fn test_checked_sub_refuses_negative() {
        let mut coins = Coins::from(Coin::new("ario", 4));
        assert!(coins.checked_sub(&Coin::new("ario", 5)).is_none());
        assert_eq!(coins.amount_of("ario"), 4);
    }

    #[test]
    fn test_coin_arithmetic() {
        let a = Coin::new("ario", 100);
        let b = Coin::new("ario", 40);
        assert_eq!(a.checked_sub(&b).unwrap(), Coin::new("ario", 60));
        assert_eq!(a.checked_add(&b).unwrap(), Coin::new("ario", 140));

        assert!(matches!(
            b.checked_sub(&a),
            Err(MultiStakingError::InsufficientLocked { .. })
        ));
        assert!(matches!(
            a.checked_add(&Coin::new("stake", 1)),
            Err(MultiStakingError::DenomMismatch { .. })
        ));
        assert!(matches!(
            Coin::new("ario", u128::MAX).checked_add(&Coin::new("ario", 1)),
            Err(MultiStakingError::AmountOverflow)
        ));
    }
}
