//! Composite record identifiers and storage keys
//!
//! A LockID or UnlockID is the pair (staker, validator). Its byte form is
//!
//! ```text
//! len(staker) ‖ staker ‖ len(validator) ‖ validator
//! ```
//!
//! with one-byte lengths. Length prefixing makes the encoding injective and
//! lets both addresses be recovered from the key alone.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AccAddress, MultiStakingError, Result, ValAddress};

/// Store prefix for lock records
pub const LOCK_PREFIX: u8 = 0x11;
/// Store prefix for unlock records
pub const UNLOCK_PREFIX: u8 = 0x12;
/// Store prefix for the validator → allowed denomination registry
pub const VALIDATOR_TOKEN_PREFIX: u8 = 0x21;
/// Store prefix for the denomination → conversion ratio registry
pub const CONVERSION_RATIO_PREFIX: u8 = 0x31;

fn push_length_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    // Address constructors cap the length at 255.
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

fn split_length_prefixed<'a>(bytes: &'a [u8], what: &str) -> Result<(&'a [u8], &'a [u8])> {
    let (&len, rest) = bytes.split_first().ok_or_else(|| MultiStakingError::InvalidKey {
        reason: format!("missing {} length", what),
    })?;
    let len = len as usize;
    if rest.len() < len {
        return Err(MultiStakingError::InvalidKey {
            reason: format!("{} needs {} bytes, {} left", what, len, rest.len()),
        });
    }
    Ok(rest.split_at(len))
}

/// Encode a (staker, validator) pair
pub fn encode_pair(staker: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + staker.len() + validator.len());
    push_length_prefixed(&mut out, staker.as_bytes());
    push_length_prefixed(&mut out, validator.as_bytes());
    out
}

/// Decode a (staker, validator) pair; the input must be consumed exactly
pub fn decode_pair(bytes: &[u8]) -> Result<(AccAddress, ValAddress)> {
    let (staker, rest) = split_length_prefixed(bytes, "staker")?;
    let (validator, rest) = split_length_prefixed(rest, "validator")?;
    if !rest.is_empty() {
        return Err(MultiStakingError::InvalidKey {
            reason: format!("{} trailing bytes", rest.len()),
        });
    }
    Ok((
        AccAddress::from_bytes(staker.to_vec())?,
        ValAddress::from_bytes(validator.to_vec())?,
    ))
}

/// Macro to generate the (staker, validator) identifier types
macro_rules! define_pair_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name {
            pub staker: AccAddress,
            pub validator: ValAddress,
        }

        impl $name {
            pub fn new(staker: AccAddress, validator: ValAddress) -> Self {
                Self { staker, validator }
            }

            pub fn to_bytes(&self) -> Vec<u8> {
                encode_pair(&self.staker, &self.validator)
            }

            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                let (staker, validator) = decode_pair(bytes)?;
                Ok(Self { staker, validator })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.staker, self.validator)
            }
        }
    };
}

define_pair_id!(LockId, "Identifies the lock record of a (staker, validator) pair");
define_pair_id!(UnlockId, "Identifies the unlock queue record of a (staker, validator) pair");

impl From<&LockId> for UnlockId {
    fn from(id: &LockId) -> Self {
        UnlockId::new(id.staker.clone(), id.validator.clone())
    }
}

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + body.len());
    key.push(prefix);
    key.extend_from_slice(body);
    key
}

/// Store key of a lock record
pub fn lock_key(id: &LockId) -> Vec<u8> {
    prefixed(LOCK_PREFIX, &id.to_bytes())
}

/// Store key of an unlock record
pub fn unlock_key(id: &UnlockId) -> Vec<u8> {
    prefixed(UNLOCK_PREFIX, &id.to_bytes())
}

/// Store key of a validator's allowed denomination
pub fn validator_token_key(validator: &ValAddress) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + validator.len());
    push_length_prefixed(&mut body, validator.as_bytes());
    prefixed(VALIDATOR_TOKEN_PREFIX, &body)
}

/// Store key of a denomination's conversion ratio
pub fn conversion_ratio_key(denom: &str) -> Vec<u8> {
    prefixed(CONVERSION_RATIO_PREFIX, denom.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn acc(bytes: &[u8]) -> AccAddress {
        AccAddress::from_bytes(bytes.to_vec()).unwrap()
    }

    fn val(bytes: &[u8]) -> ValAddress {
        ValAddress::from_bytes(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_staker_and_validator_from_lock_id() {
        let lock_id = LockId::new(acc(&[1; 20]), val(&[2; 20]));
        let decoded = LockId::from_bytes(&lock_id.to_bytes()).unwrap();
        assert_eq!(decoded.staker, acc(&[1; 20]));
        assert_eq!(decoded.validator, val(&[2; 20]));
    }

    #[test]
    fn test_distinct_stakers_give_distinct_keys() {
        let validator = val(&[9; 20]);
        let a = LockId::new(acc(&[1; 20]), validator.clone());
        let b = LockId::new(acc(&[2; 20]), validator);
        assert_ne!(a, b);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_boundary_shift_does_not_collide() {
        // Same concatenated bytes, split differently.
        let a = LockId::new(acc(&[1, 2]), val(&[3]));
        let b = LockId::new(acc(&[1]), val(&[2, 3]));
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        assert!(LockId::from_bytes(&[]).is_err());
        assert!(LockId::from_bytes(&[3, 1, 2]).is_err());
        assert!(LockId::from_bytes(&[1, 1]).is_err());
        assert!(LockId::from_bytes(&[1, 1, 1, 2, 0xff]).is_err());
        // Zero-length address
        assert!(LockId::from_bytes(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_store_keys_are_prefixed() {
        let id = LockId::new(acc(&[1; 4]), val(&[2; 4]));
        assert_eq!(lock_key(&id)[0], LOCK_PREFIX);
        assert_eq!(unlock_key(&UnlockId::from(&id))[0], UNLOCK_PREFIX);
        assert_eq!(&lock_key(&id)[1..], id.to_bytes().as_slice());
        assert_eq!(validator_token_key(&val(&[5])), vec![VALIDATOR_TOKEN_PREFIX, 1, 5]);
        assert_eq!(conversion_ratio_key("ario")[0], CONVERSION_RATIO_PREFIX);
    }

    proptest! {
        #[test]
        fn prop_pair_encoding_round_trips(
            staker in proptest::collection::vec(any::<u8>(), 1..=255),
            validator in proptest::collection::vec(any::<u8>(), 1..=255),
        ) {
            let id = UnlockId::new(acc(&staker), val(&validator));
            let decoded = UnlockId::from_bytes(&id.to_bytes()).unwrap();
            prop_assert_eq!(decoded, id);
        }

        #[test]
        fn prop_pair_encoding_is_injective(
            a in (proptest::collection::vec(any::<u8>(), 1..8), proptest::collection::vec(any::<u8>(), 1..8)),
            b in (proptest::collection::vec(any::<u8>(), 1..8), proptest::collection::vec(any::<u8>(), 1..8)),
        ) {
            let id_a = LockId::new(acc(&a.0), val(&a.1));
            let id_b = LockId::new(acc(&b.0), val(&b.1));
            prop_assert_eq!(id_a == id_b, id_a.to_bytes() == id_b.to_bytes());
        }
    }
}
