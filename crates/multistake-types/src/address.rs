//! Address types for the multi-staking module
//!
//! Addresses are opaque byte strings. Account and validator addresses are
//! distinct wrapper types so a staker can never be passed where a validator
//! is expected.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{MultiStakingError, Result};

/// Longest address that still fits a one-byte length prefix
pub const MAX_ADDR_LEN: usize = 255;

/// Length of a derived module account address
pub const MODULE_ADDR_LEN: usize = 20;

/// Prefix that turns a staker address into its intermediary account
pub const INTERMEDIARY_PREFIX: &[u8] = b"ms/";

/// Macro to generate address types with common implementations
macro_rules! define_address_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Create from raw bytes, validating the length
            pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
                let bytes = bytes.into();
                if bytes.is_empty() || bytes.len() > MAX_ADDR_LEN {
                    return Err(MultiStakingError::InvalidAddress {
                        reason: format!(
                            "{} length {} outside 1..={}",
                            stringify!($name),
                            bytes.len(),
                            MAX_ADDR_LEN
                        ),
                    });
                }
                Ok(Self(bytes))
            }

            /// Parse from a prefixed hex string
            pub fn parse(s: &str) -> Result<Self> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| MultiStakingError::InvalidAddress {
                    reason: e.to_string(),
                })?;
                Self::from_bytes(bytes)
            }

            /// Get the raw bytes
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Number of bytes in the address
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Addresses are never empty once constructed
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, hex::encode(&self.0))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

define_address_type!(
    AccAddress,
    "acc",
    "Address of an account (staker, module or intermediary).\n\n\
     Account bytes are not reserved: an address beginning with `ms/` is read \
     as the intermediary account of the staker named by the remaining bytes. \
     Hosts must not hand out plain accounts with that prefix."
);
define_address_type!(ValAddress, "val", "Operator address of a validator");

/// Derive the account address owned by a module.
///
/// The address is the first 20 bytes of `sha256(name)`, so the same module
/// name always maps to the same escrow account.
pub fn module_address(name: &str) -> AccAddress {
    let digest = Sha256::digest(name.as_bytes());
    AccAddress(digest[..MODULE_ADDR_LEN].to_vec())
}

/// Account that holds a staker's bonded tokens while they are delegated.
pub fn intermediary_account(staker: &AccAddress) -> Result<AccAddress> {
    let mut bytes = Vec::with_capacity(INTERMEDIARY_PREFIX.len() + staker.len());
    bytes.extend_from_slice(INTERMEDIARY_PREFIX);
    bytes.extend_from_slice(staker.as_bytes());
    AccAddress::from_bytes(bytes)
}

/// Recover the staker that owns an intermediary account.
///
/// The `ms/` prefix is the only marker, so any account starting with it maps
/// back to a staker; see [`AccAddress`].
pub fn staker_account(intermediary: &AccAddress) -> Result<AccAddress> {
    let rest = intermediary
        .as_bytes()
        .strip_prefix(INTERMEDIARY_PREFIX)
        .ok_or_else(|| MultiStakingError::InvalidAddress {
            reason: format!("{} is not an intermediary account", intermediary),
        })?;
    AccAddress::from_bytes(rest.to_vec())
}
