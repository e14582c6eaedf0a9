//! Invariant Auditor
//!
//! Read-only consistency checks run by the host between transactions. Each
//! check returns a diagnostic message and whether the invariant is broken.
//!
//! - `module-accounts`: locked plus unlocking coins equal the escrow balance
//! - `validator-lock-denom`: every locked and unlocking coin carries its
//!   validator's allowed denomination

use std::fmt::Write as _;

use tracing::warn;

use multistake_types::{BankKeeper, Coins, StakingKeeper, ValAddress};

use crate::Keeper;

pub const MODULE_ACCOUNTS_ROUTE: &str = "module-accounts";
pub const VALIDATOR_LOCK_DENOM_ROUTE: &str = "validator-lock-denom";

/// A registered invariant check
pub type Invariant<K> = Box<dyn Fn(&K) -> (String, bool)>;

/// Format an invariant message the way the host expects it
pub fn format_invariant(module: &str, name: &str, msg: &str) -> String {
    format!("{}: {} invariant\n{}\n", module, name, msg)
}

/// A route whose check reported broken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenInvariant {
    pub module: String,
    pub route: String,
    pub message: String,
}

struct InvariantRoute<K> {
    module: String,
    route: String,
    check: Invariant<K>,
}

/// Named invariant routes, checked together
pub struct InvariantRegistry<K> {
    routes: Vec<InvariantRoute<K>>,
}

impl<K> InvariantRegistry<K> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn register_route(&mut self, module: &str, route: &str, check: Invariant<K>) {
        self.routes.push(InvariantRoute {
            module: module.to_string(),
            route: route.to_string(),
            check,
        });
    }

    /// Registered `module/route` names
    pub fn routes(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{}/{}", r.module, r.route))
            .collect()
    }

    /// Run every route and return the broken ones
    pub fn assert_all(&self, target: &K) -> Vec<BrokenInvariant> {
        let mut broken = Vec::new();
        for route in &self.routes {
            let (message, is_broken) = (route.check)(target);
            if is_broken {
                warn!("Invariant {}/{} broken: {}", route.module, route.route, message);
                broken.push(BrokenInvariant {
                    module: route.module.clone(),
                    route: route.route.clone(),
                    message,
                });
            }
        }
        broken
    }
}

impl<K> Default for InvariantRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the module's invariants under its module name
pub fn register_invariants<B, S>(registry: &mut InvariantRegistry<Keeper<B, S>>, module: &str)
where
    B: BankKeeper + 'static,
    S: StakingKeeper + 'static,
{
    registry.register_route(module, MODULE_ACCOUNTS_ROUTE, Box::new(module_account_invariant::<B, S>));
    registry.register_route(
        module,
        VALIDATOR_LOCK_DENOM_ROUTE,
        Box::new(validator_lock_denom_invariant::<B, S>),
    );
}

/// Run both invariants; broken if either is
pub fn all_invariants<B: BankKeeper, S: StakingKeeper>(k: &Keeper<B, S>) -> (String, bool) {
    let (msg, broken) = module_account_invariant(k);
    if broken {
        return (msg, broken);
    }
    validator_lock_denom_invariant(k)
}

/// Escrow conservation: locked + unlocking coins == escrow balance
pub fn module_account_invariant<B: BankKeeper, S: StakingKeeper>(k: &Keeper<B, S>) -> (String, bool) {
    let module = k.module_name();
    let mut total = Coins::new();

    for lock in k.multi_staking_locks() {
        let added = lock.and_then(|lock| total.add(&lock.locked_coin));
        if let Err(e) = added {
            let msg = format!("\tfailed to total lock coins: {}\n", e);
            return (format_invariant(module, "ModuleAccountInvariants", &msg), true);
        }
    }

    for unlock in k.multi_staking_unlocks() {
        let added = unlock.and_then(|unlock| {
            unlock
                .entries
                .iter()
                .try_for_each(|entry| total.add(&entry.unlocking_coin))
        });
        if let Err(e) = added {
            let msg = format!("\tfailed to total unlocking coins: {}\n", e);
            return (format_invariant(module, "ModuleAccountInvariants", &msg), true);
        }
    }

    let escrow_balances = k.bank().get_all_balances(k.escrow_address());
    let broken = escrow_balances != total;

    (
        format_invariant(
            module,
            "ModuleAccountInvariants",
            &format!(
                "\tescrow coins balances: {}\n\ttotal lock coin amount: {}\n",
                escrow_balances, total
            ),
        ),
        broken,
    )
}

fn allowed_denom<B: BankKeeper, S: StakingKeeper>(k: &Keeper<B, S>, validator: &ValAddress) -> String {
    match k.get_validator_allowed_token(validator) {
        Ok(Some(denom)) => denom,
        Ok(None) => "<unset>".to_string(),
        Err(e) => format!("<unreadable: {}>", e),
    }
}

/// Every lock and unlock entry carries its validator's allowed denomination.
/// Reports every violating record, not just the first.
pub fn validator_lock_denom_invariant<B: BankKeeper, S: StakingKeeper>(
    k: &Keeper<B, S>,
) -> (String, bool) {
    let mut msg = String::new();
    let mut broken = false;

    for lock in k.multi_staking_locks() {
        let lock = match lock {
            Ok(lock) => lock,
            Err(e) => {
                broken = true;
                let _ = writeln!(msg, "unreadable lock record: {}", e);
                continue;
            }
        };
        let expected = allowed_denom(k, &lock.lock_id.validator);
        if expected != lock.locked_coin.denom {
            broken = true;
            let _ = write!(
                msg,
                "validator lock denom invariants:\n\t lock denom: {}\n\tvalidator allow denom: {}\n\t validator address {} staker address {}\n",
                lock.locked_coin.denom, expected, lock.lock_id.validator, lock.lock_id.staker
            );
        }
    }

    for unlock in k.multi_staking_unlocks() {
        let unlock = match unlock {
            Ok(unlock) => unlock,
            Err(e) => {
                broken = true;
                let _ = writeln!(msg, "unreadable unlock record: {}", e);
                continue;
            }
        };
        let expected = allowed_denom(k, &unlock.unlock_id.validator);
        for entry in &unlock.entries {
            if entry.unlocking_coin.denom != expected {
                broken = true;
                let _ = write!(
                    msg,
                    "validator unlock denom invariants:\n\t unlock denom: {}\n\tvalidator allow denom: {}\n\t entry height {}\n\t validator address {} staker address {}\n",
                    entry.unlocking_coin.denom,
                    expected,
                    entry.creation_height,
                    unlock.unlock_id.validator,
                    unlock.unlock_id.staker
                );
            }
        }
    }

    (
        format_invariant(
            k.module_name(),
            "validator lock denom",
            &format!("found invalid validator lock denom\n{}", msg),
        ),
        broken,
    )
}
