//! Multistake demo - deterministic block-by-block walkthrough
//!
//! Every three blocks the stakers lock coins, request unlocks, and then have
//! the matured unlocks settled with an optional slash applied by the
//! simulated staking collaborator. Invariants run on the configured period.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p multistake-demo -- --blocks 12 --slash-percent 25
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use multistake_bank::{Bank, Permission};
use multistake_keeper::{register_invariants, InvariantRegistry, Keeper, KeeperConfig};
use multistake_types::{
    intermediary_account, AccAddress, BankKeeper, Coin, Coins, Height, LockId, StaticStakingKeeper,
    ValAddress,
};

type DemoKeeper = Keeper<Bank, StaticStakingKeeper>;

const BOND_DENOM: &str = "stake";

/// Multistake demo - lock, unlock and settle across simulated blocks
#[derive(Parser)]
#[command(name = "multistake-demo")]
#[command(author = "Multistake Contributors")]
#[command(version)]
#[command(about = "Drive the multistake keeper through lock, unlock and settlement", long_about = None)]
struct Args {
    /// Number of blocks to simulate
    #[arg(long, default_value_t = 9)]
    blocks: i64,

    /// Percentage of each released unbonding lost to slashing
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    slash_percent: u8,

    /// Funds given to each staker per denomination
    #[arg(long, default_value_t = 10_000)]
    seed_amount: u128,
}

/// An unlock waiting for the staking collaborator to release it
struct PendingUnlock {
    staker: AccAddress,
    validator: ValAddress,
    height: Height,
    bonded: u128,
}

struct Validator {
    address: ValAddress,
    denom: &'static str,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = KeeperConfig::from_env();
    info!(
        "Starting multistake demo: module={} blocks={} slash={}% invariant period={}",
        config.module_name, args.blocks, args.slash_percent, config.invariant_check_period
    );

    let validators = vec![
        Validator {
            address: ValAddress::from_bytes(vec![0x20; 20])?,
            denom: "ario",
        },
        Validator {
            address: ValAddress::from_bytes(vec![0x21; 32])?,
            denom: "ausdt",
        },
    ];
    let stakers = (0..3u8)
        .map(|i| AccAddress::from_bytes(vec![0x10 + i; 20]))
        .collect::<Result<Vec<_>, _>>()?;

    let mut keeper = setup(&config, &args, &stakers, &validators)?;
    let mut registry = InvariantRegistry::new();
    register_invariants(&mut registry, &config.module_name);

    let mut pending: Vec<PendingUnlock> = Vec::new();

    for height in 1..=args.blocks {
        match height % 3 {
            1 => lock_phase(&mut keeper, &args, &stakers, &validators)?,
            2 => unlock_phase(&mut keeper, &stakers, &validators, height, &mut pending)?,
            _ => settle_phase(&mut keeper, args.slash_percent, &mut pending)?,
        }

        if config.invariants_due(height) {
            let broken = registry.assert_all(&keeper);
            if !broken.is_empty() {
                for b in &broken {
                    warn!("{}", b.message);
                }
                bail!("{} invariant(s) broken at height {}", broken.len(), height);
            }
            info!("Height {}: all {} invariants hold", height, registry.routes().len());
        }
    }

    report(&keeper, &stakers, &validators);
    Ok(())
}

fn setup(
    config: &KeeperConfig,
    args: &Args,
    stakers: &[AccAddress],
    validators: &[Validator],
) -> anyhow::Result<DemoKeeper> {
    let mut bank = Bank::new();
    bank.register_module(&config.module_name, &[Permission::Minter, Permission::Burner]);
    for staker in stakers {
        let funds: Coins = validators
            .iter()
            .map(|v| Coin::new(v.denom, args.seed_amount))
            .collect();
        bank.fund_account(staker, &funds)?;
    }

    let mut keeper = Keeper::new(config.clone(), bank, StaticStakingKeeper::new(BOND_DENOM));
    keeper.set_conversion_ratio("ario", dec!(1))?;
    keeper.set_conversion_ratio("ausdt", dec!(0.5))?;
    for v in validators {
        keeper.set_validator_allowed_token(&v.address, v.denom)?;
    }
    Ok(keeper)
}

fn lock_phase(
    keeper: &mut DemoKeeper,
    args: &Args,
    stakers: &[AccAddress],
    validators: &[Validator],
) -> anyhow::Result<()> {
    for (i, staker) in stakers.iter().enumerate() {
        let v = &validators[i % validators.len()];
        let amount = args.seed_amount / 10 * (i as u128 + 1);
        keeper
            .lock_coins(staker, &v.address, &Coin::new(v.denom, amount))
            .with_context(|| format!("locking {}{} for {}", amount, v.denom, staker))?;
    }
    Ok(())
}

fn unlock_phase(
    keeper: &mut DemoKeeper,
    stakers: &[AccAddress],
    validators: &[Validator],
    height: Height,
    pending: &mut Vec<PendingUnlock>,
) -> anyhow::Result<()> {
    for (i, staker) in stakers.iter().enumerate() {
        let v = &validators[i % validators.len()];
        let lock_id = LockId::new(staker.clone(), v.address.clone());
        let locked = match keeper.get_multi_staking_lock(&lock_id)? {
            Some(lock) => lock.locked_coin,
            None => continue,
        };
        let half = Coin::new(locked.denom, locked.amount / 2);
        if half.is_zero() {
            continue;
        }
        let bonded = keeper.begin_unlock(staker, &v.address, &half, height)?;
        pending.push(PendingUnlock {
            staker: staker.clone(),
            validator: v.address.clone(),
            height,
            bonded: bonded.amount,
        });
    }
    Ok(())
}

fn settle_phase(
    keeper: &mut DemoKeeper,
    slash_percent: u8,
    pending: &mut Vec<PendingUnlock>,
) -> anyhow::Result<()> {
    for unlock in pending.drain(..) {
        let released = unlock.bonded * (100 - slash_percent as u128) / 100;
        let intermediary = intermediary_account(&unlock.staker)?;
        let payout = keeper
            .complete_matured_unlock(&intermediary, &unlock.validator, unlock.height, released)
            .with_context(|| {
                format!("settling unlock of {} on {}", unlock.staker, unlock.validator)
            })?;
        info!(
            "Released {}{} for {}, paid {}",
            released, BOND_DENOM, unlock.staker, payout
        );
    }
    Ok(())
}

fn report(keeper: &DemoKeeper, stakers: &[AccAddress], validators: &[Validator]) {
    let bank = keeper.bank();
    info!("Escrow {} holds {}", keeper.escrow_address(), bank.get_all_balances(keeper.escrow_address()));
    for staker in stakers {
        info!("Staker {} holds {}", staker, bank.get_all_balances(staker));
    }
    for v in validators {
        info!("Supply of {}: {}", v.denom, bank.total_supply(v.denom));
    }
    info!("Ledger recorded {} entries", bank.entry_count());
}
