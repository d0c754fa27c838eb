use soroban_sdk::{log, Address, Env, Symbol};

use crate::catalog::{apply_bps, credit};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::events::{CappedEvent, Channel, CommissionEvent};
use crate::guard::{TraversalBudget, WalkKind};
use crate::matrix::sponsor_chain;
use crate::storage::{Account, PackageDefinition, PoolKind, Storage};

/// Where one package amount ended up
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Split {
    pub admin_fee: i128,
    /// Credited to sponsor balances after cap clamping
    pub credited: i128,
    pub leadership_pool: i128,
    pub club_pool: i128,
    /// Community share plus every unallocated or clamped remainder
    pub community_pool: i128,
}

/// Credit an already-loaded account and publish the commission.
///
/// Returns the overflow the earnings cap refused. The caller saves the
/// account.
pub fn credit_account(env: &Env, account: &mut Account, amount: i128, channel: Channel) -> i128 {
    let was_capped = account.is_capped;
    let credited = credit(account, amount);
    let overflow = amount - credited;

    env.events().publish(
        (Symbol::new(env, "commission"), account.participant.clone()),
        CommissionEvent {
            recipient: account.participant.clone(),
            channel,
            credited,
            overflow,
        },
    );

    if !was_capped && account.is_capped {
        env.events().publish(
            (Symbol::new(env, "capped"), account.participant.clone()),
            CappedEvent {
                participant: account.participant.clone(),
                earnings_cap: account.earnings_cap,
            },
        );
    }

    overflow
}

/// Load, credit and save a recipient. Returns the clamped overflow.
fn pay(env: &Env, recipient: &Address, amount: i128, channel: Channel) -> i128 {
    if amount <= 0 {
        return 0;
    }

    let Some(mut account) = Storage::get_account(env, recipient) else {
        return amount;
    };
    let overflow = credit_account(env, &mut account, amount, channel);
    Storage::set_account(env, &account);
    overflow
}

/// Distribute a registration or upgrade amount across every channel.
///
/// Order of shares:
/// 1. admin fee → admin fee accumulator
/// 2. direct bonus → immediate sponsor
/// 3. level bonus → sponsors above the immediate sponsor, one rate per level
/// 4. upline bonus → the same chain, split equally among those found
/// 5. leadership, club and community pool contributions
///
/// Missing sponsors, missing levels, division dust and cap overflow all go
/// to the community pool, so the parts of the split always sum to `amount`.
pub fn distribute(
    env: &Env,
    config: &EngineConfig,
    package: &PackageDefinition,
    sponsor: Option<Address>,
    amount: i128,
) -> Result<Split, Error> {
    let mut split = Split::default();
    let mut to_community: i128 = 0;

    split.admin_fee = apply_bps(amount, package.admin_fee_bps).ok_or(Error::InvalidAmount)?;
    Storage::add_admin_fees(env, split.admin_fee)?;

    // Direct bonus
    let direct = apply_bps(amount, package.direct_bonus_bps).ok_or(Error::InvalidAmount)?;
    let mut chain_start = None;
    match sponsor.as_ref().and_then(|id| Storage::get_account(env, id)) {
        Some(mut sponsor_account) => {
            let overflow = credit_account(env, &mut sponsor_account, direct, Channel::Direct);
            Storage::set_account(env, &sponsor_account);
            split.credited += direct - overflow;
            to_community += overflow;
            chain_start = sponsor_account.sponsor;
        }
        None => to_community += direct,
    }

    // One walk serves both the level and upline channels
    let levels = package.level_bonus_bps.len();
    let depth = levels.max(config.upline_depth);
    let mut budget = TraversalBudget::new(WalkKind::SponsorChain, config.max_traversal_steps);
    let chain = sponsor_chain(env, chain_start, depth, &mut budget);
    budget.report(env);

    // Level bonus
    let mut level_total: i128 = 0;
    for (index, rate) in package.level_bonus_bps.iter().enumerate() {
        let share = apply_bps(amount, rate).ok_or(Error::InvalidAmount)?;
        level_total += share;

        match chain.get(index as u32) {
            Some(recipient) => {
                let overflow = pay(env, &recipient, share, Channel::Level);
                split.credited += share - overflow;
                to_community += overflow;
            }
            None => to_community += share,
        }
    }

    // Upline bonus
    let upline_total = apply_bps(amount, package.upline_bonus_bps).ok_or(Error::InvalidAmount)?;
    let uplines = chain.len().min(config.upline_depth);
    if uplines == 0 {
        to_community += upline_total;
    } else {
        let each = upline_total / uplines as i128;
        for index in 0..uplines {
            if let Some(recipient) = chain.get(index) {
                let overflow = pay(env, &recipient, each, Channel::Upline);
                split.credited += each - overflow;
                to_community += overflow;
            }
        }
        to_community += upline_total - each * uplines as i128;
    }

    // Pools; the community share absorbs rounding dust
    split.leadership_pool =
        apply_bps(amount, package.leadership_pool_bps).ok_or(Error::InvalidAmount)?;
    split.club_pool = apply_bps(amount, package.club_pool_bps).ok_or(Error::InvalidAmount)?;
    let community_share = amount
        - split.admin_fee
        - direct
        - level_total
        - upline_total
        - split.leadership_pool
        - split.club_pool;
    split.community_pool = community_share + to_community;

    Storage::add_to_pool(env, PoolKind::Leadership, split.leadership_pool)?;
    Storage::add_to_pool(env, PoolKind::Club, split.club_pool)?;
    Storage::add_to_pool(env, PoolKind::Community, split.community_pool)?;

    log!(
        env,
        "commission split",
        amount,
        split.credited,
        split.community_pool
    );

    Ok(split)
}
