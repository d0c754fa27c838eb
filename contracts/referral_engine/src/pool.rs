use soroban_sdk::{contracttype, log, Env, Symbol};

use crate::commission::credit_account;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::events::{Channel, PoolDistributedEvent};
use crate::guard::{TraversalBudget, WalkKind};
use crate::storage::{Account, DistributionRound, LeaderRank, PoolKind, RoundPhase, Storage};

/// Outcome of one distribution call
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionReport {
    pub pool: PoolKind,
    /// Accounts credited so far in this round
    pub recipients_paid: u32,
    /// Amount paid out to members so far in this round
    pub distributed: i128,
    /// Sent to the admin reserve when the round completed
    pub residual_to_reserve: i128,
    /// False when the scan budget ran out; call again to resume
    pub complete: bool,
}

pub fn interval_for(config: &EngineConfig, kind: PoolKind) -> u32 {
    match kind {
        PoolKind::Leadership => config.leadership_interval,
        PoolKind::Community => config.community_interval,
        PoolKind::Club => config.club_interval,
    }
}

fn is_active(config: &EngineConfig, account: &Account, step: u32) -> bool {
    step.saturating_sub(account.last_active_step) <= config.activity_window
}

/// Cohort and weight of an account in a pool, or None if ineligible
///
/// - Community: uncapped, active; weight = team size + 1
/// - Leadership: cohort 0 for ShiningStar, cohort 1 for SilverStar; weight 1
/// - Club: opted in, tier high enough, uncapped, active; weight 1
pub fn eligibility(
    config: &EngineConfig,
    kind: PoolKind,
    account: &Account,
    step: u32,
) -> Option<(u32, i128)> {
    match kind {
        PoolKind::Community => {
            if account.is_capped || !is_active(config, account, step) {
                return None;
            }
            Some((0, account.team_size as i128 + 1))
        }
        PoolKind::Leadership => {
            match config.rank_for(account.direct_referrals, account.team_size) {
                LeaderRank::ShiningStar => Some((0, 1)),
                LeaderRank::SilverStar => Some((1, 1)),
                LeaderRank::Unranked => None,
            }
        }
        PoolKind::Club => {
            if !account.club_member
                || account.package_tier < config.club_min_tier
                || account.is_capped
                || !is_active(config, account, step)
            {
                return None;
            }
            Some((0, 1))
        }
    }
}

/// Open a new round, moving the whole pool balance into it
///
/// # Errors
/// - `DistributionTooEarly`: interval since the last distribution not elapsed
fn start_round(env: &Env, kind: PoolKind, step: u32) -> Result<DistributionRound, Error> {
    let mut pool = Storage::get_pool(env, kind)?;

    if step.saturating_sub(pool.last_distributed_step) < pool.interval_steps {
        return Err(Error::DistributionTooEarly);
    }

    let amount = pool.balance;
    pool.balance = 0;
    pool.last_distributed_step = step;
    Storage::set_pool(env, &pool);

    // Leadership splits 50/50 between the two leader cohorts
    let (primary_amount, secondary_amount) = match kind {
        PoolKind::Leadership => {
            let half = amount / 2;
            (half, amount - half)
        }
        _ => (amount, 0),
    };

    Ok(DistributionRound {
        kind,
        amount,
        primary_amount,
        secondary_amount,
        primary_weight: 0,
        secondary_weight: 0,
        primary_paid: 0,
        secondary_paid: 0,
        member_count: Storage::member_count(env),
        cursor: 0,
        phase: RoundPhase::Tally,
        recipients: 0,
        credited: 0,
        recycled: 0,
    })
}

/// Pay one eligible member its share of the round. Returns true if credited.
///
/// Cap overflow from leadership and club rounds goes to the community pool.
/// Community rounds keep their overflow, so it reaches the reserve with the
/// residual and the pool itself ends the round empty.
fn pay_member(
    env: &Env,
    round: &mut DistributionRound,
    account: &mut Account,
    cohort: u32,
    weight: i128,
) -> Result<bool, Error> {
    let (cohort_amount, cohort_weight, cohort_paid) = if cohort == 0 {
        (round.primary_amount, round.primary_weight, round.primary_paid)
    } else {
        (round.secondary_amount, round.secondary_weight, round.secondary_paid)
    };

    if cohort_weight == 0 {
        return Ok(false);
    }

    // Weights may have grown since the tally; never pay past the cohort amount
    let share = cohort_amount
        .checked_mul(weight)
        .and_then(|v| v.checked_div(cohort_weight))
        .ok_or(Error::InvalidAmount)?
        .min(cohort_amount - cohort_paid);

    if share <= 0 {
        return Ok(false);
    }

    if cohort == 0 {
        round.primary_paid += share;
    } else {
        round.secondary_paid += share;
    }

    let overflow = credit_account(env, account, share, Channel::Pool);
    Storage::set_account(env, account);
    round.credited += share - overflow;

    if round.kind != PoolKind::Community {
        Storage::add_to_pool(env, PoolKind::Community, overflow)?;
        round.recycled += overflow;
    }

    Ok(share > overflow)
}

/// Run (or resume) a distribution round for a pool.
///
/// A round makes two passes over the member index: a tally of eligible
/// weight per cohort, then a payout proportional to weight. At most
/// `max_pool_scan` members are visited per call; an unfinished round is
/// saved and the next call picks it up without re-checking the interval.
/// When the round completes, whatever was not credited (division dust,
/// empty cohorts, no eligible members, community cap overflow) goes to the
/// admin reserve.
///
/// # Errors
/// - `DistributionTooEarly`: no round in progress and interval not elapsed
pub fn distribute(
    env: &Env,
    config: &EngineConfig,
    kind: PoolKind,
) -> Result<DistributionReport, Error> {
    let step = env.ledger().sequence();
    let mut round = match Storage::get_round(env, kind) {
        Some(round) => round,
        None => start_round(env, kind, step)?,
    };

    let mut budget = TraversalBudget::new(WalkKind::PoolScan, config.max_pool_scan);
    let mut finished = false;

    loop {
        if round.cursor >= round.member_count {
            match round.phase {
                RoundPhase::Tally => {
                    if round.primary_weight == 0 && round.secondary_weight == 0 {
                        finished = true;
                        break;
                    }
                    round.phase = RoundPhase::Payout;
                    round.cursor = 0;
                    continue;
                }
                RoundPhase::Payout => {
                    finished = true;
                    break;
                }
            }
        }

        if !budget.step() {
            break;
        }

        let id = round.cursor;
        round.cursor += 1;

        let Some(member) = Storage::member_at(env, id) else {
            continue;
        };
        let Some(mut account) = Storage::get_account(env, &member) else {
            continue;
        };
        let Some((cohort, weight)) = eligibility(config, kind, &account, step) else {
            continue;
        };

        match round.phase {
            RoundPhase::Tally => {
                if cohort == 0 {
                    round.primary_weight += weight;
                } else {
                    round.secondary_weight += weight;
                }
            }
            RoundPhase::Payout => {
                if pay_member(env, &mut round, &mut account, cohort, weight)? {
                    round.recipients += 1;
                }
            }
        }
    }

    let distributed = round.credited;

    if !finished {
        Storage::set_round(env, &round);
        budget.report(env);
        log!(env, "pool round paused", kind as u32, round.cursor, round.member_count);

        return Ok(DistributionReport {
            pool: kind,
            recipients_paid: round.recipients,
            distributed,
            residual_to_reserve: 0,
            complete: false,
        });
    }

    let residual = round.amount - round.credited - round.recycled;
    Storage::add_reserve(env, residual)?;
    Storage::remove_round(env, kind);

    env.events().publish(
        (Symbol::new(env, "pool_distributed"), kind),
        PoolDistributedEvent {
            pool: kind,
            amount: round.amount,
            recipients_paid: round.recipients,
            residual_to_reserve: residual,
        },
    );

    Ok(DistributionReport {
        pool: kind,
        recipients_paid: round.recipients,
        distributed,
        residual_to_reserve: residual,
        complete: true,
    })
}
