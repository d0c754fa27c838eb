use soroban_sdk::{contracttype, log, Env};

use crate::catalog::apply_bps;
use crate::commission::credit_account;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::events::Channel;
use crate::guard::record_withdrawal;
use crate::storage::{Account, PoolKind, Storage};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalReceipt {
    pub requested: i128,
    /// Sent to the participant
    pub paid: i128,
    pub fee: i128,
    /// Routed to the community pool, or credited back when compounding
    pub reinvested: i128,
    pub compounded: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalSplit {
    pub withdrawable: i128,
    pub reinvest: i128,
    pub fee: i128,
    pub paid: i128,
}

/// Split a withdrawal request
///
/// Formula:
/// - withdrawable = requested × withdraw rate
/// - reinvest = requested − withdrawable
/// - fee = withdrawable × fee rate (never charged on the reinvested part)
/// - paid = withdrawable − fee
///
/// Example:
/// - requested: 100, rate: 70%, fee: 5%
/// - withdrawable: 70, reinvest: 30, fee: 3.5, paid: 66.5
pub fn calculate_split(requested: i128, withdraw_bps: u32, fee_bps: u32) -> Option<WithdrawalSplit> {
    let withdrawable = apply_bps(requested, withdraw_bps)?;
    let reinvest = requested.checked_sub(withdrawable)?;
    let fee = apply_bps(withdrawable, fee_bps)?;
    let paid = withdrawable.checked_sub(fee)?;

    Some(WithdrawalSplit {
        withdrawable,
        reinvest,
        fee,
        paid,
    })
}

/// Apply a withdrawal to an account. The caller saves the account and moves
/// `paid` to the participant.
///
/// Split mode debits the balance by the full request, charges the fee to the
/// admin accumulator and sends the reinvested part to the community pool.
///
/// Auto-compound mode charges no fee and moves no funds: the request is
/// credited straight back to the balance along with a bonus. The bonus is an
/// earnings credit, so it is clamped by the cap. It is funded from the
/// community pool first, then the admin reserve, then collected admin fees.
///
/// # Errors
/// - `InvalidAmount`: requested <= 0
/// - `InsufficientBalance`: requested > balance
/// - `CircuitBreakerTripped`: rolling withdrawal volume over threshold
/// - `CompoundBonusUnfunded`: the three funding sources together cannot
///   cover the bonus
pub fn process(
    env: &Env,
    config: &EngineConfig,
    account: &mut Account,
    requested: i128,
    auto_compound: bool,
) -> Result<WithdrawalReceipt, Error> {
    if requested <= 0 {
        return Err(Error::InvalidAmount);
    }

    if requested > account.balance {
        return Err(Error::InsufficientBalance);
    }

    if auto_compound {
        let headroom = (account.earnings_cap - account.total_earned).max(0);
        let bonus = apply_bps(requested, config.compound_bonus_bps)
            .ok_or(Error::InvalidAmount)?
            .min(headroom);

        // Debit and re-credit of the principal cancel out; only the bonus moves
        fund_bonus(env, bonus)?;
        // Bonus is pre-clamped to the headroom, so nothing overflows
        credit_account(env, account, bonus, Channel::Compound);

        return Ok(WithdrawalReceipt {
            requested,
            paid: 0,
            fee: 0,
            reinvested: requested + bonus,
            compounded: true,
        });
    }

    record_withdrawal(env, config, requested)?;

    let rate = config.withdraw_rate_bps(account.direct_referrals);
    let split =
        calculate_split(requested, rate, config.withdraw_fee_bps).ok_or(Error::InvalidAmount)?;

    account.balance -= requested;
    account.total_withdrawn += split.paid;

    Storage::add_admin_fees(env, split.fee)?;
    Storage::add_to_pool(env, PoolKind::Community, split.reinvest)?;

    Ok(WithdrawalReceipt {
        requested,
        paid: split.paid,
        fee: split.fee,
        reinvested: split.reinvest,
        compounded: false,
    })
}

/// Collect `amount` from the community pool, then the reserve, then the
/// admin fees
fn fund_bonus(env: &Env, amount: i128) -> Result<(), Error> {
    if amount <= 0 {
        return Ok(());
    }

    let mut funded = Storage::draw_from_pool(env, PoolKind::Community, amount)?;
    if funded < amount {
        funded += Storage::draw_reserve(env, amount - funded);
    }
    if funded < amount {
        funded += Storage::draw_admin_fees(env, amount - funded);
    }

    if funded < amount {
        log!(env, "compound bonus unfunded", amount, funded);
        return Err(Error::CompoundBonusUnfunded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SCALE;

    #[test]
    fn test_split_without_referrals() {
        let split = calculate_split(100 * SCALE, 7_000, 500).unwrap();

        assert_eq!(split.withdrawable, 70 * SCALE);
        assert_eq!(split.reinvest, 30 * SCALE);
        assert_eq!(split.fee, 35 * SCALE / 10); // 3.5
        assert_eq!(split.paid, 665 * SCALE / 10); // 66.5
    }

    #[test]
    fn test_split_with_five_referrals() {
        let split = calculate_split(100 * SCALE, 7_500, 500).unwrap();

        assert_eq!(split.reinvest, 25 * SCALE);
        assert_eq!(split.fee, 375 * SCALE / 100); // 3.75
        assert_eq!(split.paid, 7125 * SCALE / 100); // 71.25
    }

    #[test]
    fn test_split_with_twenty_referrals() {
        let split = calculate_split(100 * SCALE, 8_000, 500).unwrap();

        assert_eq!(split.reinvest, 20 * SCALE);
        assert_eq!(split.fee, 4 * SCALE);
        assert_eq!(split.paid, 76 * SCALE);
    }

    #[test]
    fn test_split_parts_sum_to_request() {
        let requested = 123_456_789i128;
        let split = calculate_split(requested, 7_500, 500).unwrap();

        assert_eq!(split.paid + split.fee + split.reinvest, requested);
    }
}
