use soroban_sdk::{vec, Env, Vec};

use crate::error::Error;
use crate::storage::{Account, PackageDefinition, BASIS_POINTS, SCALE};

pub const CAP_MULTIPLIER: u32 = 4;
pub const MAX_LEVELS: u32 = 10;

/// Package prices for tiers 1..=4
const DEFAULT_PRICES: [i128; 4] = [30 * SCALE, 50 * SCALE, 100 * SCALE, 200 * SCALE];

/// Default package table
///
/// Split of every package amount (basis points):
/// - 5% admin fee
/// - 40% direct sponsor
/// - 10% level bonus: 3% level 1, 1% levels 2-6, 0.5% levels 7-10
/// - 10% upline bonus, shared equally by up to 30 uplines
/// - 10% leadership pool, 20% community pool, 5% club pool
pub fn default_catalog(env: &Env) -> Vec<PackageDefinition> {
    let mut catalog = Vec::new(env);
    for (index, price) in DEFAULT_PRICES.iter().enumerate() {
        catalog.push_back(PackageDefinition {
            tier: index as u32 + 1,
            price: *price,
            cap_multiplier: CAP_MULTIPLIER,
            direct_bonus_bps: 4_000,
            level_bonus_bps: vec![env, 300, 100, 100, 100, 100, 100, 50, 50, 50, 50],
            upline_bonus_bps: 1_000,
            leadership_pool_bps: 1_000,
            community_pool_bps: 2_000,
            club_pool_bps: 500,
            admin_fee_bps: 500,
        });
    }
    catalog
}

/// Validate a catalog row
///
/// # Errors
/// - `InvalidPackage`: zero tier/price/multiplier, more than 10 levels,
///   or rates not summing to exactly 100%
pub fn validate_package(package: &PackageDefinition) -> Result<(), Error> {
    if package.tier == 0 || package.price <= 0 || package.cap_multiplier == 0 {
        return Err(Error::InvalidPackage);
    }

    if package.level_bonus_bps.len() > MAX_LEVELS {
        return Err(Error::InvalidPackage);
    }

    let mut total: i128 = package.direct_bonus_bps as i128
        + package.upline_bonus_bps as i128
        + package.leadership_pool_bps as i128
        + package.community_pool_bps as i128
        + package.club_pool_bps as i128
        + package.admin_fee_bps as i128;
    for rate in package.level_bonus_bps.iter() {
        total += rate as i128;
    }

    if total != BASIS_POINTS {
        return Err(Error::InvalidPackage);
    }

    Ok(())
}

/// Calculate a basis-point share of an amount (floored)
///
/// Example: 100 × 4,000 bps = 40
pub fn apply_bps(amount: i128, bps: u32) -> Option<i128> {
    amount
        .checked_mul(bps as i128)?
        .checked_div(BASIS_POINTS)
}

/// Lifetime earnings ceiling: price × cap multiplier
pub fn earnings_cap(package: &PackageDefinition) -> Option<i128> {
    package.price.checked_mul(package.cap_multiplier as i128)
}

/// Credit an account, clamped to its remaining earnings headroom.
///
/// Returns the amount actually credited; the caller owns the remainder.
/// Once the cap is reached the account is flagged and further credits are
/// no-ops.
pub fn credit(account: &mut Account, amount: i128) -> i128 {
    if amount <= 0 {
        return 0;
    }

    let headroom = account.earnings_cap - account.total_earned;
    if headroom <= 0 {
        account.is_capped = true;
        return 0;
    }

    let creditable = amount.min(headroom);
    account.balance += creditable;
    account.total_earned += creditable;

    if account.total_earned >= account.earnings_cap {
        account.is_capped = true;
    }

    creditable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LeaderRank;
    use soroban_sdk::{testutils::Address as _, Address};

    fn test_account(env: &Env, cap: i128) -> Account {
        Account {
            id: 0,
            participant: Address::generate(env),
            sponsor: None,
            package_tier: 3,
            balance: 0,
            total_invested: 100 * SCALE,
            total_earned: 0,
            earnings_cap: cap,
            is_capped: false,
            total_withdrawn: 0,
            direct_referrals: 0,
            team_size: 0,
            leader_rank: LeaderRank::Unranked,
            last_active_step: 0,
            registered_at_step: 0,
            matrix_parent: None,
            matrix_left: None,
            matrix_right: None,
            spillover_counter: 0,
            club_member: false,
        }
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let env = Env::default();
        let catalog = default_catalog(&env);

        assert_eq!(catalog.len(), 4);
        for package in catalog.iter() {
            assert_eq!(validate_package(&package), Ok(()));
        }
        assert_eq!(catalog.get(2).unwrap().price, 100 * SCALE);
    }

    #[test]
    fn test_earnings_cap_is_four_times_price() {
        let env = Env::default();
        let package = default_catalog(&env).get(3).unwrap();

        assert_eq!(earnings_cap(&package), Some(800 * SCALE));
    }

    #[test]
    fn test_rates_must_sum_to_whole() {
        let env = Env::default();
        let mut package = default_catalog(&env).get(0).unwrap();
        package.direct_bonus_bps = 4_100;

        assert_eq!(validate_package(&package), Err(Error::InvalidPackage));
    }

    #[test]
    fn test_level_table_limited_to_ten() {
        let env = Env::default();
        let mut package = default_catalog(&env).get(0).unwrap();
        package.level_bonus_bps.push_back(0);

        assert_eq!(validate_package(&package), Err(Error::InvalidPackage));
    }

    #[test]
    fn test_credit_within_headroom() {
        let env = Env::default();
        let mut account = test_account(&env, 400 * SCALE);

        assert_eq!(credit(&mut account, 40 * SCALE), 40 * SCALE);
        assert_eq!(account.balance, 40 * SCALE);
        assert_eq!(account.total_earned, 40 * SCALE);
        assert!(!account.is_capped);
    }

    #[test]
    fn test_credit_clamps_at_cap() {
        let env = Env::default();
        let mut account = test_account(&env, 400 * SCALE);
        account.total_earned = 390 * SCALE;

        // Only 10 of headroom left
        assert_eq!(credit(&mut account, 40 * SCALE), 10 * SCALE);
        assert_eq!(account.total_earned, 400 * SCALE);
        assert!(account.is_capped);

        // Capped accounts take nothing further
        assert_eq!(credit(&mut account, 5 * SCALE), 0);
        assert_eq!(account.total_earned, 400 * SCALE);
        assert_eq!(account.balance, 10 * SCALE);
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(100 * SCALE, 4_000), Some(40 * SCALE));
        assert_eq!(apply_bps(100 * SCALE, 50), Some(SCALE / 2));
        assert_eq!(apply_bps(i128::MAX, 2), None);
    }
}
