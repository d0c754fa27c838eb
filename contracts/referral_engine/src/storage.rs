use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::config::EngineConfig;
use crate::error::Error;

// Constants
pub const SCALE: i128 = 10_000_000; // 7 decimals
pub const BASIS_POINTS: i128 = 10_000; // 100%

/// Ledgers closed per day at ~5s per ledger
pub const DAY_IN_LEDGERS: u32 = 17_280;
pub const INSTANCE_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
pub const INSTANCE_LIFETIME_THRESHOLD: u32 = INSTANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;
pub const ACCOUNT_BUMP_AMOUNT: u32 = 60 * DAY_IN_LEDGERS;
pub const ACCOUNT_LIFETIME_THRESHOLD: u32 = ACCOUNT_BUMP_AMOUNT - DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LeaderRank {
    /// No leadership qualification
    Unranked = 0,
    /// Lower cohort (direct referrals + team size)
    ShiningStar = 1,
    /// Higher cohort (team size)
    SilverStar = 2,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolKind {
    Leadership = 0,
    Community = 1,
    Club = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Account {
    /// Position in the member index
    pub id: u32,
    pub participant: Address,
    /// Inviting participant (None for the root)
    pub sponsor: Option<Address>,
    pub package_tier: u32,
    /// Withdrawable accrued amount
    pub balance: i128,
    pub total_invested: i128,
    /// Lifetime credits from every channel, never above `earnings_cap`
    pub total_earned: i128,
    pub earnings_cap: i128,
    pub is_capped: bool,
    pub total_withdrawn: i128,
    pub direct_referrals: u32,
    /// Matrix descendants
    pub team_size: u32,
    pub leader_rank: LeaderRank,
    /// Ledger sequence of the last state-changing action
    pub last_active_step: u32,
    pub registered_at_step: u32,
    pub matrix_parent: Option<Address>,
    pub matrix_left: Option<Address>,
    pub matrix_right: Option<Address>,
    /// Side the next spillover search starts from (0 = left, 1 = right)
    pub spillover_counter: u32,
    pub club_member: bool,
}

/// Immutable catalog row. Every rate is basis points of the package amount.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageDefinition {
    pub tier: u32,
    pub price: i128,
    pub cap_multiplier: u32,
    pub direct_bonus_bps: u32,
    /// Per-level rates, level 1 first (at most 10 levels)
    pub level_bonus_bps: Vec<u32>,
    /// Total upline share, split equally across the ancestors found
    pub upline_bonus_bps: u32,
    pub leadership_pool_bps: u32,
    pub community_pool_bps: u32,
    pub club_pool_bps: u32,
    pub admin_fee_bps: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    pub kind: PoolKind,
    pub balance: i128,
    pub last_distributed_step: u32,
    pub interval_steps: u32,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundPhase {
    /// Summing eligible weights per cohort
    Tally = 0,
    /// Paying each eligible member its share
    Payout = 1,
}

/// An in-progress pool distribution. A round outlives a single call when the
/// member set is larger than the scan budget.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionRound {
    pub kind: PoolKind,
    pub amount: i128,
    /// Cohort 0 share (the whole amount for single-cohort pools)
    pub primary_amount: i128,
    /// Cohort 1 share (SilverStar half for the leadership pool)
    pub secondary_amount: i128,
    pub primary_weight: i128,
    pub secondary_weight: i128,
    pub primary_paid: i128,
    pub secondary_paid: i128,
    pub member_count: u32,
    pub cursor: u32,
    pub phase: RoundPhase,
    pub recipients: u32,
    /// Credited to member balances
    pub credited: i128,
    /// Cap overflow sent back to the community pool
    pub recycled: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BreakerState {
    pub window_start: u32,
    pub volume: i128,
    pub threshold: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Initialized,
    Admin,
    ReserveAddress,
    Stablecoin,
    Config,
    Package(u32),
    TierCount,
    Pool(PoolKind),
    Round(PoolKind),
    AdminFees,
    ReserveBalance,
    Breaker,
    Root,
    MemberCount,
    Member(u32),         // id -> participant
    Account(Address),    // participant -> Account
}

pub struct Storage;

impl Storage {
    pub fn bump_instance(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }

    pub fn is_initialized(env: &Env) -> bool {
        env.storage().instance().has(&DataKey::Initialized)
    }

    // Roles & collaborators
    pub fn get_admin(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_reserve_address(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::ReserveAddress)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_stablecoin(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Stablecoin)
            .ok_or(Error::NotInitialized)
    }

    // Config
    pub fn get_config(env: &Env) -> Result<EngineConfig, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(Error::NotInitialized)
    }

    pub fn set_config(env: &Env, config: &EngineConfig) {
        env.storage().instance().set(&DataKey::Config, config);
    }

    // Catalog
    pub fn get_package(env: &Env, tier: u32) -> Option<PackageDefinition> {
        env.storage().instance().get(&DataKey::Package(tier))
    }

    pub fn set_package(env: &Env, package: &PackageDefinition) {
        env.storage()
            .instance()
            .set(&DataKey::Package(package.tier), package);

        if package.tier > Self::tier_count(env) {
            env.storage()
                .instance()
                .set(&DataKey::TierCount, &package.tier);
        }
    }

    pub fn tier_count(env: &Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::TierCount)
            .unwrap_or(0)
    }

    // Accounts
    pub fn has_account(env: &Env, participant: &Address) -> bool {
        env.storage()
            .persistent()
            .has(&DataKey::Account(participant.clone()))
    }

    /// Reads also extend the entry so dormant members stay reachable by walks
    /// and pool scans
    pub fn get_account(env: &Env, participant: &Address) -> Option<Account> {
        let key = DataKey::Account(participant.clone());
        let account = env.storage().persistent().get(&key)?;
        Self::bump_persistent(env, &key);
        Some(account)
    }

    pub fn set_account(env: &Env, account: &Account) {
        let key = DataKey::Account(account.participant.clone());
        env.storage().persistent().set(&key, account);
        Self::bump_persistent(env, &key);
    }

    fn bump_persistent(env: &Env, key: &DataKey) {
        env.storage().persistent().extend_ttl(
            key,
            ACCOUNT_LIFETIME_THRESHOLD,
            ACCOUNT_BUMP_AMOUNT,
        );
    }

    // Member index
    pub fn member_count(env: &Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::MemberCount)
            .unwrap_or(0)
    }

    pub fn member_at(env: &Env, id: u32) -> Option<Address> {
        let key = DataKey::Member(id);
        let member = env.storage().persistent().get(&key)?;
        Self::bump_persistent(env, &key);
        Some(member)
    }

    /// Append a participant to the member index, returning its id
    pub fn push_member(env: &Env, participant: &Address) -> u32 {
        let id = Self::member_count(env);
        let key = DataKey::Member(id);
        env.storage().persistent().set(&key, participant);
        Self::bump_persistent(env, &key);
        env.storage()
            .instance()
            .set(&DataKey::MemberCount, &(id + 1));
        id
    }

    pub fn get_root(env: &Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Root)
    }

    pub fn set_root(env: &Env, root: &Address) {
        env.storage().instance().set(&DataKey::Root, root);
    }

    // Pools
    pub fn get_pool(env: &Env, kind: PoolKind) -> Result<PoolState, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Pool(kind))
            .ok_or(Error::NotInitialized)
    }

    pub fn set_pool(env: &Env, pool: &PoolState) {
        env.storage().instance().set(&DataKey::Pool(pool.kind), pool);
    }

    pub fn add_to_pool(env: &Env, kind: PoolKind, amount: i128) -> Result<(), Error> {
        if amount == 0 {
            return Ok(());
        }
        let mut pool = Self::get_pool(env, kind)?;
        pool.balance = pool
            .balance
            .checked_add(amount)
            .ok_or(Error::InvalidAmount)?;
        Self::set_pool(env, &pool);
        Ok(())
    }

    /// Remove up to `amount` from a pool, returning what was actually taken
    pub fn draw_from_pool(env: &Env, kind: PoolKind, amount: i128) -> Result<i128, Error> {
        let mut pool = Self::get_pool(env, kind)?;
        let taken = amount.min(pool.balance).max(0);
        pool.balance -= taken;
        Self::set_pool(env, &pool);
        Ok(taken)
    }

    pub fn get_round(env: &Env, kind: PoolKind) -> Option<DistributionRound> {
        env.storage().instance().get(&DataKey::Round(kind))
    }

    pub fn set_round(env: &Env, round: &DistributionRound) {
        env.storage()
            .instance()
            .set(&DataKey::Round(round.kind), round);
    }

    pub fn remove_round(env: &Env, kind: PoolKind) {
        env.storage().instance().remove(&DataKey::Round(kind));
    }

    // Accumulators awaiting sweep
    pub fn admin_fees(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::AdminFees)
            .unwrap_or(0)
    }

    pub fn add_admin_fees(env: &Env, amount: i128) -> Result<(), Error> {
        let total = Self::admin_fees(env)
            .checked_add(amount)
            .ok_or(Error::InvalidAmount)?;
        env.storage().instance().set(&DataKey::AdminFees, &total);
        Ok(())
    }

    pub fn take_admin_fees(env: &Env) -> i128 {
        let total = Self::admin_fees(env);
        env.storage().instance().set(&DataKey::AdminFees, &0i128);
        total
    }

    /// Remove up to `amount` from the admin fees, returning what was taken
    pub fn draw_admin_fees(env: &Env, amount: i128) -> i128 {
        let total = Self::admin_fees(env);
        let taken = amount.min(total).max(0);
        env.storage()
            .instance()
            .set(&DataKey::AdminFees, &(total - taken));
        taken
    }

    pub fn reserve_balance(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::ReserveBalance)
            .unwrap_or(0)
    }

    pub fn add_reserve(env: &Env, amount: i128) -> Result<(), Error> {
        let total = Self::reserve_balance(env)
            .checked_add(amount)
            .ok_or(Error::InvalidAmount)?;
        env.storage().instance().set(&DataKey::ReserveBalance, &total);
        Ok(())
    }

    pub fn take_reserve(env: &Env) -> i128 {
        let total = Self::reserve_balance(env);
        env.storage()
            .instance()
            .set(&DataKey::ReserveBalance, &0i128);
        total
    }

    /// Remove up to `amount` from the reserve, returning what was taken
    pub fn draw_reserve(env: &Env, amount: i128) -> i128 {
        let total = Self::reserve_balance(env);
        let taken = amount.min(total).max(0);
        env.storage()
            .instance()
            .set(&DataKey::ReserveBalance, &(total - taken));
        taken
    }

    // Circuit breaker
    pub fn get_breaker(env: &Env) -> Option<BreakerState> {
        env.storage().instance().get(&DataKey::Breaker)
    }

    pub fn set_breaker(env: &Env, breaker: &BreakerState) {
        env.storage().instance().set(&DataKey::Breaker, breaker);
    }
}
