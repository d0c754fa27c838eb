#![no_std]

mod catalog;
mod commission;
mod config;
mod error;
mod events;
mod guard;
mod matrix;
mod pool;
mod storage;
mod withdrawal;


use catalog::{default_catalog, earnings_cap, validate_package};
use config::EngineConfig;
use error::Error;
use events::*;
use guard::{check_replay, TraversalBudget, WalkKind};
use matrix::MatrixChildren;
use pool::{interval_for, DistributionReport};
use storage::{
    Account, BreakerState, DataKey, DistributionRound, LeaderRank, PackageDefinition, PoolKind,
    PoolState, Storage,
};
use withdrawal::WithdrawalReceipt;

use soroban_sdk::{contract, contractimpl, log, token, Address, Env, Symbol, Vec};

const POOL_KINDS: [PoolKind; 3] = [PoolKind::Leadership, PoolKind::Community, PoolKind::Club];

#[contract]
pub struct ReferralEngine;

#[contractimpl]
impl ReferralEngine {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the engine with the default config and package catalog
    ///
    /// # Errors
    /// - `AlreadyInitialized`: Contract already initialized
    pub fn initialize(
        env: Env,
        admin: Address,
        reserve: Address,
        stablecoin: Address,
    ) -> Result<(), Error> {
        if Storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Initialized, &true);
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::ReserveAddress, &reserve);
        env.storage().instance().set(&DataKey::Stablecoin, &stablecoin);

        let config = EngineConfig::default_config(&env);
        Storage::set_config(&env, &config);

        for package in default_catalog(&env).iter() {
            Storage::set_package(&env, &package);
        }

        let step = env.ledger().sequence();
        for kind in POOL_KINDS {
            Storage::set_pool(
                &env,
                &PoolState {
                    kind,
                    balance: 0,
                    last_distributed_step: step,
                    interval_steps: interval_for(&config, kind),
                },
            );
        }

        Storage::bump_instance(&env);
        Ok(())
    }

    /// Replace the engine configuration
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `InvalidConfig`: Configuration failed validation
    pub fn set_config(env: Env, config: EngineConfig) -> Result<(), Error> {
        let admin = Storage::get_admin(&env)?;
        admin.require_auth();

        config.validate()?;
        Storage::set_config(&env, &config);

        for kind in POOL_KINDS {
            let mut pool = Storage::get_pool(&env, kind)?;
            pool.interval_steps = interval_for(&config, kind);
            Storage::set_pool(&env, &pool);
        }

        Storage::bump_instance(&env);
        Ok(())
    }

    /// Add or replace a catalog row. Tiers must stay contiguous from 1.
    ///
    /// Accounts keep the cap fixed at their last registration or upgrade.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `InvalidPackage`: Row failed validation or leaves a gap in tiers
    pub fn set_package(env: Env, package: PackageDefinition) -> Result<(), Error> {
        let admin = Storage::get_admin(&env)?;
        admin.require_auth();

        validate_package(&package)?;
        if package.tier > Storage::tier_count(&env) + 1 {
            return Err(Error::InvalidPackage);
        }

        Storage::set_package(&env, &package);
        Storage::bump_instance(&env);
        Ok(())
    }

    // ============================================
    // MEMBERSHIP
    // ============================================

    /// Register a participant under a sponsor and distribute the package price
    ///
    /// Without a sponsor the participant joins under the root; the very first
    /// registration becomes the root.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `ReplayRejected`: Participant already acted in this ledger
    /// - `AlreadyRegistered`: Participant already has an account
    /// - `InvalidTier`: Tier is zero or not in the catalog
    /// - `InsufficientFunds`: Payment does not cover the package price
    /// - `InvalidSponsor`: Participant named themselves as sponsor
    /// - `SponsorNotFound`: Sponsor has no account
    pub fn register(
        env: Env,
        participant: Address,
        sponsor: Option<Address>,
        tier: u32,
        payment: i128,
    ) -> Result<(), Error> {
        let config = Storage::get_config(&env)?;
        Storage::bump_instance(&env);

        participant.require_auth();

        if let Some(existing) = Storage::get_account(&env, &participant) {
            check_replay(&env, &existing)?;
            return Err(Error::AlreadyRegistered);
        }

        let package = Storage::get_package(&env, tier).ok_or(Error::InvalidTier)?;
        if payment < package.price {
            return Err(Error::InsufficientFunds);
        }

        let sponsor = match sponsor {
            Some(sponsor) => {
                if sponsor == participant {
                    return Err(Error::InvalidSponsor);
                }
                if !Storage::has_account(&env, &sponsor) {
                    return Err(Error::SponsorNotFound);
                }
                Some(sponsor)
            }
            None => Storage::get_root(&env),
        };

        let cap = earnings_cap(&package).ok_or(Error::InvalidAmount)?;

        Self::collect_payment(&env, &participant, package.price)?;

        let step = env.ledger().sequence();
        let id = Storage::push_member(&env, &participant);

        let matrix_parent = match &sponsor {
            Some(sponsor_id) => Self::place(&env, &config, sponsor_id, &participant)?,
            None => {
                Storage::set_root(&env, &participant);
                None
            }
        };

        let account = Account {
            id,
            participant: participant.clone(),
            sponsor: sponsor.clone(),
            package_tier: tier,
            balance: 0,
            total_invested: package.price,
            total_earned: 0,
            earnings_cap: cap,
            is_capped: false,
            total_withdrawn: 0,
            direct_referrals: 0,
            team_size: 0,
            leader_rank: LeaderRank::Unranked,
            last_active_step: step,
            registered_at_step: step,
            matrix_parent: matrix_parent.clone(),
            matrix_left: None,
            matrix_right: None,
            spillover_counter: 0,
            club_member: false,
        };
        Storage::set_account(&env, &account);

        let mut budget = TraversalBudget::new(WalkKind::TeamSize, config.max_traversal_steps);
        matrix::propagate_team_size(&env, &config, matrix_parent.clone(), &mut budget);
        budget.report(&env);

        commission::distribute(&env, &config, &package, sponsor.clone(), package.price)?;

        env.events().publish(
            (Symbol::new(&env, "registered"), participant.clone()),
            RegisteredEvent {
                participant,
                sponsor,
                matrix_parent,
                tier,
                amount: package.price,
            },
        );

        Ok(())
    }

    /// Move a participant to a higher tier and distribute the new package price
    ///
    /// The earnings cap is reset to the new package's cap.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NotRegistered`: Participant has no account
    /// - `ReplayRejected`: Participant already acted in this ledger
    /// - `InvalidTier`: Tier unknown or not above the current tier
    /// - `InsufficientFunds`: Payment does not cover the package price
    pub fn upgrade(
        env: Env,
        participant: Address,
        new_tier: u32,
        payment: i128,
    ) -> Result<(), Error> {
        let config = Storage::get_config(&env)?;
        Storage::bump_instance(&env);

        participant.require_auth();

        let mut account =
            Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)?;
        check_replay(&env, &account)?;

        if new_tier <= account.package_tier {
            return Err(Error::InvalidTier);
        }

        let package = Storage::get_package(&env, new_tier).ok_or(Error::InvalidTier)?;
        if payment < package.price {
            return Err(Error::InsufficientFunds);
        }

        let cap = earnings_cap(&package).ok_or(Error::InvalidAmount)?;

        Self::collect_payment(&env, &participant, package.price)?;

        let from_tier = account.package_tier;
        account.package_tier = new_tier;
        account.total_invested = account
            .total_invested
            .checked_add(package.price)
            .ok_or(Error::InvalidAmount)?;
        account.earnings_cap = cap;
        account.is_capped = account.total_earned >= cap;
        account.last_active_step = env.ledger().sequence();
        Storage::set_account(&env, &account);

        commission::distribute(
            &env,
            &config,
            &package,
            account.sponsor.clone(),
            package.price,
        )?;

        env.events().publish(
            (Symbol::new(&env, "upgraded"), participant.clone()),
            UpgradedEvent {
                participant,
                from_tier,
                to_tier: new_tier,
                amount: package.price,
            },
        );

        Ok(())
    }

    /// Opt into the club pool
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NotRegistered`: Participant has no account
    /// - `ReplayRejected`: Participant already acted in this ledger
    /// - `ClubIneligible`: Package tier below the club minimum
    /// - `AlreadyClubMember`: Participant already opted in
    pub fn join_club(env: Env, participant: Address) -> Result<(), Error> {
        let config = Storage::get_config(&env)?;
        Storage::bump_instance(&env);

        participant.require_auth();

        let mut account =
            Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)?;
        check_replay(&env, &account)?;

        if account.package_tier < config.club_min_tier {
            return Err(Error::ClubIneligible);
        }
        if account.club_member {
            return Err(Error::AlreadyClubMember);
        }

        account.club_member = true;
        account.last_active_step = env.ledger().sequence();
        Storage::set_account(&env, &account);

        env.events().publish(
            (Symbol::new(&env, "club_joined"), participant.clone()),
            ClubJoinedEvent {
                participant,
                tier: account.package_tier,
            },
        );

        Ok(())
    }

    // ============================================
    // WITHDRAWALS
    // ============================================

    /// Withdraw from the accrued balance, or compound it with a bonus
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NotRegistered`: Participant has no account
    /// - `ReplayRejected`: Participant already acted in this ledger
    /// - `InvalidAmount`: amount must be positive
    /// - `InsufficientBalance`: amount exceeds the balance
    /// - `CircuitBreakerTripped`: Rolling withdrawal volume over threshold.
    ///   The error carries no amounts; the attempted amount and threshold are
    ///   only logged in debug-assertion builds. Read the window volume and
    ///   threshold with `breaker_status`.
    /// - `CompoundBonusUnfunded`: Compound bonus exceeds what the community
    ///   pool, reserve and admin fees hold
    pub fn withdraw(
        env: Env,
        participant: Address,
        amount: i128,
        auto_compound: bool,
    ) -> Result<WithdrawalReceipt, Error> {
        let config = Storage::get_config(&env)?;
        Storage::bump_instance(&env);

        participant.require_auth();

        let mut account =
            Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)?;
        check_replay(&env, &account)?;

        let receipt = withdrawal::process(&env, &config, &mut account, amount, auto_compound)?;

        account.last_active_step = env.ledger().sequence();
        Storage::set_account(&env, &account);

        if receipt.paid > 0 {
            let stablecoin = Storage::get_stablecoin(&env)?;
            let stablecoin_client = token::Client::new(&env, &stablecoin);
            stablecoin_client.transfer(&env.current_contract_address(), &participant, &receipt.paid);
        }

        if receipt.compounded {
            env.events().publish(
                (Symbol::new(&env, "compounded"), participant.clone()),
                CompoundedEvent {
                    participant,
                    requested: amount,
                    bonus: receipt.reinvested - amount,
                },
            );
        } else {
            env.events().publish(
                (Symbol::new(&env, "withdrawn"), participant.clone()),
                WithdrawnEvent {
                    participant,
                    requested: amount,
                    paid: receipt.paid,
                    fee: receipt.fee,
                    reinvested: receipt.reinvested,
                },
            );
        }

        Ok(receipt)
    }

    // ============================================
    // POOL DISTRIBUTION (callable by anyone)
    // ============================================

    /// Distribute the community pool by team-size weight
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `DistributionTooEarly`: Interval not elapsed and no round in progress
    pub fn distribute_community_pool(env: Env) -> Result<DistributionReport, Error> {
        Self::run_distribution(&env, PoolKind::Community)
    }

    /// Distribute the leadership pool 50/50 across the two leader ranks
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `DistributionTooEarly`: Interval not elapsed and no round in progress
    pub fn distribute_leadership_pool(env: Env) -> Result<DistributionReport, Error> {
        Self::run_distribution(&env, PoolKind::Leadership)
    }

    /// Distribute the club pool evenly across active club members
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `DistributionTooEarly`: Interval not elapsed and no round in progress
    pub fn distribute_club_pool(env: Env) -> Result<DistributionReport, Error> {
        Self::run_distribution(&env, PoolKind::Club)
    }

    // ============================================
    // SWEEPS
    // ============================================

    /// Transfer collected admin fees to the reserve address
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    pub fn sweep_admin_fees(env: Env) -> Result<i128, Error> {
        let admin = Storage::get_admin(&env)?;
        admin.require_auth();

        let amount = Storage::take_admin_fees(&env);
        Self::pay_reserve(&env, amount, "fees_swept")?;
        Ok(amount)
    }

    /// Transfer the admin-reserve balance to the reserve address
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    pub fn sweep_reserve(env: Env) -> Result<i128, Error> {
        let admin = Storage::get_admin(&env)?;
        admin.require_auth();

        let amount = Storage::take_reserve(&env);
        Self::pay_reserve(&env, amount, "reserve_swept")?;
        Ok(amount)
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    /// Get a participant's account summary
    pub fn get_account(env: Env, participant: Address) -> Result<Account, Error> {
        Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)
    }

    /// Get one pool's state
    pub fn get_pool(env: Env, kind: PoolKind) -> Result<PoolState, Error> {
        Storage::get_pool(&env, kind)
    }

    /// Get every pool's state (leadership, community, club)
    pub fn get_pools(env: Env) -> Result<Vec<PoolState>, Error> {
        let mut pools = Vec::new(&env);
        for kind in POOL_KINDS {
            pools.push_back(Storage::get_pool(&env, kind)?);
        }
        Ok(pools)
    }

    /// Get the in-progress distribution round for a pool, if any
    pub fn get_round(env: Env, kind: PoolKind) -> Option<DistributionRound> {
        Storage::get_round(&env, kind)
    }

    /// Withdrawable share (basis points) for a participant right now
    pub fn withdrawal_rate(env: Env, participant: Address) -> Result<u32, Error> {
        let config = Storage::get_config(&env)?;
        let account = Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)?;
        Ok(config.withdraw_rate_bps(account.direct_referrals))
    }

    /// Get a participant's matrix children
    pub fn matrix_children(env: Env, participant: Address) -> Result<MatrixChildren, Error> {
        let account = Storage::get_account(&env, &participant).ok_or(Error::NotRegistered)?;
        Ok(MatrixChildren {
            left: account.matrix_left,
            right: account.matrix_right,
        })
    }

    /// Get a catalog row
    pub fn get_package(env: Env, tier: u32) -> Result<PackageDefinition, Error> {
        Storage::get_package(&env, tier).ok_or(Error::InvalidTier)
    }

    /// Get the whole package catalog, lowest tier first
    pub fn get_catalog(env: Env) -> Vec<PackageDefinition> {
        let mut catalog = Vec::new(&env);
        for tier in 1..=Storage::tier_count(&env) {
            if let Some(package) = Storage::get_package(&env, tier) {
                catalog.push_back(package);
            }
        }
        catalog
    }

    /// Get the engine configuration
    pub fn get_config(env: Env) -> Result<EngineConfig, Error> {
        Storage::get_config(&env)
    }

    /// Admin fees awaiting sweep
    pub fn admin_fees(env: Env) -> i128 {
        Storage::admin_fees(&env)
    }

    /// Admin-reserve balance awaiting sweep
    pub fn reserve_balance(env: Env) -> i128 {
        Storage::reserve_balance(&env)
    }

    /// Current circuit breaker window
    pub fn breaker_status(env: Env) -> Result<BreakerState, Error> {
        let config = Storage::get_config(&env)?;
        Ok(guard::breaker_status(&env, &config))
    }

    /// Number of registered participants
    pub fn member_count(env: Env) -> u32 {
        Storage::member_count(&env)
    }

    // ============================================
    // INTERNAL HELPERS
    // ============================================

    fn collect_payment(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
        let stablecoin = Storage::get_stablecoin(env)?;
        let stablecoin_client = token::Client::new(env, &stablecoin);
        stablecoin_client.transfer(from, &env.current_contract_address(), &amount);
        Ok(())
    }

    fn pay_reserve(env: &Env, amount: i128, topic: &str) -> Result<(), Error> {
        let reserve = Storage::get_reserve_address(env)?;

        if amount > 0 {
            let stablecoin = Storage::get_stablecoin(env)?;
            let stablecoin_client = token::Client::new(env, &stablecoin);
            stablecoin_client.transfer(&env.current_contract_address(), &reserve, &amount);
        }

        env.events().publish(
            (Symbol::new(env, topic),),
            SweptEvent {
                to: reserve,
                amount,
            },
        );
        Ok(())
    }

    /// Credit the sponsor with a direct referral and link the entrant into
    /// the matrix. Returns the matrix parent, or None if the placement
    /// search ran out of budget.
    fn place(
        env: &Env,
        config: &EngineConfig,
        sponsor_id: &Address,
        participant: &Address,
    ) -> Result<Option<Address>, Error> {
        let mut sponsor = Storage::get_account(env, sponsor_id).ok_or(Error::SponsorNotFound)?;
        sponsor.direct_referrals += 1;
        sponsor.leader_rank = config.rank_for(sponsor.direct_referrals, sponsor.team_size);

        let mut budget = TraversalBudget::new(WalkKind::Placement, config.max_traversal_steps);
        let slot = matrix::find_slot(env, &sponsor, &mut budget);
        budget.report(env);

        let parent = match slot {
            Some(slot) => {
                if slot.spillover {
                    sponsor.spillover_counter = (sponsor.spillover_counter + 1) % 2;
                }

                if slot.parent == sponsor.participant {
                    matrix::attach(&mut sponsor, slot.side, participant);
                } else {
                    let mut parent =
                        Storage::get_account(env, &slot.parent).ok_or(Error::NotRegistered)?;
                    matrix::attach(&mut parent, slot.side, participant);
                    Storage::set_account(env, &parent);
                }
                Some(slot.parent)
            }
            None => {
                log!(env, "entrant left unplaced", participant.clone());
                None
            }
        };

        Storage::set_account(env, &sponsor);
        Ok(parent)
    }

    fn run_distribution(env: &Env, kind: PoolKind) -> Result<DistributionReport, Error> {
        let config = Storage::get_config(env)?;
        Storage::bump_instance(env);
        pool::distribute(env, &config, kind)
    }
}
