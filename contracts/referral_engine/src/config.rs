use soroban_sdk::{contracttype, vec, Env, Vec};

use crate::error::Error;
use crate::storage::{LeaderRank, BASIS_POINTS, DAY_IN_LEDGERS, SCALE};

/// Withdrawable share unlocked at a direct-referral threshold
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawTier {
    pub min_direct_referrals: u32,
    pub withdraw_bps: u32,
}

/// Qualification for a leader cohort
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankRule {
    pub min_direct_referrals: u32,
    pub min_team_size: u32,
}

/// Engine parameters. Step-denominated fields count ledgers.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    /// Ascending by `min_direct_referrals`, first entry at 0
    pub withdraw_tiers: Vec<WithdrawTier>,
    /// Fee on the withdrawable portion only
    pub withdraw_fee_bps: u32,
    /// Bonus on auto-compounded withdrawals
    pub compound_bonus_bps: u32,
    pub community_interval: u32,
    pub leadership_interval: u32,
    pub club_interval: u32,
    /// Community/club eligibility: last action within this many steps
    pub activity_window: u32,
    pub breaker_window: u32,
    pub breaker_threshold: i128,
    /// Node budget for placement search, team propagation and sponsor walks
    pub max_traversal_steps: u32,
    /// Member budget per pool distribution call
    pub max_pool_scan: u32,
    pub upline_depth: u32,
    pub shining_star: RankRule,
    pub silver_star: RankRule,
    pub club_min_tier: u32,
}

impl EngineConfig {
    pub fn default_config(env: &Env) -> Self {
        EngineConfig {
            withdraw_tiers: vec![
                env,
                WithdrawTier {
                    min_direct_referrals: 0,
                    withdraw_bps: 7_000,
                },
                WithdrawTier {
                    min_direct_referrals: 5,
                    withdraw_bps: 7_500,
                },
                WithdrawTier {
                    min_direct_referrals: 20,
                    withdraw_bps: 8_000,
                },
            ],
            withdraw_fee_bps: 500,
            compound_bonus_bps: 500,
            community_interval: 7 * DAY_IN_LEDGERS,
            leadership_interval: 14 * DAY_IN_LEDGERS,
            club_interval: 7 * DAY_IN_LEDGERS,
            activity_window: 30 * DAY_IN_LEDGERS,
            breaker_window: DAY_IN_LEDGERS,
            breaker_threshold: 100_000 * SCALE,
            max_traversal_steps: 256,
            max_pool_scan: 200,
            upline_depth: 30,
            shining_star: RankRule {
                min_direct_referrals: 10,
                min_team_size: 250,
            },
            silver_star: RankRule {
                min_direct_referrals: 0,
                min_team_size: 500,
            },
            club_min_tier: 3,
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    /// - `InvalidConfig`: tiers unordered or out of range, zero intervals or budgets
    pub fn validate(&self) -> Result<(), Error> {
        if self.withdraw_tiers.is_empty() {
            return Err(Error::InvalidConfig);
        }

        let mut previous: Option<WithdrawTier> = None;
        for tier in self.withdraw_tiers.iter() {
            if tier.withdraw_bps as i128 > BASIS_POINTS {
                return Err(Error::InvalidConfig);
            }
            match &previous {
                None if tier.min_direct_referrals != 0 => return Err(Error::InvalidConfig),
                Some(prev) if tier.min_direct_referrals <= prev.min_direct_referrals => {
                    return Err(Error::InvalidConfig)
                }
                _ => {}
            }
            previous = Some(tier);
        }

        if self.withdraw_fee_bps as i128 > BASIS_POINTS {
            return Err(Error::InvalidConfig);
        }

        if self.community_interval == 0
            || self.leadership_interval == 0
            || self.club_interval == 0
            || self.breaker_window == 0
        {
            return Err(Error::InvalidConfig);
        }

        if self.breaker_threshold <= 0 {
            return Err(Error::InvalidConfig);
        }

        if self.max_traversal_steps == 0 || self.max_pool_scan == 0 || self.upline_depth == 0 {
            return Err(Error::InvalidConfig);
        }

        Ok(())
    }

    /// Withdrawable share for an account with `direct_referrals` sponsees
    pub fn withdraw_rate_bps(&self, direct_referrals: u32) -> u32 {
        let mut rate = 0;
        for tier in self.withdraw_tiers.iter() {
            if direct_referrals >= tier.min_direct_referrals {
                rate = tier.withdraw_bps;
            }
        }
        rate
    }

    /// Highest rank the counts qualify for
    pub fn rank_for(&self, direct_referrals: u32, team_size: u32) -> LeaderRank {
        if direct_referrals >= self.silver_star.min_direct_referrals
            && team_size >= self.silver_star.min_team_size
        {
            LeaderRank::SilverStar
        } else if direct_referrals >= self.shining_star.min_direct_referrals
            && team_size >= self.shining_star.min_team_size
        {
            LeaderRank::ShiningStar
        } else {
            LeaderRank::Unranked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let env = Env::default();
        assert_eq!(EngineConfig::default_config(&env).validate(), Ok(()));
    }

    #[test]
    fn test_withdraw_rate_tiers() {
        let env = Env::default();
        let config = EngineConfig::default_config(&env);

        assert_eq!(config.withdraw_rate_bps(0), 7_000);
        assert_eq!(config.withdraw_rate_bps(4), 7_000);
        assert_eq!(config.withdraw_rate_bps(5), 7_500);
        assert_eq!(config.withdraw_rate_bps(19), 7_500);
        assert_eq!(config.withdraw_rate_bps(20), 8_000);
        assert_eq!(config.withdraw_rate_bps(500), 8_000);
    }

    #[test]
    fn test_rank_thresholds() {
        let env = Env::default();
        let config = EngineConfig::default_config(&env);

        assert_eq!(config.rank_for(10, 249), LeaderRank::Unranked);
        assert_eq!(config.rank_for(9, 250), LeaderRank::Unranked);
        assert_eq!(config.rank_for(10, 250), LeaderRank::ShiningStar);
        // Silver star needs no direct referrals
        assert_eq!(config.rank_for(0, 500), LeaderRank::SilverStar);
    }

    #[test]
    fn test_rejects_unordered_tiers() {
        let env = Env::default();
        let mut config = EngineConfig::default_config(&env);
        config.withdraw_tiers = vec![
            &env,
            WithdrawTier {
                min_direct_referrals: 0,
                withdraw_bps: 7_000,
            },
            WithdrawTier {
                min_direct_referrals: 0,
                withdraw_bps: 8_000,
            },
        ];
        assert_eq!(config.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_rejects_zero_budgets() {
        let env = Env::default();
        let mut config = EngineConfig::default_config(&env);
        config.max_pool_scan = 0;
        assert_eq!(config.validate(), Err(Error::InvalidConfig));
    }
}
