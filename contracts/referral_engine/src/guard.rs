use soroban_sdk::{contracttype, log, Env, Symbol};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::events::BoundReachedEvent;
use crate::storage::{Account, BreakerState, Storage};

/// Which bounded walk ran out of budget
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalkKind {
    Placement = 0,
    TeamSize = 1,
    SponsorChain = 2,
    PoolScan = 3,
}

/// Step budget carried by every traversal.
///
/// A walk asks for a step before each node visit. Once the budget is spent
/// the walk stops where it is and the operation completes with whatever it
/// already applied.
pub struct TraversalBudget {
    kind: WalkKind,
    limit: u32,
    remaining: u32,
    exhausted: bool,
}

impl TraversalBudget {
    pub fn new(kind: WalkKind, limit: u32) -> Self {
        TraversalBudget {
            kind,
            limit,
            remaining: limit,
            exhausted: false,
        }
    }

    /// Consume one step. Returns false when the budget is spent.
    pub fn step(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Publish the bound signal if this walk was cut short
    pub fn report(&self, env: &Env) {
        if !self.exhausted() {
            return;
        }

        log!(env, "traversal bound reached", self.kind as u32, self.limit);

        env.events().publish(
            (Symbol::new(env, "bound_reached"), self.kind),
            BoundReachedEvent {
                walk: self.kind,
                limit: self.limit,
                step: env.ledger().sequence(),
            },
        );
    }
}

/// Reject a second action from the same account within one ledger step
///
/// # Errors
/// - `ReplayRejected`: account already acted in the current step
pub fn check_replay(env: &Env, account: &Account) -> Result<(), Error> {
    if account.last_active_step == env.ledger().sequence() {
        return Err(Error::ReplayRejected);
    }
    Ok(())
}

/// Current breaker window, rolled over if it has expired
pub fn breaker_status(env: &Env, config: &EngineConfig) -> BreakerState {
    let step = env.ledger().sequence();
    let mut breaker = Storage::get_breaker(env).unwrap_or(BreakerState {
        window_start: step,
        volume: 0,
        threshold: config.breaker_threshold,
    });

    if step.saturating_sub(breaker.window_start) >= config.breaker_window {
        breaker.window_start = step;
        breaker.volume = 0;
    }
    breaker.threshold = config.breaker_threshold;
    breaker
}

/// Add a withdrawal to the rolling window volume
///
/// # Errors
/// - `CircuitBreakerTripped`: the window volume would exceed the threshold
/// - `InvalidAmount`: overflow
pub fn record_withdrawal(env: &Env, config: &EngineConfig, amount: i128) -> Result<(), Error> {
    let mut breaker = breaker_status(env, config);

    let volume = breaker
        .volume
        .checked_add(amount)
        .ok_or(Error::InvalidAmount)?;

    if volume > breaker.threshold {
        log!(
            env,
            "circuit breaker tripped",
            amount,
            breaker.threshold,
            breaker.volume
        );
        return Err(Error::CircuitBreakerTripped);
    }

    breaker.volume = volume;
    Storage::set_breaker(env, &breaker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_counts_down() {
        let mut budget = TraversalBudget::new(WalkKind::SponsorChain, 3);

        assert!(budget.step());
        assert!(budget.step());
        assert!(budget.step());
        assert!(!budget.exhausted());

        assert!(!budget.step());
        assert!(budget.exhausted());
    }

    #[test]
    fn test_zero_budget_is_exhausted_on_first_step() {
        let mut budget = TraversalBudget::new(WalkKind::Placement, 0);

        assert!(!budget.step());
        assert!(budget.exhausted());
    }
}
