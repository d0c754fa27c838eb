use soroban_sdk::{contracttype, Address};

use crate::guard::WalkKind;
use crate::storage::PoolKind;

#[contracttype]
#[derive(Clone, Debug)]
pub struct RegisteredEvent {
    pub participant: Address,
    pub sponsor: Option<Address>,
    pub matrix_parent: Option<Address>,
    pub tier: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct UpgradedEvent {
    pub participant: Address,
    pub from_tier: u32,
    pub to_tier: u32,
    pub amount: i128,
}

/// Commission channel a credit came from
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channel {
    Direct = 0,
    Level = 1,
    Upline = 2,
    Pool = 3,
    Compound = 4,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CommissionEvent {
    pub recipient: Address,
    pub channel: Channel,
    pub credited: i128,
    /// Portion clamped by the earnings cap and routed to the community pool
    pub overflow: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CappedEvent {
    pub participant: Address,
    pub earnings_cap: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct WithdrawnEvent {
    pub participant: Address,
    pub requested: i128,
    pub paid: i128,
    pub fee: i128,
    pub reinvested: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CompoundedEvent {
    pub participant: Address,
    pub requested: i128,
    pub bonus: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct PoolDistributedEvent {
    pub pool: PoolKind,
    pub amount: i128,
    pub recipients_paid: u32,
    pub residual_to_reserve: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct BoundReachedEvent {
    pub walk: WalkKind,
    pub limit: u32,
    pub step: u32,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClubJoinedEvent {
    pub participant: Address,
    pub tier: u32,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct SweptEvent {
    pub to: Address,
    pub amount: i128,
}
