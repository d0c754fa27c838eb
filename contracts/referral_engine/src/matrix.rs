use soroban_sdk::{contracttype, vec, Address, Env, Vec};

use crate::config::EngineConfig;
use crate::guard::TraversalBudget;
use crate::storage::{Account, Storage};

/// A participant's two matrix slots
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatrixChildren {
    pub left: Option<Address>,
    pub right: Option<Address>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

/// An empty matrix slot: the node that owns it and which side
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub parent: Address,
    pub side: Side,
    /// True when both of the sponsor's own slots were taken
    pub spillover: bool,
}

/// Find the slot for a new entrant in the sponsor's binary subtree.
///
/// The sponsor's own left then right slot is used first. Once both are
/// taken, a breadth-first search runs over the sponsor's descendants,
/// starting with the child on the side named by `spillover_counter`. Each
/// depth is exhausted before the next, and within a depth the counter's
/// side comes first, so alternating the counter keeps both halves level.
///
/// Returns `None` if the budget runs out before an empty slot is found.
pub fn find_slot(env: &Env, sponsor: &Account, budget: &mut TraversalBudget) -> Option<Slot> {
    let (left, right) = match (&sponsor.matrix_left, &sponsor.matrix_right) {
        (None, _) => {
            return Some(Slot {
                parent: sponsor.participant.clone(),
                side: Side::Left,
                spillover: false,
            })
        }
        (Some(_), None) => {
            return Some(Slot {
                parent: sponsor.participant.clone(),
                side: Side::Right,
                spillover: false,
            })
        }
        (Some(left), Some(right)) => (left.clone(), right.clone()),
    };

    let mut queue: Vec<Address> = if sponsor.spillover_counter == 0 {
        vec![env, left, right]
    } else {
        vec![env, right, left]
    };

    let mut head = 0;
    while head < queue.len() {
        if !budget.step() {
            return None;
        }

        let node_id = queue.get(head)?;
        head += 1;
        let node = Storage::get_account(env, &node_id)?;

        match (node.matrix_left, node.matrix_right) {
            (None, _) => {
                return Some(Slot {
                    parent: node_id,
                    side: Side::Left,
                    spillover: true,
                })
            }
            (Some(_), None) => {
                return Some(Slot {
                    parent: node_id,
                    side: Side::Right,
                    spillover: true,
                })
            }
            (Some(child_left), Some(child_right)) => {
                queue.push_back(child_left);
                queue.push_back(child_right);
            }
        }
    }

    None
}

/// Link `child` into a slot's parent record
pub fn attach(parent: &mut Account, side: Side, child: &Address) {
    match side {
        Side::Left => parent.matrix_left = Some(child.clone()),
        Side::Right => parent.matrix_right = Some(child.clone()),
    }
}

/// Add one to `team_size` for every matrix ancestor, starting at `from`.
///
/// Leader rank is re-evaluated for each ancestor touched.
pub fn propagate_team_size(
    env: &Env,
    config: &EngineConfig,
    from: Option<Address>,
    budget: &mut TraversalBudget,
) {
    let mut cursor = from;
    while let Some(id) = cursor {
        if !budget.step() {
            break;
        }

        let Some(mut ancestor) = Storage::get_account(env, &id) else {
            break;
        };
        ancestor.team_size += 1;
        ancestor.leader_rank = config.rank_for(ancestor.direct_referrals, ancestor.team_size);
        Storage::set_account(env, &ancestor);

        cursor = ancestor.matrix_parent;
    }
}

/// Collect up to `depth` sponsors, starting at `from` and moving upward
pub fn sponsor_chain(
    env: &Env,
    from: Option<Address>,
    depth: u32,
    budget: &mut TraversalBudget,
) -> Vec<Address> {
    let mut chain = Vec::new(env);
    let mut cursor = from;

    while let Some(id) = cursor {
        if chain.len() >= depth || !budget.step() {
            break;
        }

        let Some(ancestor) = Storage::get_account(env, &id) else {
            break;
        };
        chain.push_back(id);
        cursor = ancestor.sponsor;
    }

    chain
}
