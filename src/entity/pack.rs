//! Pack membership and the Alpha/Beta/Omega hierarchy
//!
//! A pack is nothing more than the set of agents sharing a `PackId`. At most
//! one member holds `Alpha`; when the Alpha leaves or dies the highest-ranked
//! remaining member (lowest id on ties) takes over.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::error::{BehaviorError, Result};
use crate::core::types::{EntityId, PackId};

/// Social rank inside a pack, ordered Omega < Beta < Alpha
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackRank {
    #[display(fmt = "Omega")]
    Omega,
    #[display(fmt = "Beta")]
    Beta,
    #[display(fmt = "Alpha")]
    Alpha,
}

impl PackRank {
    /// The next rank up, `None` at the ceiling
    pub fn promoted(self) -> Option<PackRank> {
        match self {
            PackRank::Omega => Some(PackRank::Beta),
            PackRank::Beta => Some(PackRank::Alpha),
            PackRank::Alpha => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackMembership {
    pub pack_id: PackId,
    pub rank: PackRank,
    /// Ticks until this member may share food again
    #[serde(default)]
    pub share_cooldown: u32,
}

impl PackMembership {
    /// A founder leads a freshly generated pack
    pub fn found() -> Self {
        Self {
            pack_id: PackId::new(),
            rank: PackRank::Alpha,
            share_cooldown: 0,
        }
    }

    pub fn joining(pack_id: PackId, rank: PackRank) -> Self {
        Self {
            pack_id,
            rank,
            share_cooldown: 0,
        }
    }

    pub fn is_alpha(&self) -> bool {
        self.rank == PackRank::Alpha
    }

    pub fn can_share(&self) -> bool {
        self.share_cooldown == 0
    }

    pub fn tick_cooldown(&mut self) {
        self.share_cooldown = self.share_cooldown.saturating_sub(1);
    }
}

/// Both sides belong to the same pack
pub fn are_packmates(a: Option<&PackMembership>, b: Option<&PackMembership>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.pack_id == b.pack_id,
        _ => false,
    }
}

/// Read/write access to pack memberships across the population
pub trait PackRoster {
    /// `None` if the agent does not exist, `Some(None)` if it has no pack
    fn membership(&self, id: EntityId) -> Option<Option<PackMembership>>;

    fn set_membership(&mut self, id: EntityId, membership: Option<PackMembership>);

    /// Living members of a pack with their ranks
    fn members_of(&self, pack: PackId) -> Vec<(EntityId, PackRank)>;
}

/// The member currently holding Alpha, lowest id first if the invariant was
/// ever broken by an external writer
pub fn alpha_of<R: PackRoster + ?Sized>(roster: &R, pack: PackId) -> Option<EntityId> {
    roster
        .members_of(pack)
        .into_iter()
        .filter(|(_, rank)| *rank == PackRank::Alpha)
        .map(|(id, _)| id)
        .min()
}

/// Make `follower` a member of `leader`'s pack.
///
/// The follower joins as Omega, or as Alpha when the pack has none. If the
/// follower was Alpha of another pack, that pack gets a successor.
pub fn join_pack_of<R: PackRoster + ?Sized>(
    roster: &mut R,
    follower: EntityId,
    leader: EntityId,
) -> Result<PackMembership> {
    let leader_pack = roster
        .membership(leader)
        .ok_or(BehaviorError::EntityNotFound(leader))?
        .ok_or(BehaviorError::NotPackMember(leader))?;
    let previous = roster
        .membership(follower)
        .ok_or(BehaviorError::EntityNotFound(follower))?;

    if let Some(current) = previous {
        if current.pack_id == leader_pack.pack_id {
            return Ok(current);
        }
    }

    let rank = if alpha_of(roster, leader_pack.pack_id).is_some() {
        PackRank::Omega
    } else {
        PackRank::Alpha
    };
    let joined = PackMembership::joining(leader_pack.pack_id, rank);
    roster.set_membership(follower, Some(joined));

    tracing::info!(
        "{:?} joined pack {:?} as {}",
        follower,
        leader_pack.pack_id,
        rank
    );

    if let Some(old) = previous {
        if old.is_alpha() {
            appoint_successor(roster, old.pack_id);
        }
    }

    Ok(joined)
}

/// Advance an agent exactly one rank.
///
/// Promoting to Alpha demotes the sitting Alpha to Beta so the pack keeps a
/// single leader. Promoting an Alpha is rejected and changes nothing.
pub fn promote<R: PackRoster + ?Sized>(roster: &mut R, agent: EntityId) -> Result<PackRank> {
    let membership = roster
        .membership(agent)
        .ok_or(BehaviorError::EntityNotFound(agent))?
        .ok_or(BehaviorError::NotPackMember(agent))?;

    let Some(next) = membership.rank.promoted() else {
        tracing::warn!("Rejected promotion of {:?}: already Alpha", agent);
        return Err(BehaviorError::InvalidRankTransition {
            agent,
            rank: membership.rank,
            reason: "already at the highest rank".into(),
        });
    };

    if next == PackRank::Alpha {
        if let Some(sitting) = alpha_of(roster, membership.pack_id) {
            if sitting != agent {
                if let Some(Some(mut prior)) = roster.membership(sitting) {
                    prior.rank = PackRank::Beta;
                    roster.set_membership(sitting, Some(prior));
                    tracing::info!(
                        "{:?} demoted to Beta in pack {:?}",
                        sitting,
                        membership.pack_id
                    );
                }
            }
        }
    }

    roster.set_membership(
        agent,
        Some(PackMembership {
            rank: next,
            ..membership
        }),
    );
    tracing::debug!("{:?} promoted to {}", agent, next);
    Ok(next)
}

/// Give a pack without an Alpha a new one: the highest-ranked member,
/// lowest id on ties. Returns the new Alpha, if any member remains.
pub fn appoint_successor<R: PackRoster + ?Sized>(roster: &mut R, pack: PackId) -> Option<EntityId> {
    let members = roster.members_of(pack);
    if members.iter().any(|(_, rank)| *rank == PackRank::Alpha) {
        return None;
    }
    let (heir, _) = members
        .into_iter()
        .max_by(|(a_id, a_rank), (b_id, b_rank)| a_rank.cmp(b_rank).then(b_id.cmp(a_id)))?;

    if let Some(Some(mut membership)) = roster.membership(heir) {
        membership.rank = PackRank::Alpha;
        roster.set_membership(heir, Some(membership));
        tracing::info!("{:?} succeeded as Alpha of pack {:?}", heir, pack);
        return Some(heir);
    }
    None
}
