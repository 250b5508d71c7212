//! Entity component definitions for individuals and households.

use std::collections::BTreeSet;

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Fixed-at-birth and slowly-changing demographic attributes.
#[derive(Debug, Clone, Copy, Component, Serialize, Deserialize)]
pub struct Demog {
    pub age: u32,
    pub sex: Sex,
}

/// Life status. The dead are flagged rather than despawned so post-mortem
/// statistics stay available; `age_at_death` is set exactly once.
#[derive(Debug, Clone, Copy, Component, Serialize, Deserialize)]
pub struct Vital {
    pub alive: bool,
    pub age_at_death: Option<u32>,
}

impl Vital {
    pub fn newborn() -> Self {
        Self {
            alive: true,
            age_at_death: None,
        }
    }
}

/// Annual birth probability, female-only, refreshed from age every tick.
#[derive(Debug, Clone, Copy, Component, Serialize, Deserialize, Default)]
pub struct Fertility {
    pub annual: f64,
}

/// Military service counter: 0 = not recruited, 1..N = years served.
#[derive(Debug, Clone, Copy, Component, Serialize, Deserialize, Default)]
pub struct Service {
    pub years: u32,
}

/// Marriage state. The spouse link is mutual: while both parties are alive,
/// `a.spouse == Some(b)` implies `b.spouse == Some(a)`.
#[derive(Debug, Clone, Copy, Component, Default)]
pub struct Marital {
    pub spouse: Option<Entity>,
    pub widowed: bool,
    pub marriages: u32,
}

/// Parent back-references (informational, set at birth) plus child tallies.
#[derive(Debug, Clone, Copy, Component, Default)]
pub struct Kin {
    pub mother: Option<Entity>,
    pub father: Option<Entity>,
    pub children_born: u32,
    pub children_alive: u32,
}

/// Reverse side of household membership: at most one household while alive.
#[derive(Debug, Clone, Copy, Component, Default)]
pub struct Residence {
    pub household: Option<Entity>,
}

/// A co-residing group. Created at marriage, deleted once its membership
/// becomes empty. Member order is irrelevant; a BTreeSet keeps iteration
/// reproducible.
#[derive(Debug, Clone, Component, Default)]
pub struct Household {
    pub members: BTreeSet<Entity>,
}
