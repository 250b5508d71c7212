//! Recruiting phase: service counters advance, veterans muster out, and new
//! recruits are drawn from unmarried military-age males. Inactive until the
//! clock passes the warm-up tick.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::simulation::components::{Demog, Marital, Service, Sex, Vital};
use crate::simulation::resources::{
    EnginePhase, SimClock, SimRng, SimulationConfig, TickCounters, enter_phase,
};

pub const RECRUITMENT_MIN_AGE: u32 = 18;
pub const RECRUITMENT_MAX_AGE: u32 = 25;

pub fn recruitment_system(world: &mut World) {
    enter_phase(world, &[EnginePhase::Dying], EnginePhase::Recruiting);

    let config = world.resource::<SimulationConfig>().clone();
    let tick = world.resource::<SimClock>().tick;
    if tick <= config.recruitment_warmup {
        // No draws while inactive, so the random stream is untouched and
        // runs differing only in recruitment rate stay identical here.
        return;
    }

    // Phase-entry snapshots: who is serving, and who can be enrolled.
    let (serving, candidates) = {
        let mut query = world.query::<(Entity, &Demog, &Vital, &Marital, &Service)>();
        let mut serving = Vec::new();
        let mut candidates = Vec::new();
        for (entity, demog, vital, marital, service) in query.iter(world) {
            if !vital.alive {
                continue;
            }
            if service.years > 0 {
                serving.push(entity);
            } else if demog.sex == Sex::Male
                && marital.spouse.is_none()
                && (RECRUITMENT_MIN_AGE..=RECRUITMENT_MAX_AGE).contains(&demog.age)
            {
                candidates.push(entity);
            }
        }
        serving.sort_unstable();
        candidates.sort_unstable();
        (serving, candidates)
    };

    // Advance before enrolment: recruits enrolled this tick hold state 1
    // for a full year and the counter never exceeds the service length.
    for entity in serving {
        if let Some(mut service) = world.get_mut::<Service>(entity) {
            service.years += 1;
            if service.years > config.service_length {
                service.years = 0;
            }
        }
    }

    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        for entity in candidates {
            if rng.0.gen_range(0.0..1.0) < config.recruitment_rate {
                if let Some(mut service) = world.get_mut::<Service>(entity) {
                    service.years = 1;
                }
                world.resource_mut::<TickCounters>().new_recruits += 1;
            }
        }
    });
}
