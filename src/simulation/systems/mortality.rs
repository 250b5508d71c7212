//! Dying phase: mortality draws against the selected life table (crisis
//! multiplier applied in crisis years), death bookkeeping, aging, and
//! cleanup of emptied households.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::simulation::components::{Demog, Kin, Marital, Residence, Sex, Vital};
use crate::simulation::delete_empty_households;
use crate::simulation::events::{EventLog, SimEvent};
use crate::simulation::remove_from_household;
use crate::simulation::resources::{
    EnginePhase, SimClock, SimRng, SimulationConfig, Tables, TickCounters, enter_phase,
};
use crate::simulation::tables::crisis_adjusted;

pub fn mortality_system(world: &mut World) {
    enter_phase(world, &[EnginePhase::Reproducing], EnginePhase::Dying);

    let config = world.resource::<SimulationConfig>().clone();
    let clock = *world.resource::<SimClock>();
    let crisis = clock.is_crisis_year(config.crisis_recurrence);

    // Phase-entry snapshot of the living.
    let living: Vec<(Entity, u32, Sex)> = {
        let mut query = world.query::<(Entity, &Demog, &Vital)>();
        let mut rows: Vec<_> = query
            .iter(world)
            .filter(|(_, _, vital)| vital.alive)
            .map(|(entity, demog, _)| (entity, demog.age, demog.sex))
            .collect();
        rows.sort_unstable_by_key(|(entity, _, _)| *entity);
        rows
    };

    // One independent mortality trial per living individual.
    let tables = world.resource::<Tables>().clone();
    let deaths: Vec<Entity> = world.resource_scope(|_, mut rng: Mut<SimRng>| {
        living
            .iter()
            .filter(|&&(_, age, sex)| {
                let mut q = tables.life.annual_mortality(sex, age);
                if crisis {
                    q = crisis_adjusted(q, config.crisis_mortality_multiplier);
                }
                rng.0.gen_range(0.0..1.0) < q
            })
            .map(|&(entity, _, _)| entity)
            .collect()
    });

    // Every individual alive at phase entry ages one year, whether or not
    // they died this tick; the recorded age at death is the incremented age.
    for &(entity, _, _) in &living {
        if let Some(mut demog) = world.get_mut::<Demog>(entity) {
            demog.age += 1;
        }
    }

    for &entity in &deaths {
        let demog = *world.get::<Demog>(entity).expect("dead entity has Demog");
        let kin = *world.get::<Kin>(entity).expect("dead entity has Kin");
        let marital = *world.get::<Marital>(entity).expect("dead entity has Marital");

        {
            let mut vital = world.get_mut::<Vital>(entity).expect("Vital");
            assert!(vital.alive, "mortality drew an already-dead individual");
            vital.alive = false;
            vital.age_at_death = Some(demog.age);
        }

        {
            let mut counters = world.resource_mut::<TickCounters>();
            counters.deaths += 1;
            counters.death_age_sum += demog.age;
            if demog.sex == Sex::Female && demog.age >= config.min_marriage_age {
                counters.adult_female_deaths += 1;
                counters.dead_female_children_sum += kin.children_born;
                counters.dead_female_spouse_sum += marital.marriages;
                if marital.marriages == 0 {
                    counters.spinster_deaths += 1;
                }
            }
        }

        // Widow the surviving spouse and sever the link on both sides.
        if let Some(spouse) = marital.spouse {
            if let Some(mut spouse_marital) = world.get_mut::<Marital>(spouse) {
                spouse_marital.spouse = None;
                spouse_marital.widowed = true;
            }
            if let Some(mut own_marital) = world.get_mut::<Marital>(entity) {
                own_marital.spouse = None;
            }
        }

        for parent in [kin.mother, kin.father].into_iter().flatten() {
            if let Some(mut parent_kin) = world.get_mut::<Kin>(parent) {
                parent_kin.children_alive = parent_kin.children_alive.saturating_sub(1);
            }
        }

        // The dead stay in the store for post-mortem statistics but leave
        // their household.
        remove_from_household(world, entity);
        if let Some(mut residence) = world.get_mut::<Residence>(entity) {
            residence.household = None;
        }
    }

    delete_empty_households(world);

    if crisis {
        let deaths_this_tick = deaths.len() as u32;
        world.resource_mut::<EventLog>().push(SimEvent::crisis_year(
            clock.tick,
            config.crisis_mortality_multiplier,
            deaths_this_tick,
        ));
    }
}
