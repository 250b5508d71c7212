//! Reproducing phase: refresh fertility probabilities and draw births for
//! married females under the stopping threshold.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::simulation::add_to_household;
use crate::simulation::components::{
    Demog, Fertility, Kin, Marital, Residence, Service, Sex, Vital,
};
use crate::simulation::resources::{
    EnginePhase, SimRng, SimulationConfig, Tables, TickCounters, enter_phase,
};

pub fn reproduction_system(world: &mut World) {
    enter_phase(
        world,
        &[EnginePhase::Setup, EnginePhase::TickComplete],
        EnginePhase::Reproducing,
    );

    // Refresh every living female's fertility probability from age.
    let females: Vec<(Entity, u32)> = {
        let mut query = world.query::<(Entity, &Demog, &Vital, &Fertility)>();
        let mut rows: Vec<_> = query
            .iter(world)
            .filter(|(_, _, vital, _)| vital.alive)
            .map(|(entity, demog, _, _)| (entity, demog.age))
            .collect();
        rows.sort_unstable_by_key(|(entity, _)| *entity);
        rows
    };
    {
        let tables = world.resource::<Tables>().clone();
        for &(entity, age) in &females {
            if let Some(mut fertility) = world.get_mut::<Fertility>(entity) {
                fertility.annual = tables.fertility.annual_birth_probability(age);
            }
        }
    }

    // Phase-entry snapshot of eligible mothers: married, living, under the
    // stopping threshold.
    let max_children = world.resource::<SimulationConfig>().max_living_children;
    let mothers: Vec<(Entity, Entity, f64)> = {
        let mut query = world.query::<(Entity, &Vital, &Fertility, &Marital, &Kin)>();
        let mut rows: Vec<_> = query
            .iter(world)
            .filter(|(_, vital, _, marital, kin)| {
                vital.alive && marital.spouse.is_some() && kin.children_alive < max_children
            })
            .map(|(entity, _, fertility, marital, _)| {
                (
                    entity,
                    marital.spouse.expect("filtered on married"),
                    fertility.annual,
                )
            })
            .collect();
        rows.sort_unstable_by_key(|(entity, _, _)| *entity);
        rows
    };

    let male_ratio = world.resource::<SimulationConfig>().male_birth_ratio;
    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        for (mother, father, birth_probability) in mothers {
            if birth_probability <= 0.0 || rng.0.gen_range(0.0..1.0) >= birth_probability {
                continue;
            }

            let sex = if rng.0.gen_bool(male_ratio) {
                Sex::Male
            } else {
                Sex::Female
            };
            let household = world
                .get::<Residence>(mother)
                .and_then(|residence| residence.household);
            assert!(
                household.is_some(),
                "married mother {mother:?} has no household"
            );

            let mut child = world.spawn((
                Demog { age: 0, sex },
                Vital::newborn(),
                Marital::default(),
                Service::default(),
                Kin {
                    mother: Some(mother),
                    father: Some(father),
                    ..Default::default()
                },
                Residence { household },
            ));
            if sex == Sex::Female {
                child.insert(Fertility::default());
            }
            let child = child.id();
            if let Some(household) = household {
                add_to_household(world, household, child);
            }

            for parent in [mother, father] {
                if let Some(mut kin) = world.get_mut::<Kin>(parent) {
                    kin.children_born += 1;
                    kin.children_alive += 1;
                }
            }
            world.resource_mut::<TickCounters>().births += 1;
        }
    });
}
