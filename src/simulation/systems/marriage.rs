//! Marrying phase: hazard draws for unmarried females, uniform husband
//! selection, spouse linking, and household merge/creation.

use std::collections::HashSet;

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::simulation::components::{Demog, Household, Marital, Residence, Service, Sex, Vital};
use crate::simulation::resources::{
    EnginePhase, SimRng, Tables, TickCounters, enter_phase,
};
use crate::simulation::{add_to_household, delete_empty_households, remove_from_household};

pub fn marriage_system(world: &mut World) {
    enter_phase(world, &[EnginePhase::Recruiting], EnginePhase::Marrying);

    let tables = world.resource::<Tables>().clone();

    // Phase-entry snapshots of brides and the groom pool.
    let (brides, grooms) = {
        let mut query = world.query::<(Entity, &Demog, &Vital, &Marital, &Service)>();
        let mut brides = Vec::new();
        let mut grooms = Vec::new();
        for (entity, demog, vital, marital, service) in query.iter(world) {
            if !vital.alive || marital.spouse.is_some() {
                continue;
            }
            match demog.sex {
                Sex::Female if demog.age >= tables.marriage.min_age => {
                    brides.push((entity, demog.age, marital.marriages));
                }
                // Recruited males (service > 0) are out of the marriage pool.
                Sex::Male if service.years == 0 => {
                    grooms.push((entity, demog.age));
                }
                _ => {}
            }
        }
        brides.sort_unstable_by_key(|(entity, _, _)| *entity);
        grooms.sort_unstable_by_key(|(entity, _)| *entity);
        (brides, grooms)
    };

    // The one sanctioned live read in a phase: husbands claimed earlier in
    // this same pass are excluded so two females cannot marry the same male
    // in one tick. Cleared when the phase ends.
    let mut claimed: HashSet<Entity> = HashSet::new();

    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        for (bride, bride_age, prior_marriages) in brides {
            let probability = tables.marriage.annual_probability(bride_age, prior_marriages);
            if probability <= 0.0 || rng.0.gen_range(0.0..1.0) >= probability {
                continue;
            }

            // Uniform pick over the eligible set at the instant of the draw.
            let eligible: Vec<Entity> = grooms
                .iter()
                .filter(|(groom, groom_age)| {
                    !claimed.contains(groom)
                        && tables.marriage.acceptable_gap(bride_age, *groom_age, false)
                })
                .map(|(groom, _)| *groom)
                .collect();
            // No eligible husband is an expected outcome; the female stays
            // unmarried and is reconsidered next tick.
            if eligible.is_empty() {
                continue;
            }
            let groom = eligible[rng.0.gen_range(0..eligible.len())];
            claimed.insert(groom);

            let groom_was_widowed = world
                .get::<Marital>(groom)
                .map(|marital| marital.widowed)
                .unwrap_or(false);

            {
                let mut bride_marital = world.get_mut::<Marital>(bride).expect("bride Marital");
                bride_marital.spouse = Some(groom);
                bride_marital.widowed = false;
                bride_marital.marriages += 1;
            }
            {
                let mut groom_marital = world.get_mut::<Marital>(groom).expect("groom Marital");
                groom_marital.spouse = Some(bride);
                groom_marital.widowed = false;
                groom_marital.marriages += 1;
            }
            world.resource_mut::<TickCounters>().marriages += 1;

            let groom_household = world
                .get::<Residence>(groom)
                .and_then(|residence| residence.household);
            if groom_was_widowed && groom_household.is_some() {
                // The bride moves into the widower's existing household.
                remove_from_household(world, bride);
                let household = groom_household.expect("checked above");
                add_to_household(world, household, bride);
                if let Some(mut residence) = world.get_mut::<Residence>(bride) {
                    residence.household = Some(household);
                }
            } else {
                // A fresh household containing exactly the couple.
                remove_from_household(world, bride);
                remove_from_household(world, groom);
                let household = world
                    .spawn(Household {
                        members: [bride, groom].into_iter().collect(),
                    })
                    .id();
                for member in [bride, groom] {
                    if let Some(mut residence) = world.get_mut::<Residence>(member) {
                        residence.household = Some(household);
                    }
                }
            }
        }
    });

    // Moving spouses out may have emptied their old households.
    delete_empty_households(world);
}
