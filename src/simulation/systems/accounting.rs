//! Folds each tick's counters into the cumulative run totals and watches
//! for population extinction.

use bevy_ecs::prelude::*;

use crate::simulation::components::Vital;
use crate::simulation::events::{EventLog, SimEvent};
use crate::simulation::resources::{RunTotals, SimClock, SimulationConfig, TickCounters};

pub fn accounting_system(
    clock: Res<SimClock>,
    config: Res<SimulationConfig>,
    counters: Res<TickCounters>,
    mut totals: ResMut<RunTotals>,
    mut events: ResMut<EventLog>,
    vitals: Query<&Vital>,
) {
    totals.births += u64::from(counters.births);
    totals.deaths += u64::from(counters.deaths);

    // Post-warm-up female tallies feed the end-of-run averages.
    if clock.tick > config.recruitment_warmup {
        totals.post_warmup_female_deaths += u64::from(counters.adult_female_deaths);
        totals.post_warmup_children_sum += u64::from(counters.dead_female_children_sum);
        totals.post_warmup_spouse_sum += u64::from(counters.dead_female_spouse_sum);
        totals.post_warmup_spinsters += u64::from(counters.spinster_deaths);
    }

    let living = vitals.iter().filter(|vital| vital.alive).count() as u32;
    if living == 0 && !totals.extinction_logged {
        events.push(SimEvent::extinction(clock.tick, totals.previous_population));
        totals.extinction_logged = true;
    }
}
