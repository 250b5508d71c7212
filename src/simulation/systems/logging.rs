//! Colorized per-tick pulse logging for quick CLI scanning.

use bevy_ecs::prelude::*;
use colored::{Color, Colorize};
use tracing::info;

use crate::simulation::components::{Demog, Marital, Service, Vital};
use crate::simulation::events::EventLog;
use crate::simulation::resources::{SimClock, SimulationConfig, TickCounters};

fn badge(label: &str, color: Color) -> String {
    format!("[{}]", label).color(color).to_string()
}

fn event_color(category: &str) -> Color {
    match category {
        "Crisis" => Color::BrightRed,
        "Extinction" => Color::Red,
        "Run" => Color::BrightBlue,
        _ => Color::White,
    }
}

pub fn pulse_logging_system(
    clock: Res<SimClock>,
    config: Res<SimulationConfig>,
    counters: Res<TickCounters>,
    events: Res<EventLog>,
    people: Query<(&Vital, &Marital, &Service), With<Demog>>,
) {
    let mut living = 0u32;
    let mut couples = 0u32;
    let mut recruits = 0u32;
    for (vital, marital, service) in people.iter() {
        if !vital.alive {
            continue;
        }
        living += 1;
        if marital.spouse.is_some() {
            couples += 1;
        }
        if service.years > 0 {
            recruits += 1;
        }
    }
    couples /= 2;

    let tick_badge = badge(&format!("Tick {}", clock.tick), Color::BrightBlack);
    let crisis_badge = if clock.is_crisis_year(config.crisis_recurrence) {
        badge("CRISIS", Color::BrightRed)
    } else {
        String::new()
    };
    info!(
        "{} {} pop {} | births {} | deaths {} | marriages {} | couples {} | recruits {}",
        tick_badge,
        crisis_badge,
        living.to_string().bold(),
        counters.births.to_string().color(Color::BrightGreen),
        counters.deaths.to_string().color(Color::BrightRed),
        counters.marriages.to_string().color(Color::BrightMagenta),
        couples,
        recruits.to_string().color(Color::BrightCyan),
    );

    for event in events.for_tick(clock.tick) {
        let category_badge = badge(event.category(), event_color(event.category()));
        info!("{} {}", category_badge, event.headline());
    }
}
