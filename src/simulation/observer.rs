//! Observer snapshot structures consumed by the external display and
//! reporting layer.

use serde::Serialize;

use crate::simulation::events::SimEvent;

/// Living population counted into fixed age brackets.
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct AgeBrackets {
    pub infants: u32,   // 0-4
    pub children: u32,  // 5-14
    pub youths: u32,    // 15-29
    pub adults: u32,    // 30-49
    pub seniors: u32,   // 50-69
    pub elders: u32,    // 70+
}

impl AgeBrackets {
    pub fn add(&mut self, age: u32) {
        match age {
            0..=4 => self.infants += 1,
            5..=14 => self.children += 1,
            15..=29 => self.youths += 1,
            30..=49 => self.adults += 1,
            50..=69 => self.seniors += 1,
            _ => self.elders += 1,
        }
    }
}

/// Per-tick aggregates exported after every tick.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ObserverSnapshot {
    pub tick: u64,
    pub crisis_year: bool,
    pub population: u32,
    pub deaths: u32,
    pub births: u32,
    pub age_brackets: AgeBrackets,
    pub unmarried_females: u32,
    pub military_age_males: u32,
    pub couples: u32,
    pub widowed: u32,
    pub recruits: u32,
    pub growth_pct: f64,
    pub mean_children_per_deceased_female: f64,
    pub mean_spouses_per_deceased_female: f64,
    pub annual_mortality_rate: f64,
    pub unmarried_rate_male: f64,
    pub unmarried_rate_female: f64,
    pub males_per_100_females: f64,
    pub events: Vec<SimEvent>,
}

/// Cumulative post-warm-up averages reported once the tick limit is reached.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_population: u32,
    pub total_births: u64,
    pub total_deaths: u64,
    pub mean_children_per_female: f64,
    pub mean_spouses_per_female: f64,
    pub spinster_rate: f64,
}
