//! Shared resources: run configuration, clock, RNG, lookup tables, and
//! aggregate counters.

use anyhow::bail;
use bevy_ecs::prelude::{Resource, World};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::simulation::fertility::{FertilityBounds, FertilitySchedule};
use crate::simulation::nuptiality::MarriageModel;
use crate::simulation::tables::LifeTable;

/// All parameters of a run, fixed at setup. Deserializable so a JSON file
/// can drive a run; every field has a default matching the baseline model.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub initial_population: u32,
    pub life_table: String,
    /// Probability that a birth (or setup individual) is male.
    pub male_birth_ratio: f64,
    pub recruitment_rate: f64,
    pub crisis_mortality_multiplier: f64,
    /// Crisis recurrence period in years; 0 disables crisis years.
    pub crisis_recurrence: u32,
    pub remarriage_allowed: bool,
    pub min_marriage_age: u32,
    pub marriage_time_scale: f64,
    pub min_spouse_age_gap: i32,
    /// Upper age-gap bound used only for initial-population pairing.
    pub setup_max_age_gap: i32,
    pub fertility_modifier: f64,
    /// Stopping threshold: mothers at or above this many living children
    /// are excluded from reproduction draws.
    pub max_living_children: u32,
    pub tick_limit: u64,
    pub recruitment_warmup: u64,
    pub service_length: u32,
    pub fertility_bounds: FertilityBounds,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            initial_population: 200,
            life_table: "Woods 2007 South 25".to_string(),
            male_birth_ratio: 0.51,
            recruitment_rate: 0.0,
            crisis_mortality_multiplier: 1.0,
            crisis_recurrence: 0,
            remarriage_allowed: true,
            min_marriage_age: 15,
            marriage_time_scale: 0.45,
            min_spouse_age_gap: 0,
            setup_max_age_gap: 15,
            fertility_modifier: 1.0,
            max_living_children: 12,
            tick_limit: 200,
            recruitment_warmup: 100,
            service_length: 25,
            fertility_bounds: FertilityBounds::default(),
        }
    }
}

impl SimulationConfig {
    /// Fail-fast validation; no tick runs on a bad configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        LifeTable::by_name(&self.life_table)?;
        if self.initial_population == 0 {
            bail!("initial population must be positive");
        }
        if !(0.0..=1.0).contains(&self.male_birth_ratio) {
            bail!("male birth ratio {} outside [0,1]", self.male_birth_ratio);
        }
        if !(0.0..=0.2).contains(&self.recruitment_rate) {
            bail!("recruitment rate {} outside [0,0.2]", self.recruitment_rate);
        }
        if !(1.0..=5.0).contains(&self.crisis_mortality_multiplier) {
            bail!(
                "crisis mortality multiplier {} outside [1,5]",
                self.crisis_mortality_multiplier
            );
        }
        if self.crisis_recurrence > 100 {
            bail!(
                "crisis recurrence {} outside [0,100]",
                self.crisis_recurrence
            );
        }
        if !(12..=30).contains(&self.min_marriage_age) {
            bail!(
                "minimum marriage age {} outside [12,30]",
                self.min_marriage_age
            );
        }
        if !(self.marriage_time_scale > 0.0 && self.marriage_time_scale <= 1.0) {
            bail!(
                "marriage time scale {} outside (0,1]",
                self.marriage_time_scale
            );
        }
        if !(-5..=15).contains(&self.min_spouse_age_gap) {
            bail!(
                "minimum spouse age gap {} outside [-5,15]",
                self.min_spouse_age_gap
            );
        }
        if self.setup_max_age_gap < self.min_spouse_age_gap {
            bail!("setup age-gap cap below the minimum age gap");
        }
        if !(0.0..=1.0).contains(&self.fertility_modifier) {
            bail!(
                "fertility modifier {} outside [0,1]",
                self.fertility_modifier
            );
        }
        if self.max_living_children > 20 {
            bail!(
                "max living children {} outside [0,20]",
                self.max_living_children
            );
        }
        if self.tick_limit == 0 {
            bail!("tick limit must be positive");
        }
        if self.service_length == 0 {
            bail!("service length must be positive");
        }
        Ok(())
    }

    /// Build the immutable lookup tables this configuration selects.
    pub fn build_tables(&self) -> anyhow::Result<Tables> {
        Ok(Tables {
            life: LifeTable::by_name(&self.life_table)?,
            fertility: FertilitySchedule::new(self.fertility_bounds, self.fertility_modifier),
            marriage: MarriageModel {
                min_age: self.min_marriage_age,
                time_scale: self.marriage_time_scale,
                remarriage_allowed: self.remarriage_allowed,
                min_age_gap: self.min_spouse_age_gap,
                setup_max_age_gap: self.setup_max_age_gap,
            },
        })
    }
}

/// Immutable providers selected at configuration time and passed to the
/// engine explicitly (no global tables).
#[derive(Debug, Clone, Resource)]
pub struct Tables {
    pub life: LifeTable,
    pub fertility: FertilitySchedule,
    pub marriage: MarriageModel,
}

/// Simulation clock: current tick plus the crisis counter cycling modulo the
/// configured recurrence period.
#[derive(Debug, Clone, Copy, Resource, Serialize, Deserialize, Default)]
pub struct SimClock {
    pub tick: u64,
    pub crisis_counter: u32,
}

impl SimClock {
    pub fn advance(&mut self, crisis_recurrence: u32) {
        self.tick += 1;
        self.crisis_counter = if crisis_recurrence > 0 {
            (self.tick % u64::from(crisis_recurrence)) as u32
        } else {
            0
        };
    }

    /// A crisis year is any tick where the counter has wrapped to zero.
    pub fn is_crisis_year(&self, crisis_recurrence: u32) -> bool {
        crisis_recurrence > 0 && self.tick > 0 && self.crisis_counter == 0
    }
}

/// The run's single random stream; seeded from config so runs are
/// deterministic.
#[derive(Debug, Resource)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

/// Per-tick scalars, reset at the start of every tick after the previous
/// snapshot has been read.
#[derive(Debug, Clone, Copy, Resource, Default, Serialize)]
pub struct TickCounters {
    pub births: u32,
    pub deaths: u32,
    pub death_age_sum: u32,
    /// Deaths of females at or above the minimum marriage age, with the
    /// tallies read off them post mortem.
    pub adult_female_deaths: u32,
    pub dead_female_children_sum: u32,
    pub dead_female_spouse_sum: u32,
    pub spinster_deaths: u32,
    pub new_recruits: u32,
    pub marriages: u32,
}

impl TickCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cumulative totals across the run; the post-warm-up tallies feed the
/// end-of-run summary.
#[derive(Debug, Clone, Copy, Resource, Default, Serialize)]
pub struct RunTotals {
    pub births: u64,
    pub deaths: u64,
    pub post_warmup_female_deaths: u64,
    pub post_warmup_children_sum: u64,
    pub post_warmup_spouse_sum: u64,
    pub post_warmup_spinsters: u64,
    /// Living population at the end of the previous tick, for growth rates.
    pub previous_population: u32,
    pub extinction_logged: bool,
}

/// Engine phase marker. Transitions are strictly sequential; a transition
/// from the wrong phase is a programming defect and aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub enum EnginePhase {
    Setup,
    Reproducing,
    Dying,
    Recruiting,
    Marrying,
    TickComplete,
}

/// Assert the expected predecessor phase and enter `next`.
pub(crate) fn enter_phase(world: &mut World, allowed: &[EnginePhase], next: EnginePhase) {
    let mut phase = world.resource_mut::<EnginePhase>();
    assert!(
        allowed.contains(&*phase),
        "phase order violated: {:?} -> {next:?}",
        *phase
    );
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = SimulationConfig::default();
        config.recruitment_rate = 0.3;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.life_table = "not a table".into();
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.min_marriage_age = 31;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.marriage_time_scale = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.crisis_mortality_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn crisis_counter_cycles_with_the_clock() {
        let mut clock = SimClock::default();
        assert!(!clock.is_crisis_year(10));
        for _ in 0..9 {
            clock.advance(10);
            assert!(!clock.is_crisis_year(10));
        }
        clock.advance(10);
        assert_eq!(clock.tick, 10);
        assert!(clock.is_crisis_year(10));
        clock.advance(10);
        assert!(!clock.is_crisis_year(10));
        // Disabled recurrence never flags a crisis.
        assert!(!clock.is_crisis_year(0));
    }
}
