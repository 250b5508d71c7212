//! Age-specific fertility schedule for married females.
//!
//! A fixed piecewise table over 5-year bands from age 15 to 49, scaled by a
//! configured modifier representing birth-spacing effects. The original
//! model's band conditions were written as strict `>` comparisons, which
//! shifts every band up by one year and drops age 15 entirely; both readings
//! are kept selectable via [`FertilityBounds`].

use serde::{Deserialize, Serialize};

/// Annual marital fertility by conventional band `[lower, upper]`.
const BASE_RATES: &[(u32, u32, f64)] = &[
    (15, 19, 0.28),
    (20, 24, 0.42),
    (25, 29, 0.40),
    (30, 34, 0.35),
    (35, 39, 0.28),
    (40, 44, 0.16),
    (45, 49, 0.04),
];

/// How band edges are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilityBounds {
    /// Faithful to the original's `age > lower && age <= upper` comparisons:
    /// age 15 is infertile, age 45 draws the 40-44 rate, age 49 is the last
    /// fertile age.
    #[default]
    Legacy,
    /// Conventional inclusive bands `[15,19] .. [45,49]`.
    Conventional,
}

#[derive(Debug, Clone)]
pub struct FertilitySchedule {
    bounds: FertilityBounds,
    modifier: f64,
}

impl FertilitySchedule {
    pub fn new(bounds: FertilityBounds, modifier: f64) -> Self {
        Self { bounds, modifier }
    }

    fn base_rate(&self, age: u32) -> f64 {
        match self.bounds {
            FertilityBounds::Conventional => BASE_RATES
                .iter()
                .find(|(lower, upper, _)| age >= *lower && age <= *upper)
                .map(|(_, _, rate)| *rate)
                .unwrap_or(0.0),
            FertilityBounds::Legacy => BASE_RATES
                .iter()
                .find(|(lower, upper, _)| age > *lower && age <= *upper + 1 && age <= 49)
                .map(|(_, _, rate)| *rate)
                .unwrap_or(0.0),
        }
    }

    /// Annual probability that a married female of `age` gives birth,
    /// already scaled by the configured fertility modifier.
    pub fn annual_birth_probability(&self, age: u32) -> f64 {
        self.base_rate(age) * self.modifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_outside_reproductive_span() {
        let schedule = FertilitySchedule::new(FertilityBounds::Conventional, 1.0);
        assert_eq!(schedule.annual_birth_probability(14), 0.0);
        assert_eq!(schedule.annual_birth_probability(50), 0.0);
        assert_eq!(schedule.annual_birth_probability(80), 0.0);
    }

    #[test]
    fn conventional_bands_are_inclusive() {
        let schedule = FertilitySchedule::new(FertilityBounds::Conventional, 1.0);
        assert_eq!(schedule.annual_birth_probability(15), 0.28);
        assert_eq!(schedule.annual_birth_probability(45), 0.04);
        assert_eq!(schedule.annual_birth_probability(49), 0.04);
    }

    #[test]
    fn legacy_bands_shift_by_one_year() {
        let schedule = FertilitySchedule::new(FertilityBounds::Legacy, 1.0);
        // Age 15 falls through every strict lower bound.
        assert_eq!(schedule.annual_birth_probability(15), 0.0);
        assert_eq!(schedule.annual_birth_probability(16), 0.28);
        // Age 45 still draws the 40-44 band rate.
        assert_eq!(schedule.annual_birth_probability(45), 0.16);
        assert_eq!(schedule.annual_birth_probability(46), 0.04);
        // The top band is delimited at 49 in both readings.
        assert_eq!(schedule.annual_birth_probability(49), 0.04);
        assert_eq!(schedule.annual_birth_probability(50), 0.0);
    }

    #[test]
    fn modifier_scales_every_band() {
        let schedule = FertilitySchedule::new(FertilityBounds::Conventional, 0.5);
        assert_eq!(schedule.annual_birth_probability(22), 0.21);
        let off = FertilitySchedule::new(FertilityBounds::Conventional, 0.0);
        for age in 0..=60 {
            assert_eq!(off.annual_birth_probability(age), 0.0);
        }
    }
}
