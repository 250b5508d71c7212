//! Empirical life tables as immutable banded lookup structures.
//!
//! Tables are defined as non-overlapping cohort breakpoints (0; 1-4; 5-9;
//! ...; 85+), each carrying a 5-year cohort mortality probability. The
//! per-year probability is the cohort probability divided by the band width
//! (4, 5, or an open-ended divisor for the terminal band); age 0 carries a
//! single-year probability directly.

use anyhow::bail;

use crate::simulation::components::Sex;

/// Effective width of the open-ended 85+ band when converting a cohort
/// probability to an annual one.
const OPEN_BAND_DIVISOR: f64 = 10.0;

/// Oldest age considered when sampling setup ages from survivorship.
pub const MAX_SETUP_AGE: u32 = 90;

/// Raw cohort table: `(inclusive upper age of band, cohort probability)`,
/// terminal band marked with `u32::MAX`.
type CohortSpec = &'static [(u32, f64)];

const WOODS_SOUTH_25: CohortSpec = &[
    (0, 0.30),
    (4, 0.24),
    (9, 0.09),
    (14, 0.065),
    (19, 0.085),
    (24, 0.105),
    (29, 0.115),
    (34, 0.125),
    (39, 0.135),
    (44, 0.145),
    (49, 0.16),
    (54, 0.185),
    (59, 0.22),
    (64, 0.28),
    (69, 0.36),
    (74, 0.46),
    (79, 0.57),
    (84, 0.70),
    (u32::MAX, 1.0),
];

const WOODS_SOUTH_30: CohortSpec = &[
    (0, 0.25),
    (4, 0.19),
    (9, 0.075),
    (14, 0.055),
    (19, 0.07),
    (24, 0.09),
    (29, 0.10),
    (34, 0.11),
    (39, 0.12),
    (44, 0.13),
    (49, 0.145),
    (54, 0.17),
    (59, 0.205),
    (64, 0.26),
    (69, 0.335),
    (74, 0.43),
    (79, 0.54),
    (84, 0.67),
    (u32::MAX, 1.0),
];

const WEST_4_MALE: CohortSpec = &[
    (0, 0.32),
    (4, 0.25),
    (9, 0.095),
    (14, 0.07),
    (19, 0.09),
    (24, 0.11),
    (29, 0.12),
    (34, 0.13),
    (39, 0.14),
    (44, 0.155),
    (49, 0.175),
    (54, 0.20),
    (59, 0.24),
    (64, 0.30),
    (69, 0.385),
    (74, 0.49),
    (79, 0.60),
    (84, 0.72),
    (u32::MAX, 1.0),
];

const WEST_4_FEMALE: CohortSpec = &[
    (0, 0.28),
    (4, 0.24),
    (9, 0.09),
    (14, 0.068),
    (19, 0.088),
    (24, 0.108),
    (29, 0.12),
    (34, 0.128),
    (39, 0.134),
    (44, 0.14),
    (49, 0.15),
    (54, 0.175),
    (59, 0.21),
    (64, 0.27),
    (69, 0.35),
    (74, 0.45),
    (79, 0.56),
    (84, 0.69),
    (u32::MAX, 1.0),
];

/// Table identifiers accepted by [`LifeTable::by_name`].
pub const AVAILABLE_TABLES: &[&str] = &[
    "Woods 2007 South 25",
    "Woods 2007 South 30",
    "Coale-Demeny West 4",
];

/// Ordered list of `(inclusive upper bound, annual rate)` pairs, built once
/// from a cohort spec and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BandedRates {
    bands: Vec<(u32, f64)>,
}

impl BandedRates {
    fn from_cohorts(spec: CohortSpec) -> anyhow::Result<Self> {
        if spec.first().map(|b| b.0) != Some(0) {
            bail!("life table must start with a single-year age-0 band");
        }
        if spec.last().map(|b| b.0) != Some(u32::MAX) {
            bail!("life table must end with an open terminal band");
        }
        let mut bands = Vec::with_capacity(spec.len());
        let mut lower = 0u32;
        for &(upper, cohort_q) in spec {
            if !(0.0..=1.0).contains(&cohort_q) {
                bail!("cohort probability {cohort_q} outside [0,1]");
            }
            if upper != u32::MAX && upper < lower {
                bail!("life table bands out of order at upper bound {upper}");
            }
            let width = if upper == 0 {
                1.0
            } else if upper == u32::MAX {
                OPEN_BAND_DIVISOR
            } else {
                f64::from(upper - lower + 1)
            };
            bands.push((upper, cohort_q / width));
            lower = upper.saturating_add(1);
        }
        Ok(Self { bands })
    }

    /// Annual rate for `age`; the terminal band covers everything above the
    /// last finite bound, so every age is covered.
    pub fn annual(&self, age: u32) -> f64 {
        self.bands
            .iter()
            .find(|(upper, _)| age <= *upper)
            .map(|(_, rate)| *rate)
            .unwrap_or_else(|| self.bands.last().map(|(_, r)| *r).unwrap_or(1.0))
    }
}

/// A selected life table. Unisex tables hold the same banded rates for both
/// sexes; sex-specific tables hold two parallel sets.
#[derive(Debug, Clone)]
pub struct LifeTable {
    pub name: &'static str,
    male: BandedRates,
    female: BandedRates,
}

impl LifeTable {
    /// Resolve a configured identifier. Unknown names are configuration
    /// errors and are rejected before a run starts.
    pub fn by_name(name: &str) -> anyhow::Result<Self> {
        let build = |spec| BandedRates::from_cohorts(spec);
        let table = match name {
            "Woods 2007 South 25" => Self {
                name: "Woods 2007 South 25",
                male: build(WOODS_SOUTH_25)?,
                female: build(WOODS_SOUTH_25)?,
            },
            "Woods 2007 South 30" => Self {
                name: "Woods 2007 South 30",
                male: build(WOODS_SOUTH_30)?,
                female: build(WOODS_SOUTH_30)?,
            },
            "Coale-Demeny West 4" => Self {
                name: "Coale-Demeny West 4",
                male: build(WEST_4_MALE)?,
                female: build(WEST_4_FEMALE)?,
            },
            other => bail!(
                "unknown life table {other:?}; available tables: {}",
                AVAILABLE_TABLES.join(", ")
            ),
        };
        Ok(table)
    }

    /// Annual probability of dying between `age` and `age + 1`.
    pub fn annual_mortality(&self, sex: Sex, age: u32) -> f64 {
        match sex {
            Sex::Male => self.male.annual(age),
            Sex::Female => self.female.annual(age),
        }
    }

    /// Survivorship curve l(x) for ages `0..=MAX_SETUP_AGE`, averaged over
    /// the sexes. Used as the stationary age distribution when seeding the
    /// initial population.
    pub fn stationary_weights(&self) -> Vec<f64> {
        let mut weights = Vec::with_capacity(MAX_SETUP_AGE as usize + 1);
        let mut survivors = 1.0f64;
        for age in 0..=MAX_SETUP_AGE {
            weights.push(survivors);
            let q = (self.male.annual(age) + self.female.annual(age)) / 2.0;
            survivors *= 1.0 - q.min(1.0);
        }
        weights
    }
}

/// Apply the crisis-year severity multiplier to a looked-up probability.
pub fn crisis_adjusted(q: f64, multiplier: f64) -> f64 {
    (q * multiplier).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_zero_is_single_year_probability() {
        let table = LifeTable::by_name("Woods 2007 South 25").unwrap();
        assert_eq!(table.annual_mortality(Sex::Male, 0), 0.30);
    }

    #[test]
    fn band_widths_divide_cohort_probabilities() {
        let table = LifeTable::by_name("Woods 2007 South 25").unwrap();
        // 1-4 band: width 4.
        assert!((table.annual_mortality(Sex::Female, 3) - 0.24 / 4.0).abs() < 1e-12);
        // 20-24 band: width 5.
        assert!((table.annual_mortality(Sex::Male, 22) - 0.105 / 5.0).abs() < 1e-12);
        // Terminal band: open-ended divisor.
        assert!((table.annual_mortality(Sex::Male, 97) - 1.0 / OPEN_BAND_DIVISOR).abs() < 1e-12);
    }

    #[test]
    fn covers_all_ages_without_gaps() {
        for name in AVAILABLE_TABLES {
            let table = LifeTable::by_name(name).unwrap();
            for age in 0..=95 {
                let q = table.annual_mortality(Sex::Female, age);
                assert!((0.0..=1.0).contains(&q), "{name} age {age} gave {q}");
            }
        }
    }

    #[test]
    fn sex_specific_table_diverges_by_sex() {
        let table = LifeTable::by_name("Coale-Demeny West 4").unwrap();
        assert!(table.annual_mortality(Sex::Male, 30) > table.annual_mortality(Sex::Female, 30));
    }

    #[test]
    fn unknown_table_is_rejected() {
        assert!(LifeTable::by_name("Woods 2007 East 99").is_err());
    }

    #[test]
    fn crisis_multiplier_scales_and_clamps() {
        assert!((crisis_adjusted(0.02, 3.0) - 0.06).abs() < 1e-12);
        assert_eq!(crisis_adjusted(0.5, 5.0), 1.0);
    }

    #[test]
    fn stationary_weights_are_monotone_decreasing() {
        let table = LifeTable::by_name("Woods 2007 South 25").unwrap();
        let weights = table.stationary_weights();
        assert_eq!(weights.len(), MAX_SETUP_AGE as usize + 1);
        for pair in weights.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(weights[0] == 1.0);
    }
}
