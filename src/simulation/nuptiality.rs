//! First-marriage hazard (Coale's age pattern of marriage) and remarriage
//! policy, plus husband-eligibility rules.

/// Coale age-pattern-of-marriage hazard for a never-married female.
///
/// `a0` is the minimum marriage age and `k` the time-scale factor; smaller
/// `k` compresses the marriage-age distribution.
pub fn coale_hazard(age: u32, a0: u32, k: f64) -> f64 {
    if age < a0 {
        return 0.0;
    }
    let x = f64::from(age - a0);
    (0.174 / k) * (-4.411 * ((-0.309 / k) * x).exp()).exp()
}

#[derive(Debug, Clone)]
pub struct MarriageModel {
    pub min_age: u32,
    pub time_scale: f64,
    pub remarriage_allowed: bool,
    /// Minimum husband-minus-wife age gap; negative means the wife may be
    /// older by up to that many years.
    pub min_age_gap: i32,
    /// Upper gap bound applied only when pairing the initial population.
    /// The steady-state marrying phase has no upper bound.
    pub setup_max_age_gap: i32,
}

impl MarriageModel {
    /// Annual probability that a currently-unmarried female marries.
    pub fn annual_probability(&self, age: u32, prior_marriages: u32) -> f64 {
        if age < self.min_age {
            return 0.0;
        }
        if prior_marriages > 0 {
            // Remarriage is either disallowed outright or grants immediate
            // eligibility.
            return if self.remarriage_allowed { 1.0 } else { 0.0 };
        }
        coale_hazard(age, self.min_age, self.time_scale)
    }

    /// Probability that a female of `age` has ever married, integrated from
    /// the hazard over `min_age..age`. Used when pairing the setup
    /// population.
    pub fn ever_married_by(&self, age: u32) -> f64 {
        if age <= self.min_age {
            return 0.0;
        }
        let mut unmarried = 1.0f64;
        for year in self.min_age..age {
            unmarried *= 1.0 - coale_hazard(year, self.min_age, self.time_scale);
        }
        1.0 - unmarried
    }

    /// Whether a husband of `husband_age` is acceptable for a wife of
    /// `wife_age`. `setup` additionally enforces the initial-pairing cap.
    pub fn acceptable_gap(&self, wife_age: u32, husband_age: u32, setup: bool) -> bool {
        let gap = i64::from(husband_age) - i64::from(wife_age);
        if gap < i64::from(self.min_age_gap) {
            return false;
        }
        !setup || gap <= i64::from(self.setup_max_age_gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MarriageModel {
        MarriageModel {
            min_age: 15,
            time_scale: 0.45,
            remarriage_allowed: false,
            min_age_gap: 0,
            setup_max_age_gap: 15,
        }
    }

    #[test]
    fn hazard_is_zero_below_minimum_age() {
        assert_eq!(coale_hazard(14, 15, 0.45), 0.0);
        assert_eq!(model().annual_probability(12, 0), 0.0);
    }

    #[test]
    fn hazard_matches_coale_formula() {
        // At age == a0 the inner exponent is 0, so p = (0.174/k) * e^-4.411.
        let expected = (0.174 / 0.45) * (-4.411f64).exp();
        assert!((coale_hazard(15, 15, 0.45) - expected).abs() < 1e-12);
        // The hazard saturates toward 0.174/k with age.
        let late = coale_hazard(60, 15, 0.45);
        assert!(late > 0.9 * (0.174 / 0.45) && late <= 0.174 / 0.45);
    }

    #[test]
    fn smaller_scale_compresses_marriage_ages() {
        // With a smaller k the hazard rises faster just above a0.
        assert!(coale_hazard(20, 15, 0.3) > coale_hazard(20, 15, 0.9));
    }

    #[test]
    fn remarriage_policy_is_all_or_nothing() {
        let mut m = model();
        assert_eq!(m.annual_probability(30, 1), 0.0);
        m.remarriage_allowed = true;
        assert_eq!(m.annual_probability(30, 1), 1.0);
        // First marriages still follow the hazard either way.
        assert!(m.annual_probability(30, 0) < 1.0);
    }

    #[test]
    fn ever_married_probability_accumulates() {
        let m = model();
        assert_eq!(m.ever_married_by(15), 0.0);
        let at_25 = m.ever_married_by(25);
        let at_40 = m.ever_married_by(40);
        assert!(at_25 > 0.5, "got {at_25}");
        assert!(at_40 > at_25 && at_40 < 1.0);
    }

    #[test]
    fn age_gap_bounds() {
        let mut m = model();
        assert!(m.acceptable_gap(20, 20, false));
        assert!(!m.acceptable_gap(20, 19, false));
        // Setup pairing caps the gap at 15 years; the main phase does not.
        assert!(!m.acceptable_gap(20, 36, true));
        assert!(m.acceptable_gap(20, 36, false));
        // A negative minimum lets the wife be older.
        m.min_age_gap = -5;
        assert!(m.acceptable_gap(25, 21, true));
        assert!(!m.acceptable_gap(25, 19, true));
    }
}
