use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;
use rand::Rng;

pub mod components;
pub mod events;
pub mod fertility;
pub mod nuptiality;
pub mod observer;
pub mod resources;
pub mod systems;
pub mod tables;

pub use components::*;
pub use events::*;
pub use fertility::*;
pub use nuptiality::*;
pub use observer::*;
pub use resources::*;
pub use systems::*;
pub use tables::*;

/// The demographic engine: an ECS world advanced one simulated year per
/// tick through the strict phase sequence reproduce -> die -> recruit ->
/// marry, with aggregates exported through an observer snapshot.
pub struct SimulationWorld {
    world: World,
    schedule: Schedule,
    observer: Arc<RwLock<ObserverSnapshot>>,
}

impl SimulationWorld {
    pub fn new(config: SimulationConfig) -> anyhow::Result<Self> {
        Self::with_observer(config, Arc::new(RwLock::new(ObserverSnapshot::default())))
    }

    pub fn with_observer(
        config: SimulationConfig,
        observer: Arc<RwLock<ObserverSnapshot>>,
    ) -> anyhow::Result<Self> {
        // Configuration errors abort here; no tick runs on a bad config.
        config.validate()?;
        let tables = config.build_tables()?;

        let mut world = World::default();
        world.insert_resource(SimRng::from_seed(config.seed));
        world.insert_resource(SimClock::default());
        world.insert_resource(TickCounters::default());
        world.insert_resource(RunTotals::default());
        world.insert_resource(EventLog::default());
        world.insert_resource(EnginePhase::Setup);
        world.insert_resource(tables);
        world.insert_resource(config);

        seed_population(&mut world);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                reproduction_system,
                mortality_system,
                recruitment_system,
                marriage_system,
                accounting_system,
                pulse_logging_system,
            )
                .chain(),
        );

        let mut simulation = Self {
            world,
            schedule,
            observer,
        };
        simulation.refresh_observer_snapshot();
        Ok(simulation)
    }

    /// Run the full phase sequence for one simulated year and advance the
    /// clock.
    pub fn tick(&mut self) {
        {
            let mut counters = self.world.resource_mut::<TickCounters>();
            counters.reset();
        }

        self.schedule.run(&mut self.world);

        // Snapshot before the clock moves so the exported tick matches the
        // counters it carries.
        self.refresh_observer_snapshot();

        let crisis_recurrence = self.world.resource::<SimulationConfig>().crisis_recurrence;
        {
            let mut clock = self.world.resource_mut::<SimClock>();
            clock.advance(crisis_recurrence);
        }
        enter_phase(
            &mut self.world,
            &[EnginePhase::Marrying],
            EnginePhase::TickComplete,
        );

        if cfg!(debug_assertions) {
            check_invariants(&mut self.world);
        }
    }

    pub fn finished(&self) -> bool {
        let clock = self.world.resource::<SimClock>();
        let config = self.world.resource::<SimulationConfig>();
        clock.tick >= config.tick_limit
    }

    /// Tick until the configured limit, then report final aggregates.
    pub fn run_to_limit(&mut self) -> RunSummary {
        while !self.finished() {
            self.tick();
        }
        self.finalize()
    }

    /// Final cumulative post-warm-up averages.
    pub fn finalize(&mut self) -> RunSummary {
        let clock = *self.world.resource::<SimClock>();
        let totals = *self.world.resource::<RunTotals>();
        let final_population = living_count(&mut self.world);
        self.world
            .resource_mut::<EventLog>()
            .push(SimEvent::run_complete(clock.tick, final_population));

        let female_deaths = totals.post_warmup_female_deaths;
        let ratio = |sum: u64| {
            if female_deaths > 0 {
                sum as f64 / female_deaths as f64
            } else {
                0.0
            }
        };
        RunSummary {
            ticks: clock.tick,
            final_population,
            total_births: totals.births,
            total_deaths: totals.deaths,
            mean_children_per_female: ratio(totals.post_warmup_children_sum),
            mean_spouses_per_female: ratio(totals.post_warmup_spouse_sum),
            spinster_rate: ratio(totals.post_warmup_spinsters),
        }
    }

    pub fn observer(&self) -> Arc<RwLock<ObserverSnapshot>> {
        self.observer.clone()
    }

    pub fn snapshot(&self) -> ObserverSnapshot {
        self.observer
            .read()
            .expect("observer lock is poisoned")
            .clone()
    }

    /// Direct world access for integration tests and tooling.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn refresh_observer_snapshot(&mut self) {
        let clock = *self.world.resource::<SimClock>();
        let config = self.world.resource::<SimulationConfig>().clone();
        let counters = *self.world.resource::<TickCounters>();

        let mut population = 0u32;
        let mut males = 0u32;
        let mut females = 0u32;
        let mut unmarried_adult_males = 0u32;
        let mut unmarried_adult_females = 0u32;
        let mut adult_males = 0u32;
        let mut adult_females = 0u32;
        let mut military_age_males = 0u32;
        let mut linked_spouses = 0u32;
        let mut widowed = 0u32;
        let mut recruits = 0u32;
        let mut age_brackets = AgeBrackets::default();

        {
            let mut query = self.world.query::<(&Demog, &Vital, &Marital, &Service)>();
            for (demog, vital, marital, service) in query.iter(&self.world) {
                if !vital.alive {
                    continue;
                }
                population += 1;
                age_brackets.add(demog.age);
                let adult = demog.age >= config.min_marriage_age;
                match demog.sex {
                    Sex::Male => {
                        males += 1;
                        if adult {
                            adult_males += 1;
                            if marital.spouse.is_none() {
                                unmarried_adult_males += 1;
                            }
                        }
                        if (RECRUITMENT_MIN_AGE..=RECRUITMENT_MAX_AGE).contains(&demog.age) {
                            military_age_males += 1;
                        }
                    }
                    Sex::Female => {
                        females += 1;
                        if adult {
                            adult_females += 1;
                            if marital.spouse.is_none() {
                                unmarried_adult_females += 1;
                            }
                        }
                    }
                }
                if marital.spouse.is_some() {
                    linked_spouses += 1;
                }
                if marital.widowed && marital.spouse.is_none() {
                    widowed += 1;
                }
                if service.years > 0 {
                    recruits += 1;
                }
            }
        }

        let previous = self.world.resource::<RunTotals>().previous_population;
        let growth_pct = if previous > 0 {
            (f64::from(population) - f64::from(previous)) / f64::from(previous) * 100.0
        } else {
            0.0
        };
        self.world.resource_mut::<RunTotals>().previous_population = population;

        let at_risk = population + counters.deaths;
        let rate = |count: u32, base: u32| {
            if base > 0 {
                f64::from(count) / f64::from(base)
            } else {
                0.0
            }
        };
        let per_deceased = |sum: u32| {
            if counters.adult_female_deaths > 0 {
                f64::from(sum) / f64::from(counters.adult_female_deaths)
            } else {
                0.0
            }
        };

        let events = self.world.resource::<EventLog>().snapshot();
        let snapshot = ObserverSnapshot {
            tick: clock.tick,
            crisis_year: clock.is_crisis_year(config.crisis_recurrence),
            population,
            deaths: counters.deaths,
            births: counters.births,
            age_brackets,
            unmarried_females: unmarried_adult_females,
            military_age_males,
            couples: linked_spouses / 2,
            widowed,
            recruits,
            growth_pct,
            mean_children_per_deceased_female: per_deceased(counters.dead_female_children_sum),
            mean_spouses_per_deceased_female: per_deceased(counters.dead_female_spouse_sum),
            annual_mortality_rate: rate(counters.deaths, at_risk),
            unmarried_rate_male: rate(unmarried_adult_males, adult_males),
            unmarried_rate_female: rate(unmarried_adult_females, adult_females),
            males_per_100_females: if females > 0 {
                f64::from(males) * 100.0 / f64::from(females)
            } else {
                0.0
            },
            events,
        };

        if let Ok(mut guard) = self.observer.write() {
            *guard = snapshot;
        }
    }
}

fn living_count(world: &mut World) -> u32 {
    let mut query = world.query::<&Vital>();
    query.iter(world).filter(|vital| vital.alive).count() as u32
}

/// Seed the initial population: ages sampled from the life table's
/// stationary survivorship, sexes from the configured ratio, and initial
/// spouses paired under the setup age-gap bounds.
fn seed_population(world: &mut World) {
    let config = world.resource::<SimulationConfig>().clone();
    let tables = world.resource::<Tables>().clone();
    let weights = tables.life.stationary_weights();
    let total_weight: f64 = weights.iter().sum();

    let mut people: Vec<(Entity, u32, Sex)> = Vec::with_capacity(config.initial_population as usize);
    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        for _ in 0..config.initial_population {
            let age = sample_weighted_age(&weights, total_weight, &mut rng.0);
            let sex = if rng.0.gen_bool(config.male_birth_ratio) {
                Sex::Male
            } else {
                Sex::Female
            };
            let mut person = world.spawn((
                Demog { age, sex },
                Vital::newborn(),
                Marital::default(),
                Service::default(),
                Kin::default(),
                Residence::default(),
            ));
            if sex == Sex::Female {
                person.insert(Fertility::default());
            }
            people.push((person.id(), age, sex));
        }

        // Initial spousal pairing: each adult female draws against her
        // ever-married-by-age probability; husbands come from the unclaimed
        // male pool within the setup gap bounds.
        let mut bachelors: Vec<(Entity, u32)> = people
            .iter()
            .filter(|(_, _, sex)| *sex == Sex::Male)
            .map(|(entity, age, _)| (*entity, *age))
            .collect();
        let wives: Vec<(Entity, u32)> = people
            .iter()
            .filter(|(_, age, sex)| *sex == Sex::Female && *age >= config.min_marriage_age)
            .map(|(entity, age, _)| (*entity, *age))
            .collect();

        for (wife, wife_age) in wives {
            let ever_married = tables.marriage.ever_married_by(wife_age);
            if rng.0.gen_range(0.0..1.0) >= ever_married {
                continue;
            }
            let eligible: Vec<usize> = bachelors
                .iter()
                .enumerate()
                .filter(|(_, (_, husband_age))| {
                    tables.marriage.acceptable_gap(wife_age, *husband_age, true)
                })
                .map(|(index, _)| index)
                .collect();
            if eligible.is_empty() {
                continue;
            }
            let chosen = eligible[rng.0.gen_range(0..eligible.len())];
            let (husband, _) = bachelors.swap_remove(chosen);

            for (a, b) in [(wife, husband), (husband, wife)] {
                let mut marital = world.get_mut::<Marital>(a).expect("setup Marital");
                marital.spouse = Some(b);
                marital.marriages = 1;
            }
            let household = world
                .spawn(Household {
                    members: [wife, husband].into_iter().collect(),
                })
                .id();
            for member in [wife, husband] {
                if let Some(mut residence) = world.get_mut::<Residence>(member) {
                    residence.household = Some(household);
                }
            }
        }
    });
}

fn sample_weighted_age(weights: &[f64], total: f64, rng: &mut rand::rngs::SmallRng) -> u32 {
    let mut target = rng.gen_range(0.0..total);
    for (age, weight) in weights.iter().enumerate() {
        if target < *weight {
            return age as u32;
        }
        target -= weight;
    }
    (weights.len() - 1) as u32
}

pub(crate) fn add_to_household(world: &mut World, household: Entity, person: Entity) {
    if let Some(mut members) = world.get_mut::<Household>(household) {
        members.members.insert(person);
    }
}

/// Remove `person` from their current household's member set. The caller is
/// responsible for updating `Residence`.
pub(crate) fn remove_from_household(world: &mut World, person: Entity) {
    let household = world
        .get::<Residence>(person)
        .and_then(|residence| residence.household);
    if let Some(household) = household {
        if let Some(mut members) = world.get_mut::<Household>(household) {
            members.members.remove(&person);
        }
    }
}

/// No household may survive a phase with zero members.
pub(crate) fn delete_empty_households(world: &mut World) {
    let empty: Vec<Entity> = {
        let mut query = world.query::<(Entity, &Household)>();
        query
            .iter(world)
            .filter(|(_, household)| household.members.is_empty())
            .map(|(entity, _)| entity)
            .collect()
    };
    for entity in empty {
        world.despawn(entity);
    }
}

/// Structural invariants; a violation is a programming defect, not a
/// recoverable condition. Swept after every tick in debug builds and called
/// directly from tests.
pub fn check_invariants(world: &mut World) {
    let service_length = world.resource::<SimulationConfig>().service_length;

    let rows: Vec<(Entity, Vital, Marital, Service, Residence)> = {
        let mut query = world.query::<(Entity, &Vital, &Marital, &Service, &Residence)>();
        query
            .iter(world)
            .map(|(entity, vital, marital, service, residence)| {
                (entity, *vital, *marital, *service, *residence)
            })
            .collect()
    };

    for (entity, vital, marital, service, residence) in &rows {
        assert!(
            service.years <= service_length,
            "{entity:?} service counter {} exceeds length {service_length}",
            service.years
        );
        if !vital.alive {
            assert!(
                vital.age_at_death.is_some(),
                "{entity:?} dead without a recorded age at death"
            );
            assert!(
                marital.spouse.is_none(),
                "{entity:?} dead but still linked to a spouse"
            );
            assert!(
                residence.household.is_none(),
                "{entity:?} dead but still resident in a household"
            );
            continue;
        }
        if let Some(spouse) = marital.spouse {
            let spouse_vital = world
                .get::<Vital>(spouse)
                .expect("spouse link to a despawned entity");
            assert!(spouse_vital.alive, "{entity:?} married to dead {spouse:?}");
            let spouse_marital = world.get::<Marital>(spouse).expect("spouse Marital");
            assert_eq!(
                spouse_marital.spouse,
                Some(*entity),
                "asymmetric spouse link {entity:?} -> {spouse:?}"
            );
        }
    }

    // Household membership and residence must agree, and no household may
    // be empty or contain the dead.
    let mut seen: HashSet<Entity> = HashSet::new();
    let households: Vec<(Entity, Vec<Entity>)> = {
        let mut query = world.query::<(Entity, &Household)>();
        query
            .iter(world)
            .map(|(entity, household)| (entity, household.members.iter().copied().collect()))
            .collect()
    };
    for (household, members) in &households {
        assert!(!members.is_empty(), "{household:?} survived while empty");
        for member in members {
            assert!(
                seen.insert(*member),
                "{member:?} belongs to more than one household"
            );
            let vital = world.get::<Vital>(*member).expect("member Vital");
            assert!(vital.alive, "{household:?} contains dead member {member:?}");
            let residence = world.get::<Residence>(*member).expect("member Residence");
            assert_eq!(
                residence.household,
                Some(*household),
                "{member:?} residence does not point back to {household:?}"
            );
        }
    }
    for (entity, vital, _, _, residence) in &rows {
        if vital.alive {
            if let Some(household) = residence.household {
                let members = households
                    .iter()
                    .find(|(h, _)| *h == household)
                    .map(|(_, m)| m);
                assert!(
                    members.is_some_and(|m| m.contains(entity)),
                    "{entity:?} resident in {household:?} but not a member"
                );
            }
        }
    }
}
