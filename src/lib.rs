//! Agent-based demographic simulation of a small human population.
//!
//! The engine advances one simulated year per tick, applying the ordered
//! phase sequence reproduce -> die -> recruit -> marry to an ECS world of
//! individuals and households, driven by empirical life tables and
//! fertility schedules.

pub mod simulation;
