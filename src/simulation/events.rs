//! Structured simulation events kept in a bounded log for the pulse logger
//! and the observer layer.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEventKind {
    CrisisYear { multiplier: f64, deaths: u32 },
    Extinction { last_population: u32 },
    RunComplete { final_population: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

impl SimEvent {
    pub fn category(&self) -> &'static str {
        match &self.kind {
            SimEventKind::CrisisYear { .. } => "Crisis",
            SimEventKind::Extinction { .. } => "Extinction",
            SimEventKind::RunComplete { .. } => "Run",
        }
    }

    pub fn crisis_year(tick: u64, multiplier: f64, deaths: u32) -> Self {
        Self {
            tick,
            kind: SimEventKind::CrisisYear { multiplier, deaths },
        }
    }

    pub fn extinction(tick: u64, last_population: u32) -> Self {
        Self {
            tick,
            kind: SimEventKind::Extinction { last_population },
        }
    }

    pub fn run_complete(tick: u64, final_population: u32) -> Self {
        Self {
            tick,
            kind: SimEventKind::RunComplete { final_population },
        }
    }

    pub fn headline(&self) -> String {
        match &self.kind {
            SimEventKind::CrisisYear { multiplier, deaths } => {
                format!("Crisis year: mortality x{multiplier:.1}, {deaths} deaths")
            }
            SimEventKind::Extinction { last_population } => {
                format!("Population extinct (was {last_population} last tick)")
            }
            SimEventKind::RunComplete { final_population } => {
                format!("Run complete with {final_population} living")
            }
        }
    }
}

/// Bounded event log; oldest entries are dropped once capacity is reached.
#[derive(Debug, Resource)]
pub struct EventLog {
    events: VecDeque<SimEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<SimEvent> {
        self.events.iter().cloned().collect()
    }

    /// Events recorded during the given tick.
    pub fn for_tick(&self, tick: u64) -> impl Iterator<Item = &SimEvent> {
        self.events.iter().filter(move |e| e.tick == tick)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_bounded() {
        let mut log = EventLog::new(2);
        log.push(SimEvent::crisis_year(1, 3.0, 10));
        log.push(SimEvent::crisis_year(2, 3.0, 12));
        log.push(SimEvent::crisis_year(3, 3.0, 9));
        let events = log.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick, 2);
        assert_eq!(log.for_tick(3).count(), 1);
    }
}
