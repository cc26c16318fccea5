//! Synchronous event bus for external observers (spec §6, §9). Grounded in
//! PyTierra's `events.py`. Callbacks run on the core thread between
//! instructions and must not mutate core state; that contract is enforced
//! by convention, not the type system, matching the original.

use crate::arena::CreatureId;

#[derive(Debug, Clone)]
pub enum Event {
    CellBorn {
        cell: CreatureId,
        parent: CreatureId,
    },
    CellDied {
        cell: CreatureId,
        cause: &'static str,
    },
    NewGenotype {
        name: String,
    },
    Mutation {
        addr: usize,
        kind: &'static str,
    },
    Milestone {
        inst_executed: u64,
    },
}

pub type Callback = Box<dyn FnMut(&Event) + Send>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Callback>,
    enabled: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            enabled: true,
        }
    }

    pub fn subscribe(&mut self, callback: Callback) {
        self.subscribers.push(callback);
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&mut self, event: Event) {
        if !self.enabled {
            return;
        }
        for sub in self.subscribers.iter_mut() {
            sub(&event);
        }
    }
}
