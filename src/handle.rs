//! Mutex-guarded wrapper exposing start/pause/stop/step/snapshot to drivers
//! running the simulation from another thread (spec §5). Grounded in
//! PyTierra's `controller.py::SimulationController`.

use crate::config::Config;
use crate::simulator::Simulation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A snapshot of the handful of values a UI or report line needs, taken
/// under the lock and handed back by value so the caller never holds it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub inst_executed: u64,
    pub population: usize,
    pub num_genotypes: usize,
    pub report: String,
}

/// Thread-safe handle around a `Simulation`. Every external interaction
/// (driver thread issuing start/stop, observer thread reading a snapshot)
/// goes through the same mutex the simulation's own step loop uses, so
/// there is exactly one lock to reason about.
pub struct SimulationHandle {
    inner: Mutex<Simulation>,
    paused: AtomicBool,
    stopped: AtomicBool,
}

impl SimulationHandle {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Simulation::new(config)),
            paused: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, Simulation> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn start(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs up to `n` instructions, respecting pause/stop, then returns.
    /// Intended to be called repeatedly from a driver loop on its own
    /// thread; each call takes the lock once.
    pub fn step(&self, n: u64) {
        if self.is_paused() || self.is_stopped() {
            return;
        }
        let mut sim = self.lock();
        sim.run(sim.inst_executed() + n, 0);
    }

    pub fn snapshot(&self) -> Snapshot {
        let sim = self.lock();
        Snapshot {
            inst_executed: sim.inst_executed(),
            population: sim.arena.len(),
            num_genotypes: sim.genebank.num_genotypes(),
            report: sim.report(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused_and_responds_to_start_pause_stop() {
        let handle = SimulationHandle::new(Config::default());
        assert!(handle.is_paused());
        handle.start();
        assert!(!handle.is_paused());
        handle.pause();
        assert!(handle.is_paused());
        assert!(!handle.is_stopped());
        handle.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn step_is_a_no_op_while_paused() {
        let handle = SimulationHandle::new(Config::default());
        handle.step(1000);
        assert_eq!(handle.snapshot().inst_executed, 0);
    }
}
