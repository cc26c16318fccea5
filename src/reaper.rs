//! Selective-death queue: triggered reaping, lazy-tolerance kill, and
//! disturbance (spec §4.4). Grounded in PyTierra's `reaper.py`.

use crate::arena::CreatureId;
use crate::soup::wrap_distance;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    pub near_address_reap: bool,
    pub mal_reap_tol: f64,
    pub reap_random_proportion: f64,
    pub lazy_tol: f64,
    pub dist_prop: f64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            near_address_reap: false,
            mal_reap_tol: 0.0,
            reap_random_proportion: 0.1,
            lazy_tol: 4.0,
            dist_prop: 0.2,
        }
    }
}

pub struct Reaper {
    queue: VecDeque<CreatureId>,
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new()
    }
}

impl Reaper {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn add(&mut self, id: CreatureId) {
        self.queue.push_back(id);
    }

    pub fn remove(&mut self, id: CreatureId) {
        if let Some(idx) = self.queue.iter().position(|&c| c == id) {
            self.queue.remove(idx);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Selects a victim to reap. `current` is the currently-executing
    /// creature, always skipped. `positions` maps a queue entry to its
    /// mother position, needed only for near-address mode.
    pub fn select_victim(
        &self,
        cfg: &ReaperConfig,
        current: CreatureId,
        suggested_addr: Option<usize>,
        avg_mother_size: f64,
        soup_size: usize,
        position_of: impl Fn(CreatureId) -> usize,
        rng: &mut impl Rng,
    ) -> Option<CreatureId> {
        if self.queue.is_empty() {
            return None;
        }
        if cfg.near_address_reap {
            if let Some(addr) = suggested_addr {
                let tol = (cfg.mal_reap_tol * avg_mother_size) as usize;
                for &id in self.queue.iter() {
                    if id == current {
                        continue;
                    }
                    let dist = wrap_distance(position_of(id), addr, soup_size);
                    if dist <= tol {
                        return Some(id);
                    }
                }
                return None;
            }
        }
        let window = (self.queue.len() as f64 * cfg.reap_random_proportion)
            .floor()
            .max(1.0) as usize;
        let window = window.min(self.queue.len());
        let mut idx = rng.gen_range(0..window);
        if self.queue[idx] == current {
            if self.queue.len() <= 1 {
                return None;
            }
            idx = (idx + 1) % window;
            if self.queue[idx] == current {
                return None;
            }
        }
        Some(self.queue[idx])
    }

    /// Fraction-of-lazy_tol lazy-kill check: the creature has divided at
    /// least once and executed more instructions than `lazy_tol *
    /// mother_size` since its last division.
    pub fn is_lazy(cfg: &ReaperConfig, fecundity: u64, rep_inst: u64, mother_size: usize) -> bool {
        fecundity > 0 && (rep_inst as f64) > cfg.lazy_tol * mother_size as f64
    }

    /// Number of victims a disturbance event should kill.
    pub fn disturbance_victim_count(cfg: &ReaperConfig, population: usize) -> usize {
        ((population as f64 * cfg.dist_prop).floor() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn lazy_check_requires_prior_division() {
        let cfg = ReaperConfig {
            lazy_tol: 4.0,
            ..Default::default()
        };
        assert!(!Reaper::is_lazy(&cfg, 0, 1000, 80));
        assert!(Reaper::is_lazy(&cfg, 1, 321, 80));
        assert!(!Reaper::is_lazy(&cfg, 1, 320, 80));
    }

    #[test]
    fn disturbance_count_is_at_least_one() {
        let cfg = ReaperConfig {
            dist_prop: 0.2,
            ..Default::default()
        };
        assert_eq!(Reaper::disturbance_victim_count(&cfg, 10), 2);
        assert_eq!(Reaper::disturbance_victim_count(&cfg, 1), 1);
    }

    #[test]
    fn select_victim_skips_current_creature() {
        let mut reaper = Reaper::new();
        let mut arena: Arena<()> = Arena::new();
        let current = arena.insert(());
        let other = arena.insert(());
        reaper.add(current);
        reaper.add(other);
        let cfg = ReaperConfig {
            reap_random_proportion: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let victim = reaper.select_victim(&cfg, current, None, 80.0, 1000, |_| 0, &mut rng);
        assert_eq!(victim, Some(other));
    }
}
