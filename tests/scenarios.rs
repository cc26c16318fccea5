//! End-to-end scenarios from the testable-properties section: booting an
//! ancestor, watching it replicate, and exercising the allocator/protection/
//! reaper behavior it depends on, all through the crate's public surface.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;

use tierra::arena::{Arena, CreatureId};
use tierra::config::Config;
use tierra::creature::{Creature, MemRegion};
use tierra::events::Event;
use tierra::reaper::{Reaper, ReaperConfig};
use tierra::scheduler::Scheduler;
use tierra::simulator::Simulation;
use tierra::soup::{AccessKind, AllocMode, Soup, PROT_WRITE};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/0080aaa.tie")
}

fn ancestor_config(seed: u64) -> Config {
    let mut config = Config::default();
    config.soup_size = 60_000;
    config.seed = seed;
    config
}

// 1. Boot singleton.
#[test]
fn boot_singleton_places_ancestor_at_soup_center() {
    let mut sim = Simulation::new(ancestor_config(1));
    let id = sim.boot(&fixture_path()).expect("boot should succeed");
    let creature = sim.arena.get(id).expect("booted creature is alive");
    assert_eq!(creature.mother.pos, 30_000 - 40);
    assert_eq!(creature.mother.size, 80);
    assert_eq!(sim.genebank.num_genotypes(), 1);
    assert_eq!(sim.genebank.summary().get("0080aaa"), Some(&1));
}

// 2 + 3. First and second replication, continuing the same run.
#[test]
fn replication_reaches_population_two_then_three_within_budget() {
    let mut sim = Simulation::new(ancestor_config(7));
    sim.boot(&fixture_path()).unwrap();
    let ancestor_pos = sim.arena.iter().next().unwrap().1.mother.pos;
    let ancestor_bytes = sim.soup.read_block(ancestor_pos, 80);

    sim.run(50 * 25, 0);
    assert!(
        sim.arena.len() >= 2,
        "population should have reached 2 within the first 50 slices, got {}",
        sim.arena.len()
    );
    let daughter = sim
        .arena
        .iter()
        .find(|&(_, c)| c.mother.pos != ancestor_pos)
        .expect("a daughter cell exists alongside the mother");
    let daughter_bytes = sim.soup.read_block(daughter.1.mother.pos, daughter.1.mother.size);
    assert_eq!(daughter_bytes, ancestor_bytes, "daughter genome must match the ancestor byte-for-byte");

    sim.run(200 * 25, 0);
    assert!(
        sim.arena.len() >= 3,
        "the scheduler should hold at least 3 creatures within 200 slices, got {}",
        sim.arena.len()
    );
}

// 4. Allocator BETTER_FIT.
#[test]
fn allocator_better_fit_returns_smallest_adequate_gap() {
    let mut soup = Soup::new(1000);
    assert_eq!(soup.allocate_at(100, 80), Some(100));
    assert_eq!(soup.allocate_at(200, 700), Some(200));
    let mut rng = StdRng::seed_from_u64(2);
    let pos = soup
        .allocate(15, AllocMode::BetterFit, &mut rng)
        .expect("allocation should succeed");
    assert_eq!(pos, 180);
}

// 5. Deallocate merging.
#[test]
fn deallocate_merging_reopens_earlier_space() {
    let mut soup = Soup::new(1000);
    soup.allocate_at(100, 80).unwrap();
    soup.allocate_at(200, 80).unwrap();
    soup.deallocate(100, 80);
    assert_eq!(soup.total_free(), 1000 - 80);
    let mut rng = StdRng::seed_from_u64(2);
    let pos = soup
        .allocate(200, AllocMode::FirstFit, &mut rng)
        .expect("allocation should succeed");
    assert!(pos <= 100);
}

// 6. Protection.
#[test]
fn protection_w_blocks_cross_owner_writes_but_not_reads() {
    let mut arena: Arena<()> = Arena::new();
    let me = arena.insert(());
    let other = arena.insert(());
    let mut soup = Soup::new(1000);
    soup.protection.other_mode = PROT_WRITE;
    soup.add_owner(100, 80, me);
    soup.add_owner(200, 10, other);
    assert!(!soup.check_access(200, Some(me), AccessKind::Write));
    assert!(soup.check_access(200, Some(me), AccessKind::Read));
    assert!(soup.check_access(150, Some(me), AccessKind::Write));
}

// 7. Lazy kill.
#[test]
fn lazy_kill_reaps_a_quiescent_mother_after_one_division() {
    let mut sim = Simulation::new(ancestor_config(11));
    let ancestor_id = sim.boot(&fixture_path()).unwrap();

    let died: Arc<Mutex<Vec<(CreatureId, &'static str)>>> = Arc::new(Mutex::new(Vec::new()));
    let died_clone = died.clone();
    sim.events.subscribe(Box::new(move |event| {
        if let Event::CellDied { cell, cause } = event {
            died_clone.lock().unwrap().push((*cell, cause));
        }
    }));

    sim.run(6_000, 0);

    let died = died.lock().unwrap();
    assert!(
        died.iter().any(|&(cell, cause)| cell == ancestor_id && cause == "lazy"),
        "expected the ancestor to be reaped as lazy once it went quiescent, saw {died:?}"
    );
}

// 8. Disturbance.
#[test]
fn disturbance_victim_count_matches_the_concrete_scenario() {
    let cfg = ReaperConfig {
        dist_prop: 0.2,
        ..ReaperConfig::default()
    };
    assert_eq!(Reaper::disturbance_victim_count(&cfg, 10), 2);
}

#[test]
fn disturbance_eventually_reaps_a_creature() {
    let mut config = ancestor_config(13);
    config.dist_freq = 0.01;
    let mut sim = Simulation::new(config);
    sim.boot(&fixture_path()).unwrap();

    let disturbed: Arc<Mutex<Vec<CreatureId>>> = Arc::new(Mutex::new(Vec::new()));
    let disturbed_clone = disturbed.clone();
    sim.events.subscribe(Box::new(move |event| {
        if let Event::CellDied { cell, cause } = event {
            if *cause == "disturbance" {
                disturbed_clone.lock().unwrap().push(*cell);
            }
        }
    }));

    sim.run(5_000, 0);

    assert!(
        !disturbed.lock().unwrap().is_empty(),
        "expected at least one disturbance reap with a nonzero DistFreq"
    );
}

// Queue-removal half of the "after reap" invariant (spec §8): the scheduler
// and reaper queues no longer carry a removed creature's id.
#[test]
fn removed_creature_leaves_scheduler_and_reaper_queues() {
    let mut arena: Arena<Creature> = Arena::new();
    let mut scheduler = Scheduler::new();
    let mut reaper = Reaper::new();

    let a = arena.insert(Creature::new(MemRegion::new(0, 80), 0, None));
    let b = arena.insert(Creature::new(MemRegion::new(100, 80), 0, None));
    scheduler.add(a);
    scheduler.add(b);
    reaper.add(a);
    reaper.add(b);

    scheduler.remove(a);
    reaper.remove(a);
    arena.remove(a);

    assert_eq!(scheduler.num_cells(), 1);
    assert_eq!(scheduler.current(), Some(b));
    assert_eq!(reaper.len(), 1);
    assert!(!arena.contains(a));
}

// Determinism: identical seed, config, and ancestor reproduce identical
// event sequences and population trajectories.
#[test]
fn identical_seed_config_and_ancestor_reproduce_bit_identical_runs() {
    fn run_once(seed: u64) -> (u64, usize, usize, Vec<String>) {
        let mut sim = Simulation::new(ancestor_config(seed));
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        sim.events.subscribe(Box::new(move |event| {
            log_clone.lock().unwrap().push(format!("{event:?}"));
        }));
        sim.boot(&fixture_path()).unwrap();
        sim.run(4_000, 0);
        let events = log.lock().unwrap().clone();
        (sim.inst_executed(), sim.arena.len(), sim.genebank.num_genotypes(), events)
    }

    let a = run_once(42);
    let b = run_once(42);
    assert_eq!(a, b, "identical seed/config/ancestor must yield identical runs");
}
