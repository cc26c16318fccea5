//! Property-based checks for the soup's structural invariants and the
//! genome file format's roundtrip guarantee (spec §8).

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tierra::arena::Arena;
use tierra::genebank::GeneBank;
use tierra::genome;
use tierra::instruction::Instruction;
use tierra::soup::{AllocMode, Soup};

proptest! {
    /// allocate followed immediately by deallocate of the returned range
    /// restores the soup to its prior free-list shape (checked via the
    /// total, since the free list itself is private to the crate).
    #[test]
    fn allocate_then_deallocate_restores_free_total(sizes in prop::collection::vec(1usize..50, 1..20)) {
        let mut soup = Soup::new(2000);
        let mut rng = StdRng::seed_from_u64(7);
        let mut allocated = Vec::new();
        for size in &sizes {
            if let Some(pos) = soup.allocate(*size, AllocMode::FirstFit, &mut rng) {
                allocated.push((pos, *size));
            }
        }
        let allocated_total: usize = allocated.iter().map(|&(_, s)| s).sum();
        prop_assert_eq!(soup.total_free() + allocated_total, 2000);

        for &(pos, size) in &allocated {
            soup.deallocate(pos, size);
        }
        prop_assert_eq!(soup.total_free(), 2000);
    }

    /// Address arithmetic: every read/write through the public API is
    /// congruent modulo soup size.
    #[test]
    fn read_write_are_congruent_modulo_soup_size(addr in 0usize..10_000, value in 0u8..=31, size in 100usize..500) {
        let mut soup = Soup::new(size);
        soup.write(addr, value);
        prop_assert_eq!(soup.read(addr), soup.read(addr + size));
        prop_assert_eq!(soup.read(addr), soup.read(addr + 5 * size));
    }

    /// Post-reap randomization writes bytes uniformly in [0, 31], the
    /// decodable instruction-byte range.
    #[test]
    fn randomize_block_stays_within_instruction_byte_range(pos in 0usize..900, len in 1usize..100) {
        let mut soup = Soup::new(1000);
        let mut rng = StdRng::seed_from_u64(3);
        soup.randomize_block(pos, len, &mut rng);
        for i in 0..len {
            prop_assert!(soup.read(pos + i) <= 31);
        }
    }

    /// owner_at(a) is consistent with the registered owner intervals: hits
    /// inside an interval resolve to its id, gaps between intervals resolve
    /// to no owner.
    #[test]
    fn owner_at_matches_registered_intervals_and_gaps(
        lens in prop::collection::vec(5usize..20, 3..8),
        gaps in prop::collection::vec(1usize..20, 3..8),
    ) {
        let mut arena: Arena<()> = Arena::new();
        let mut soup = Soup::new(5000);
        let n = lens.len().min(gaps.len());
        let mut pos = 10usize;
        let mut intervals = Vec::new();
        for i in 0..n {
            let id = arena.insert(());
            let len = lens[i];
            soup.add_owner(pos, len, id);
            intervals.push((pos, len, id));
            pos += len + gaps[i];
        }

        for &(p, len, id) in &intervals {
            prop_assert_eq!(soup.owner_at(p), Some(id));
            prop_assert_eq!(soup.owner_at(p + len - 1), Some(id));
        }
        for w in intervals.windows(2) {
            let (p0, l0, _) = w[0];
            let (p1, _, _) = w[1];
            let gap_start = p0 + l0;
            if gap_start < p1 {
                prop_assert_eq!(soup.owner_at(gap_start), None);
            }
        }
    }

    /// For every genotype, population tracks register/unregister calls
    /// exactly (clamped at zero, per the genebank's own contract).
    #[test]
    fn genotype_population_tracks_register_and_unregister_calls(regs in 1usize..10, unregs in 0usize..10) {
        let mut bank = GeneBank::new();
        let genome = vec![5u8; 40];
        let mut name = String::new();
        for i in 0..regs {
            let (n, _) = bank.register(&genome, i as u64, None);
            name = n;
        }
        let unregs = unregs.min(regs);
        for _ in 0..unregs {
            bank.unregister(&name);
        }
        let expected = (regs - unregs) as u64;
        prop_assert_eq!(bank.get(&name).unwrap().population, expected);
    }

    /// Genome file write then read returns the same opcode sequence, for
    /// arbitrary instruction sequences (not just the ancestor genome).
    #[test]
    fn genome_file_roundtrips_arbitrary_instruction_sequences(bytes in prop::collection::vec(0u8..32, 1..60)) {
        let seq: Vec<Instruction> = bytes.iter().map(|&b| Instruction::from_byte(b)).collect();
        let path = std::env::temp_dir().join(format!("tierra_proptest_roundtrip_{}.tie", std::process::id()));
        genome::save_genome(&path, &seq, "0000aaa", "0666god").unwrap();
        let loaded = genome::load_genome(&path).unwrap();
        std::fs::remove_file(&path).ok();
        prop_assert_eq!(loaded, seq);
    }
}
