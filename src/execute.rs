//! Opcode dispatch: the 32 instruction handlers (spec §4.6). Operates on a
//! single creature's `Cpu` and the shared `Soup`; allocation and division
//! signal their outcome back to the simulation loop, which owns the
//! scheduler/reaper/genebank/event bus those operations touch.

use crate::arena::CreatureId;
use crate::creature::{Creature, MemRegion};
use crate::instruction::Instruction;
use crate::mutation::Mutations;
use crate::soup::{AccessKind, AllocMode, Direction, Soup};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    Continue,
    /// `mal` wants `size` bytes; the simulation loop tries `allocate`,
    /// retries once after a reap on failure, and sets `E` if that also fails.
    MallocRequested { size: usize, mode: AllocMode },
    /// `divide` preconditions were satisfied; the daughter interval is
    /// ready to become a new creature.
    DivideRequested {
        daughter: MemRegion,
    },
}

/// Direction each template-searching opcode scans in (SPEC_FULL §3).
fn direction_for(inst: Instruction) -> Direction {
    match inst {
        Instruction::JmpO | Instruction::AdrO => Direction::Outward,
        Instruction::JmpB | Instruction::AdrB => Direction::Backward,
        Instruction::Call | Instruction::AdrF => Direction::Forward,
        other => panic!("{other:?} does not perform template search"),
    }
}

fn template_search(
    soup: &Soup,
    ip: usize,
    inst: Instruction,
    search_limit_cells: usize,
) -> (usize, Option<(usize, usize)>) {
    let bits = soup.read_template(ip + 1, search_limit_cells);
    let len = bits.len();
    if len == 0 {
        return (0, None);
    }
    let complement: Vec<bool> = bits.iter().map(|b| !b).collect();
    let result = soup.find_template(ip, direction_for(inst), &complement, search_limit_cells);
    (len, result)
}

/// Executes one opcode for `creature`. `mode` is the allocator mode `mal`
/// should use; `search_limit_cells` is `search_limit * avg_mother_size`
/// already resolved to a byte count by the caller.
pub fn execute(
    creature: &mut Creature,
    owner: CreatureId,
    soup: &mut Soup,
    mutations: &Mutations,
    mal_mode: AllocMode,
    search_limit_cells: usize,
    rng: &mut impl Rng,
) -> ExecOutcome {
    let ip = creature.cpu.ip;
    let inst = soup.read_instruction(ip);

    match inst {
        Instruction::Nop0 | Instruction::Nop1 => {}

        Instruction::Not0 => {
            creature.cpu.c ^= 1;
            creature.cpu.set_flags(creature.cpu.c);
        }
        Instruction::Shl => {
            creature.cpu.c = creature.cpu.c.wrapping_shl(1);
            creature.cpu.set_flags(creature.cpu.c);
        }
        Instruction::Zero => {
            creature.cpu.c = 0;
            creature.cpu.set_flags(0);
        }
        Instruction::IfZ => {
            if creature.cpu.c != 0 {
                creature.cpu.ip = ip.wrapping_add(1);
            }
        }
        Instruction::SubCAB => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.c = creature.cpu.a.wrapping_sub(creature.cpu.b).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.c);
        }
        Instruction::SubAAC => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.a = creature.cpu.a.wrapping_sub(creature.cpu.c).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.a);
        }
        Instruction::IncA => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.a = creature.cpu.a.wrapping_add(1).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.a);
        }
        Instruction::IncB => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.b = creature.cpu.b.wrapping_add(1).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.b);
        }
        Instruction::DecC => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.c = creature.cpu.c.wrapping_sub(1).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.c);
        }
        Instruction::IncC => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.c = creature.cpu.c.wrapping_add(1).wrapping_add(flaw);
            creature.cpu.set_flags(creature.cpu.c);
        }

        Instruction::PushA => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.push(creature.cpu.a.wrapping_add(flaw));
        }
        Instruction::PushB => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.push(creature.cpu.b.wrapping_add(flaw));
        }
        Instruction::PushC => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.push(creature.cpu.c.wrapping_add(flaw));
        }
        Instruction::PushD => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.push(creature.cpu.d.wrapping_add(flaw));
        }
        Instruction::PopA => creature.cpu.a = creature.cpu.pop(),
        Instruction::PopB => creature.cpu.b = creature.cpu.pop(),
        Instruction::PopC => creature.cpu.c = creature.cpu.pop(),
        Instruction::PopD => creature.cpu.d = creature.cpu.pop(),

        Instruction::JmpO | Instruction::JmpB => {
            let (len, result) = template_search(soup, ip, inst, search_limit_cells);
            if len > 0 {
                creature.cpu.ip = ip + len;
            }
            match result {
                Some((addr, _)) => {
                    creature.cpu.jump(addr);
                    creature.cpu.flag_e = false;
                }
                None => creature.cpu.flag_e = true,
            }
        }
        Instruction::Call => {
            let (len, result) = template_search(soup, ip, inst, search_limit_cells);
            match result {
                Some((addr, _)) => {
                    let return_addr = ip + len + 1;
                    creature.cpu.push(return_addr as i32);
                    creature.cpu.jump(addr);
                }
                None => {
                    if len > 0 {
                        creature.cpu.ip = ip + len;
                    }
                    creature.cpu.flag_e = true;
                }
            }
        }
        Instruction::Ret => {
            let addr = creature.cpu.pop();
            creature.cpu.jump(addr.rem_euclid(soup.size() as i32) as usize);
        }

        Instruction::MovDC => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.d = creature.cpu.c.wrapping_add(flaw);
        }
        Instruction::MovBA => {
            let flaw = mutations.flaw_delta(rng);
            creature.cpu.b = creature.cpu.a.wrapping_add(flaw);
        }
        Instruction::MovII => {
            let addr_a = (creature.cpu.a.rem_euclid(soup.size() as i32)) as usize;
            let addr_b = (creature.cpu.b.rem_euclid(soup.size() as i32)) as usize;
            let soup_size = soup.size();
            let in_daughter = creature.owns_daughter(soup_size, addr_a);
            let write_ok = soup.check_access(addr_a, Some(owner), AccessKind::Write);
            if !in_daughter || !write_ok {
                creature.cpu.flag_e = true;
            } else {
                let value = soup.read(addr_b);
                let mutated = mutations.maybe_copy_mutation(value, rng);
                soup.write(addr_a, mutated);
                if let Some(daughter) = creature.daughter {
                    let offset = (addr_a + soup_size - daughter.pos) % soup_size;
                    creature.demographics.mov_daught += 1;
                    creature.demographics.mov_off_min = creature.demographics.mov_off_min.min(offset);
                    creature.demographics.mov_off_max = creature.demographics.mov_off_max.max(offset);
                }
                creature.cpu.flag_e = false;
            }
        }

        Instruction::AdrO | Instruction::AdrB | Instruction::AdrF => {
            let (len, result) = template_search(soup, ip, inst, search_limit_cells);
            if len > 0 {
                creature.cpu.ip = ip + len;
            }
            match result {
                Some((addr, matched_len)) => {
                    creature.cpu.a = addr as i32;
                    creature.cpu.c = matched_len as i32;
                    creature.cpu.flag_e = false;
                }
                None => creature.cpu.flag_e = true,
            }
        }

        Instruction::Mal => {
            let requested = creature.cpu.c;
            if requested < 0 {
                creature.cpu.flag_e = true;
                return ExecOutcome::Continue;
            }
            let requested = requested as usize;
            let min_ok = requested >= mal_min_cell_size(mutations);
            let max_ok = requested <= creature.mother.size * 2;
            if !min_ok || !max_ok {
                creature.cpu.flag_e = true;
                return ExecOutcome::Continue;
            }
            if let Some(daughter) = creature.daughter.take() {
                soup.deallocate(daughter.pos, daughter.size);
            }
            return ExecOutcome::MallocRequested {
                size: requested,
                mode: mal_mode,
            };
        }

        Instruction::Divide => {
            let daughter = match creature.daughter {
                Some(d) => d,
                None => {
                    creature.cpu.flag_e = true;
                    return ExecOutcome::Continue;
                }
            };
            return ExecOutcome::DivideRequested { daughter };
        }
    }

    ExecOutcome::Continue
}

fn mal_min_cell_size(mutations: &Mutations) -> usize {
    mutations.config.min_cell_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::mutation::MutationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (Soup, Creature, Mutations, CreatureId) {
        let mut soup = Soup::new(1000);
        let pos = soup.allocate_at(100, 80).unwrap();
        let mut arena: Arena<()> = Arena::new();
        let owner = arena.insert(());
        let creature = Creature::new(MemRegion::new(pos, 80), 0, None);
        let mutations = Mutations::new(MutationConfig::default());
        (soup, creature, mutations, owner)
    }

    #[test]
    fn inc_a_updates_register_and_flags() {
        let (mut soup, mut creature, mutations, owner) = setup();
        soup.write(creature.cpu.ip, Instruction::IncA.to_byte());
        let mut rng = StdRng::seed_from_u64(0);
        execute(&mut creature, owner, &mut soup, &mutations, AllocMode::BetterFit, 100, &mut rng);
        assert_eq!(creature.cpu.a, 1);
        assert!(!creature.cpu.flag_z);
    }

    #[test]
    fn ifz_skips_next_instruction_when_c_nonzero() {
        let (mut soup, mut creature, mutations, owner) = setup();
        creature.cpu.c = 5;
        let ip = creature.cpu.ip;
        soup.write(ip, Instruction::IfZ.to_byte());
        let mut rng = StdRng::seed_from_u64(0);
        execute(&mut creature, owner, &mut soup, &mutations, AllocMode::BetterFit, 100, &mut rng);
        // The handler only nudges ip by 1; the main loop's own advance
        // (gated on `!ip_modified`, which stays false here) supplies the
        // second +1 that actually skips the following instruction.
        assert!(!creature.cpu.ip_modified);
        if !creature.cpu.ip_modified {
            creature.cpu.ip = (creature.cpu.ip + 1) % soup.size();
        }
        assert_eq!(creature.cpu.ip, ip + 2);
    }

    #[test]
    fn mal_below_min_size_sets_error_flag() {
        let (mut soup, mut creature, mutations, owner) = setup();
        creature.cpu.c = 0;
        soup.write(creature.cpu.ip, Instruction::Mal.to_byte());
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = execute(&mut creature, owner, &mut soup, &mutations, AllocMode::BetterFit, 100, &mut rng);
        assert_eq!(outcome, ExecOutcome::Continue);
        assert!(creature.cpu.flag_e);
    }

    #[test]
    fn mal_within_bounds_requests_allocation() {
        let (mut soup, mut creature, mutations, owner) = setup();
        creature.cpu.c = 40;
        soup.write(creature.cpu.ip, Instruction::Mal.to_byte());
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = execute(&mut creature, owner, &mut soup, &mutations, AllocMode::BetterFit, 100, &mut rng);
        assert_eq!(
            outcome,
            ExecOutcome::MallocRequested {
                size: 40,
                mode: AllocMode::BetterFit
            }
        );
    }

    #[test]
    fn divide_without_daughter_sets_error_flag() {
        let (mut soup, mut creature, mutations, owner) = setup();
        soup.write(creature.cpu.ip, Instruction::Divide.to_byte());
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = execute(&mut creature, owner, &mut soup, &mutations, AllocMode::BetterFit, 100, &mut rng);
        assert_eq!(outcome, ExecOutcome::Continue);
        assert!(creature.cpu.flag_e);
    }
}
