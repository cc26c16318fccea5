//! The soup: wrap-addressed byte memory, its free-list allocator, owner
//! index, and protection checks (spec §3, §4.2). Grounded in PyTierra's
//! `soup.py`, restructured around the `CreatureId` arena key instead of
//! Python object references.

use crate::arena::CreatureId;
use crate::instruction::Instruction;
use rand::Rng;

pub const PROT_EXECUTE: u8 = 1;
pub const PROT_WRITE: u8 = 2;
pub const PROT_READ: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    None,
    Mine,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocMode {
    FirstFit,
    BetterFit,
    Random,
    Near {
        hint: usize,
        tolerance: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Outward,
}

/// The three protection bitmasks from spec §4.2 / config keys `MemModeFree`,
/// `MemModeMine`, `MemModeProt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtectionConfig {
    pub free_mode: u8,
    pub mine_mode: u8,
    pub other_mode: u8,
}

impl ProtectionConfig {
    fn is_disabled(&self) -> bool {
        self.free_mode == 0 && self.mine_mode == 0 && self.other_mode == 0
    }
}

fn wrap_contains(pos: usize, len: usize, size: usize, addr: usize) -> bool {
    if len == 0 {
        return false;
    }
    if pos + len <= size {
        addr >= pos && addr < pos + len
    } else {
        addr >= pos || addr < (pos + len) % size
    }
}

/// Wrap-aware distance between two addresses in a ring of `size`.
pub fn wrap_distance(a: usize, b: usize, size: usize) -> usize {
    let diff = if a > b { a - b } else { b - a };
    diff.min(size - diff)
}

pub struct Soup {
    data: Vec<u8>,
    size: usize,
    /// Sorted, non-overlapping, non-adjacent free intervals.
    free_list: Vec<(usize, usize)>,
    /// Sorted by start position; mother intervals only (daughters are
    /// private to their owning creature, per spec §4.2).
    owners: Vec<(usize, usize, CreatureId)>,
    pub protection: ProtectionConfig,
}

impl Soup {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
            size,
            free_list: vec![(0, size)],
            owners: Vec::new(),
            protection: ProtectionConfig::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn wrap(&self, addr: usize) -> usize {
        addr % self.size
    }

    pub fn read(&self, addr: usize) -> u8 {
        self.data[self.wrap(addr)]
    }

    pub fn write(&mut self, addr: usize, value: u8) {
        let a = self.wrap(addr);
        self.data[a] = value;
    }

    pub fn read_instruction(&self, addr: usize) -> Instruction {
        Instruction::from_byte(self.read(addr))
    }

    /// Read `len` bytes starting at `pos`, splitting at the wrap seam.
    pub fn read_block(&self, pos: usize, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(self.read(pos + i));
        }
        out
    }

    /// Write `bytes` starting at `pos`, splitting at the wrap seam.
    pub fn write_block(&mut self, pos: usize, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.write(pos + i, b);
        }
    }

    pub fn randomize_block(&mut self, pos: usize, len: usize, rng: &mut impl Rng) {
        for i in 0..len {
            let addr = self.wrap(pos + i);
            self.data[addr] = rng.gen_range(0..=31);
        }
    }

    // --- Owner index -----------------------------------------------------

    fn owner_kind_at(&self, addr: usize, accessor: Option<CreatureId>) -> Owner {
        match self.owner_at(addr) {
            None => Owner::None,
            Some(id) if Some(id) == accessor => Owner::Mine,
            Some(_) => Owner::Other,
        }
    }

    /// `owner_at(a)` via binary search; O(log n) in the common case where
    /// intervals don't wrap, falling back to checking the single interval
    /// that may straddle the end of the soup.
    pub fn owner_at(&self, addr: usize) -> Option<CreatureId> {
        let addr = self.wrap(addr);
        if self.owners.is_empty() {
            return None;
        }
        let idx = self.owners.partition_point(|&(pos, _, _)| pos <= addr);
        if idx > 0 {
            let (pos, len, id) = self.owners[idx - 1];
            if wrap_contains(pos, len, self.size, addr) {
                return Some(id);
            }
        }
        // The last owner by start position may wrap around past size.
        let (pos, len, id) = self.owners[self.owners.len() - 1];
        if wrap_contains(pos, len, self.size, addr) {
            return Some(id);
        }
        None
    }

    pub fn add_owner(&mut self, pos: usize, len: usize, id: CreatureId) {
        let idx = self.owners.partition_point(|&(p, _, _)| p < pos);
        self.owners.insert(idx, (pos, len, id));
    }

    pub fn remove_owner(&mut self, id: CreatureId) {
        if let Some(idx) = self.owners.iter().position(|&(_, _, o)| o == id) {
            self.owners.remove(idx);
        }
    }

    // --- Protection --------------------------------------------------------

    pub fn check_access(&self, addr: usize, accessor: Option<CreatureId>, kind: AccessKind) -> bool {
        if self.protection.is_disabled() {
            return true;
        }
        let mask = match self.owner_kind_at(addr, accessor) {
            Owner::None => self.protection.free_mode,
            Owner::Mine => self.protection.mine_mode,
            Owner::Other => self.protection.other_mode,
        };
        let bit = match kind {
            AccessKind::Read => PROT_READ,
            AccessKind::Write => PROT_WRITE,
            AccessKind::Execute => PROT_EXECUTE,
        };
        mask & bit == 0
    }

    // --- Allocator -----------------------------------------------------

    pub fn total_free(&self) -> usize {
        self.free_list.iter().map(|&(_, len)| len).sum()
    }

    pub fn is_free(&self, addr: usize) -> bool {
        let addr = self.wrap(addr);
        self.free_list
            .iter()
            .any(|&(pos, len)| wrap_contains(pos, len, self.size, addr))
    }

    fn split_at(&mut self, idx: usize, size: usize) -> usize {
        let (pos, len) = self.free_list[idx];
        if len == size {
            self.free_list.remove(idx);
        } else {
            self.free_list[idx] = (pos + size, len - size);
        }
        pos
    }

    pub fn allocate(&mut self, size: usize, mode: AllocMode, rng: &mut impl Rng) -> Option<usize> {
        if size == 0 || size > self.size {
            return None;
        }
        let candidates: Vec<usize> = self
            .free_list
            .iter()
            .enumerate()
            .filter(|&(_, &(_, len))| len >= size)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let chosen = match mode {
            AllocMode::FirstFit => candidates[0],
            AllocMode::BetterFit => *candidates
                .iter()
                .min_by_key(|&&i| (self.free_list[i].1, self.free_list[i].0))
                .unwrap(),
            AllocMode::Random => candidates[rng.gen_range(0..candidates.len())],
            AllocMode::Near { hint, tolerance } => {
                let best = *candidates
                    .iter()
                    .min_by_key(|&&i| wrap_distance(self.free_list[i].0, hint, self.size))
                    .unwrap();
                if let Some(tol) = tolerance {
                    let dist = wrap_distance(self.free_list[best].0, hint, self.size);
                    if dist > tol {
                        return None;
                    }
                }
                best
            }
        };
        Some(self.split_at(chosen, size))
    }

    /// Boot-only allocation at a fixed position: finds the single free
    /// interval covering `[pos, pos+size)` and splits it up to twice.
    pub fn allocate_at(&mut self, pos: usize, size: usize) -> Option<usize> {
        let idx = self
            .free_list
            .iter()
            .position(|&(fpos, flen)| {
                // Covering interval must (non-wrapping) contain the whole
                // requested range; boot placements never straddle the seam.
                fpos <= pos && pos + size <= fpos + flen
            })?;
        let (fpos, flen) = self.free_list[idx];
        let mut replacement = Vec::new();
        if fpos < pos {
            replacement.push((fpos, pos - fpos));
        }
        let tail_start = pos + size;
        let tail_len = (fpos + flen) - tail_start;
        if tail_len > 0 {
            replacement.push((tail_start, tail_len));
        }
        self.free_list.splice(idx..idx + 1, replacement);
        Some(pos)
    }

    pub fn deallocate(&mut self, pos: usize, size: usize) {
        let idx = self.free_list.partition_point(|&(p, _)| p < pos);
        self.free_list.insert(idx, (pos, size));
        // Merge with successor first (indices stay valid), then predecessor.
        if idx + 1 < self.free_list.len() {
            let (pos, len) = self.free_list[idx];
            let (npos, nlen) = self.free_list[idx + 1];
            if pos + len == npos {
                self.free_list[idx] = (pos, len + nlen);
                self.free_list.remove(idx + 1);
            }
        }
        if idx > 0 {
            let (ppos, plen) = self.free_list[idx - 1];
            let (pos, len) = self.free_list[idx];
            if ppos + plen == pos {
                self.free_list[idx - 1] = (ppos, plen + len);
                self.free_list.remove(idx);
            }
        }
    }

    // --- Template search -------------------------------------------------

    /// Maximal run of `nop0`/`nop1` starting at `start`, as a bit vector
    /// (`true` = `nop1`).
    pub fn read_template(&self, start: usize, limit: usize) -> Vec<bool> {
        let mut bits = Vec::new();
        for i in 0..limit.min(self.size) {
            match self.read_instruction(start + i) {
                Instruction::Nop0 => bits.push(false),
                Instruction::Nop1 => bits.push(true),
                _ => break,
            }
        }
        bits
    }

    fn matches_complement_at(&self, addr: usize, complement: &[bool]) -> bool {
        complement.iter().enumerate().all(|(i, &want)| {
            match self.read_instruction(addr + i) {
                Instruction::Nop0 => !want,
                Instruction::Nop1 => want,
                _ => false,
            }
        })
    }

    /// Search for an exact match of `complement` starting near `ip`,
    /// within `limit` steps. Returns `(address past match, length)`.
    pub fn find_template(
        &self,
        ip: usize,
        direction: Direction,
        complement: &[bool],
        limit: usize,
    ) -> Option<(usize, usize)> {
        if complement.is_empty() {
            return None;
        }
        let l = complement.len();

        match direction {
            Direction::Forward => {
                for step in 0..limit {
                    let addr = self.wrap(ip + 1 + step);
                    if self.matches_complement_at(addr, complement) {
                        return Some((self.wrap(addr + l), l));
                    }
                }
                None
            }
            Direction::Backward => {
                for step in 0..limit {
                    let addr = self.wrap(ip + self.size - 1 - step);
                    if self.matches_complement_at(addr, complement) {
                        return Some((self.wrap(addr + l), l));
                    }
                }
                None
            }
            Direction::Outward => {
                for step in 1..=limit {
                    let fwd = self.wrap(ip + step);
                    if self.matches_complement_at(fwd, complement) {
                        return Some((self.wrap(fwd + l), l));
                    }
                    let bwd = self.wrap(ip + self.size - step);
                    if self.matches_complement_at(bwd, complement) {
                        return Some((self.wrap(bwd + l), l));
                    }
                }
                None
            }
        }
    }
}
