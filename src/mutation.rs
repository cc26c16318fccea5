//! Flaws, background mutation, copy mutation, and the eight division-time
//! genetic operators (spec §4.6 faults, §4.7). Grounded in PyTierra's
//! `mutations.py`.

use crate::soup::Soup;
use rand::Rng;

/// The `GenPer*` denominators from the `si0` config (spec §6). A
/// non-positive value disables the corresponding operator/rate.
#[derive(Debug, Clone, Copy)]
pub struct MutationConfig {
    pub gen_per_bkg_mut: f64,
    pub gen_per_flaw: f64,
    pub gen_per_mov_mut: f64,
    pub gen_per_div_mut: f64,
    pub gen_per_cro_ins_sam_siz: f64,
    pub gen_per_cro_ins: f64,
    pub gen_per_ins_ins: f64,
    pub gen_per_del_ins: f64,
    pub gen_per_cro_seg: f64,
    pub gen_per_ins_seg: f64,
    pub gen_per_del_seg: f64,
    pub mut_bit_prop: f64,
    pub min_cell_size: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            gen_per_bkg_mut: 0.0,
            gen_per_flaw: 0.0,
            gen_per_mov_mut: 0.0,
            gen_per_div_mut: 0.0,
            gen_per_cro_ins_sam_siz: 0.0,
            gen_per_cro_ins: 0.0,
            gen_per_ins_ins: 0.0,
            gen_per_del_ins: 0.0,
            gen_per_cro_seg: 0.0,
            gen_per_ins_seg: 0.0,
            gen_per_del_seg: 0.0,
            mut_bit_prop: 0.5,
            min_cell_size: 10,
        }
    }
}

/// Background rates, recomputed periodically from average mother size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rates {
    pub rate_mut: f64,
    pub rate_flaw: f64,
    pub rate_mov_mut: f64,
}

fn rate_from(gen_per: f64, avg_size: f64) -> f64 {
    if gen_per > 0.0 {
        1.0 / (gen_per * avg_size)
    } else {
        0.0
    }
}

pub struct Mutations {
    pub config: MutationConfig,
    pub rates: Rates,
}

impl Mutations {
    pub fn new(config: MutationConfig) -> Self {
        Self {
            config,
            rates: Rates::default(),
        }
    }

    pub fn update_rates(&mut self, avg_size: f64) {
        let avg_size = if avg_size > 0.0 { avg_size } else { 80.0 };
        self.rates.rate_mut = rate_from(self.config.gen_per_bkg_mut, avg_size);
        self.rates.rate_flaw = rate_from(self.config.gen_per_flaw, avg_size);
        self.rates.rate_mov_mut = rate_from(self.config.gen_per_mov_mut, avg_size);
    }

    /// `±1` with probability `rate_flaw`, chosen uniformly; `0` otherwise.
    pub fn flaw_delta(&self, rng: &mut impl Rng) -> i32 {
        if rng.gen::<f64>() < self.rates.rate_flaw {
            if rng.gen_bool(0.5) {
                1
            } else {
                -1
            }
        } else {
            0
        }
    }

    /// With probability `mut_bit_prop`, flip one of the low 5 opcode bits;
    /// otherwise replace with a uniform value in `[0,31]`.
    pub fn mutate_value(&self, value: u8, rng: &mut impl Rng) -> u8 {
        if rng.gen::<f64>() < self.config.mut_bit_prop {
            let bit = rng.gen_range(0..5);
            value ^ (1 << bit)
        } else {
            rng.gen_range(0..=31)
        }
    }

    /// Rolls background mutation against an arbitrary soup address.
    /// Returns the mutated address on a hit.
    pub fn maybe_background_mutation(&self, soup: &mut Soup, rng: &mut impl Rng) -> Option<usize> {
        if rng.gen::<f64>() < self.rates.rate_mut {
            let addr = rng.gen_range(0..soup.size());
            let value = soup.read(addr);
            let mutated = self.mutate_value(value, rng);
            soup.write(addr, mutated);
            Some(addr)
        } else {
            None
        }
    }

    /// Copy mutation: applied inside `movii` before the byte lands in
    /// daughter memory.
    pub fn maybe_copy_mutation(&self, value: u8, rng: &mut impl Rng) -> u8 {
        if rng.gen::<f64>() < self.rates.rate_mov_mut {
            self.mutate_value(value, rng)
        } else {
            value
        }
    }

    fn gated(gen_per: f64, rng: &mut impl Rng) -> bool {
        gen_per > 0.0 && rng.gen::<f64>() < 1.0 / gen_per
    }

    /// Maximal non-nop runs within `[pos, pos+size)`, as `(start, len)`
    /// absolute soup offsets.
    fn find_segments(soup: &Soup, pos: usize, size: usize) -> Vec<(usize, usize)> {
        let mut segments = Vec::new();
        let mut seg_start: Option<usize> = None;
        for i in 0..size {
            let addr = pos + i;
            let is_nop = soup.read_instruction(addr).is_template();
            match (is_nop, seg_start) {
                (false, None) => seg_start = Some(i),
                (true, Some(start)) => {
                    segments.push((pos + start, i - start));
                    seg_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = seg_start {
            segments.push((pos + start, size - start));
        }
        segments
    }

    /// Runs the eight division-time operators on the daughter interval, in
    /// fixed order, each independently gated. `mate` is a randomly chosen
    /// other living creature's mother interval, used by the crossover
    /// operators (`None` if no other creature exists yet). Returns the
    /// number of operators that actually mutated a byte.
    #[allow(clippy::too_many_arguments)]
    pub fn genetic_ops(
        &self,
        soup: &mut Soup,
        daughter_pos: usize,
        daughter_size: usize,
        mate: Option<(usize, usize)>,
        rng: &mut impl Rng,
    ) -> u32 {
        let mut mutation_count = 0;

        // 1. Point mutation.
        if Self::gated(self.config.gen_per_div_mut, rng) {
            let offset = rng.gen_range(0..daughter_size);
            let addr = daughter_pos + offset;
            let value = soup.read(addr);
            soup.write(addr, self.mutate_value(value, rng));
            mutation_count += 1;
        }

        // 2. Same-size crossover.
        if let Some((mate_pos, mate_size)) = mate {
            if mate_size == daughter_size && Self::gated(self.config.gen_per_cro_ins_sam_siz, rng) {
                let split = rng.gen_range(1..daughter_size);
                for offset in split..daughter_size {
                    let value = soup.read(mate_pos + offset);
                    soup.write(daughter_pos + offset, value);
                }
                mutation_count += 1;
            }
        }

        // 3. Variable-size crossover.
        if let Some((mate_pos, mate_size)) = mate {
            if Self::gated(self.config.gen_per_cro_ins, rng) {
                let daughter_split = rng.gen_range(1..daughter_size);
                let mate_split = rng.gen_range(1..mate_size.max(2));
                let tail_len = (daughter_size - daughter_split).min(mate_size - mate_split.min(mate_size - 1));
                if daughter_split + tail_len <= daughter_size {
                    for i in 0..tail_len {
                        let value = soup.read(mate_pos + mate_split + i);
                        soup.write(daughter_pos + daughter_split + i, value);
                    }
                    mutation_count += 1;
                }
            }
        }

        // 4. Instruction insertion: shift right by one, random opcode in the gap.
        if daughter_size > 1 && Self::gated(self.config.gen_per_ins_ins, rng) {
            let at = rng.gen_range(0..daughter_size - 1);
            for offset in (at + 1..daughter_size).rev() {
                let value = soup.read(daughter_pos + offset - 1);
                soup.write(daughter_pos + offset, value);
            }
            soup.write(daughter_pos + at, rng.gen_range(0..=31));
            mutation_count += 1;
        }

        // 5. Instruction deletion: shift left, fill trailing byte with nop0.
        if daughter_size > self.config.min_cell_size && Self::gated(self.config.gen_per_del_ins, rng) {
            let at = rng.gen_range(0..daughter_size - 1);
            for offset in at..daughter_size - 1 {
                let value = soup.read(daughter_pos + offset + 1);
                soup.write(daughter_pos + offset, value);
            }
            soup.write(daughter_pos + daughter_size - 1, 0);
            mutation_count += 1;
        }

        // 6. Segment crossover.
        if let Some((mate_pos, mate_size)) = mate {
            if Self::gated(self.config.gen_per_cro_seg, rng) {
                let daughter_segs = Self::find_segments(soup, daughter_pos, daughter_size);
                let mate_segs = Self::find_segments(soup, mate_pos, mate_size);
                if let (Some(&(d_start, d_len)), Some(&(m_start, m_len))) = (
                    pick(&daughter_segs, rng),
                    pick(&mate_segs, rng),
                ) {
                    let copy_len = d_len.min(m_len);
                    for i in 0..copy_len {
                        let value = soup.read(m_start + i);
                        soup.write(d_start + i, value);
                    }
                    mutation_count += 1;
                }
            }
        }

        // 7. Segment insertion: duplicate a random daughter segment, shifting tail right.
        if Self::gated(self.config.gen_per_ins_seg, rng) {
            let segs = Self::find_segments(soup, daughter_pos, daughter_size);
            if let Some(&(seg_start, seg_len)) = pick(&segs, rng) {
                let insert_at = seg_start - daughter_pos;
                let available = daughter_size - insert_at;
                let copy_len = seg_len.min(available);
                let shift_len = daughter_size - insert_at - copy_len;
                for i in (0..shift_len).rev() {
                    let value = soup.read(daughter_pos + insert_at + i);
                    soup.write(daughter_pos + insert_at + copy_len + i, value);
                }
                for i in 0..copy_len {
                    let value = soup.read(seg_start + i);
                    soup.write(daughter_pos + insert_at + i, value);
                }
                mutation_count += 1;
            }
        }

        // 8. Segment deletion: left-shift out a random segment, zero the tail.
        if daughter_size > self.config.min_cell_size && Self::gated(self.config.gen_per_del_seg, rng) {
            let segs = Self::find_segments(soup, daughter_pos, daughter_size);
            if let Some(&(seg_start, seg_len)) = pick(&segs, rng) {
                let remove_at = seg_start - daughter_pos;
                if daughter_size - seg_len >= self.config.min_cell_size {
                    for i in remove_at..daughter_size - seg_len {
                        let value = soup.read(daughter_pos + i + seg_len);
                        soup.write(daughter_pos + i, value);
                    }
                    for i in daughter_size - seg_len..daughter_size {
                        soup.write(daughter_pos + i, 0);
                    }
                    mutation_count += 1;
                }
            }
        }

        mutation_count
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}
