//! `si0`-style configuration: `Key = Value` pairs, inline `#` comments, and
//! a trailing inoculation list (spec §6). Grounded in PyTierra's
//! `config.py`. Missing or unparseable keys fall back to defaults silently
//! (spec §7); this is config-at-load-time, the one place the crate
//! surfaces `Error` to the driver — for I/O failures, never for a bad key.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InoculationPosition {
    Center,
    Random,
}

#[derive(Debug, Clone)]
pub struct Inoculation {
    pub position: InoculationPosition,
    pub genome_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub soup_size: usize,
    pub slice_size: usize,
    pub siz_dep_slice: bool,
    pub slice_pow: f64,
    pub slice_style: u32,
    pub slic_fix_frac: f64,
    pub slic_ran_frac: f64,

    pub gen_per_bkg_mut: f64,
    pub gen_per_flaw: f64,
    pub gen_per_mov_mut: f64,
    pub gen_per_div_mut: f64,
    pub gen_per_ins_ins: f64,
    pub gen_per_del_ins: f64,
    pub gen_per_cro_ins: f64,
    pub gen_per_cro_ins_sam_siz: f64,
    pub gen_per_cro_seg: f64,
    pub gen_per_ins_seg: f64,
    pub gen_per_del_seg: f64,
    pub mut_bit_prop: f64,

    pub mal_mode: String,
    pub mal_reap_tol: f64,
    pub mal_tol: f64,
    pub max_free_blocks: usize,

    pub min_cell_size: usize,
    pub search_limit: f64,
    pub mov_prop_thr_div: f64,

    pub reap_rnd_prop: f64,
    pub lazy_tol: f64,
    pub drop_dead: bool,

    pub div_same_gen: bool,
    pub div_same_siz: bool,

    pub dist_freq: f64,
    pub dist_prop: f64,

    pub mem_mode_free: u8,
    pub mem_mode_mine: u8,
    pub mem_mode_prot: u8,

    pub save_freq: u64,
    pub sav_min_num: u64,
    pub sav_thr_mem: f64,
    pub sav_thr_pop: u64,
    pub genebank_path: String,

    pub seed: u64,

    #[serde(skip)]
    pub inoculations: Vec<Inoculation>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soup_size: 60_000,
            slice_size: 25,
            siz_dep_slice: false,
            slice_pow: 1.0,
            slice_style: 1,
            slic_fix_frac: 1.0,
            slic_ran_frac: 0.0,

            gen_per_bkg_mut: 0.0,
            gen_per_flaw: 0.0,
            gen_per_mov_mut: 0.0,
            gen_per_div_mut: 0.0,
            gen_per_ins_ins: 0.0,
            gen_per_del_ins: 0.0,
            gen_per_cro_ins: 0.0,
            gen_per_cro_ins_sam_siz: 0.0,
            gen_per_cro_seg: 0.0,
            gen_per_ins_seg: 0.0,
            gen_per_del_seg: 0.0,
            mut_bit_prop: 0.5,

            mal_mode: "better_fit".to_string(),
            mal_reap_tol: 0.0,
            mal_tol: 0.0,
            max_free_blocks: 10_000,

            min_cell_size: 10,
            search_limit: 1.0,
            mov_prop_thr_div: 0.5,

            reap_rnd_prop: 0.1,
            lazy_tol: 4.0,
            drop_dead: false,

            div_same_gen: false,
            div_same_siz: false,

            dist_freq: 0.0,
            dist_prop: 0.2,

            mem_mode_free: 0,
            mem_mode_mine: 0,
            mem_mode_prot: 0,

            save_freq: 0,
            sav_min_num: 0,
            sav_thr_mem: 0.0,
            sav_thr_pop: 0,
            genebank_path: "genebank".to_string(),

            seed: 0,
            inoculations: Vec::new(),
        }
    }
}

fn si0_key_to_field(key: &str) -> &'static str {
    match key.to_ascii_lowercase().as_str() {
        "soupsize" => "soup_size",
        "slicesize" => "slice_size",
        "sizdepslice" => "siz_dep_slice",
        "slicepow" => "slice_pow",
        "slicestyle" => "slice_style",
        "slicfixfrac" => "slic_fix_frac",
        "slicranfrac" => "slic_ran_frac",
        "genperbkgmut" => "gen_per_bkg_mut",
        "genperflaw" => "gen_per_flaw",
        "genpermovmut" => "gen_per_mov_mut",
        "genperdivmut" => "gen_per_div_mut",
        "genperinsins" => "gen_per_ins_ins",
        "genperdelins" => "gen_per_del_ins",
        "genpercroins" => "gen_per_cro_ins",
        "genpercroinssamsiz" => "gen_per_cro_ins_sam_siz",
        "genpercroseg" => "gen_per_cro_seg",
        "geninsseg" | "geninssegalt" => "gen_per_ins_seg",
        "genperinsseg" => "gen_per_ins_seg",
        "genperdelseg" => "gen_per_del_seg",
        "mutbitprop" => "mut_bit_prop",
        "malmode" => "mal_mode",
        "malreaptol" => "mal_reap_tol",
        "maltol" => "mal_tol",
        "maxfreeblocks" => "max_free_blocks",
        "mincellsize" => "min_cell_size",
        "searchlimit" => "search_limit",
        "movpropthrdiv" => "mov_prop_thr_div",
        "reaprndprop" => "reap_rnd_prop",
        "lazytol" => "lazy_tol",
        "dropdead" => "drop_dead",
        "divsamegen" => "div_same_gen",
        "divsamesiz" => "div_same_siz",
        "distfreq" => "dist_freq",
        "distprop" => "dist_prop",
        "memmodefree" => "mem_mode_free",
        "memmodemine" => "mem_mode_mine",
        "memmodeprot" => "mem_mode_prot",
        "savefreq" => "save_freq",
        "savminnum" => "sav_min_num",
        "savthrmem" => "sav_thr_mem",
        "savthrpop" => "sav_thr_pop",
        "genebankpath" => "genebank_path",
        "seed" => "seed",
        _ => "",
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Parses the `si0` text format, silently keeping defaults for any
    /// key that fails to parse or isn't recognized.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut in_inoculation_list = false;
        let mut position = InoculationPosition::Center;

        for raw_line in text.lines() {
            let without_comment = match raw_line.find('#') {
                Some(idx) => &raw_line[..idx],
                None => raw_line,
            };
            let line = without_comment.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();
                config.apply(key, value);
                in_inoculation_list = false;
            } else {
                in_inoculation_list = true;
                match line.to_ascii_lowercase().as_str() {
                    "center" => position = InoculationPosition::Center,
                    "random" => position = InoculationPosition::Random,
                    _ => config.inoculations.push(Inoculation {
                        position,
                        genome_name: line.to_string(),
                    }),
                }
            }
        }
        let _ = in_inoculation_list;
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        macro_rules! set_num {
            ($field:ident) => {
                if let Ok(v) = value.parse() {
                    self.$field = v;
                }
            };
        }
        macro_rules! set_bool {
            ($field:ident) => {
                self.$field = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
            };
        }

        match si0_key_to_field(key) {
            "soup_size" => set_num!(soup_size),
            "slice_size" => set_num!(slice_size),
            "siz_dep_slice" => set_bool!(siz_dep_slice),
            "slice_pow" => set_num!(slice_pow),
            "slice_style" => set_num!(slice_style),
            "slic_fix_frac" => set_num!(slic_fix_frac),
            "slic_ran_frac" => set_num!(slic_ran_frac),
            "gen_per_bkg_mut" => set_num!(gen_per_bkg_mut),
            "gen_per_flaw" => set_num!(gen_per_flaw),
            "gen_per_mov_mut" => set_num!(gen_per_mov_mut),
            "gen_per_div_mut" => set_num!(gen_per_div_mut),
            "gen_per_ins_ins" => set_num!(gen_per_ins_ins),
            "gen_per_del_ins" => set_num!(gen_per_del_ins),
            "gen_per_cro_ins" => set_num!(gen_per_cro_ins),
            "gen_per_cro_ins_sam_siz" => set_num!(gen_per_cro_ins_sam_siz),
            "gen_per_cro_seg" => set_num!(gen_per_cro_seg),
            "gen_per_ins_seg" => set_num!(gen_per_ins_seg),
            "gen_per_del_seg" => set_num!(gen_per_del_seg),
            "mut_bit_prop" => set_num!(mut_bit_prop),
            "mal_mode" => self.mal_mode = value.to_string(),
            "mal_reap_tol" => set_num!(mal_reap_tol),
            "mal_tol" => set_num!(mal_tol),
            "max_free_blocks" => set_num!(max_free_blocks),
            "min_cell_size" => set_num!(min_cell_size),
            "search_limit" => set_num!(search_limit),
            "mov_prop_thr_div" => set_num!(mov_prop_thr_div),
            "reap_rnd_prop" => set_num!(reap_rnd_prop),
            "lazy_tol" => set_num!(lazy_tol),
            "drop_dead" => set_bool!(drop_dead),
            "div_same_gen" => set_bool!(div_same_gen),
            "div_same_siz" => set_bool!(div_same_siz),
            "dist_freq" => set_num!(dist_freq),
            "dist_prop" => set_num!(dist_prop),
            "mem_mode_free" => set_num!(mem_mode_free),
            "mem_mode_mine" => set_num!(mem_mode_mine),
            "mem_mode_prot" => set_num!(mem_mode_prot),
            "save_freq" => set_num!(save_freq),
            "sav_min_num" => set_num!(sav_min_num),
            "sav_thr_mem" => set_num!(sav_thr_mem),
            "sav_thr_pop" => set_num!(sav_thr_pop),
            "genebank_path" => self.genebank_path = value.to_string(),
            "seed" => set_num!(seed),
            _ => {} // unknown keys are ignored, per spec §7
        }
    }
}
