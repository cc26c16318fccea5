//! `.tie` genome file reader/writer (spec §6). Grounded in PyTierra's
//! `genome_io.py`.

use crate::error::{Error, Result};
use crate::instruction::Instruction;
use std::path::Path;

/// Parses a `.tie` file: a free-form header, a bare `CODE` line, then one
/// instruction mnemonic per line. Blank lines, `;`-comments, and `track`
/// lines after `CODE` are ignored; trailing `; comment` text on an
/// instruction line is stripped before the mnemonic is read.
pub fn load_genome(path: &Path) -> Result<Vec<Instruction>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut lines = text.lines();
    let found_code = lines.by_ref().any(|line| line.trim() == "CODE");
    if !found_code {
        return Err(Error::GenomeMissingCode {
            path: path.to_path_buf(),
        });
    }

    let mut genome = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with("track") {
            continue;
        }
        let token = trimmed.split(';').next().unwrap_or("").trim();
        let token = token.split_whitespace().next().unwrap_or("");
        if token.is_empty() {
            continue;
        }
        if let Some(inst) = Instruction::from_mnemonic(token) {
            genome.push(inst);
        }
    }

    if genome.is_empty() {
        return Err(Error::GenomeEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(genome)
}

/// Writes a `.tie` file with a brief header and one instruction per line.
pub fn save_genome(
    path: &Path,
    genome: &[Instruction],
    name: &str,
    parent: &str,
) -> Result<()> {
    let mut out = String::new();
    out.push_str("format: 3  bits: 0\n");
    out.push_str(&format!("genotype: {name}\n"));
    out.push_str(&format!("parent genotype: {parent}\n"));
    out.push_str("CODE\n");
    out.push_str("track 0:\n");
    for (i, inst) in genome.iter().enumerate() {
        out.push_str(&format!("{:<12}; {:3}\n", inst.mnemonic(), i));
    }
    std::fs::write(path, out).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
