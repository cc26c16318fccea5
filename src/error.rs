//! Driver-facing error types.
//!
//! VM-internal faults (protection denials, allocation failures, arithmetic
//! flaws) never surface here — they are recorded on the creature's `E` flag
//! and execution continues (spec §7). Only configuration and genome-file
//! problems reach the caller as a `Result`, and even those are tolerated with
//! defaults wherever the format allows it.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("genome file {path} contained no CODE section")]
    GenomeMissingCode { path: PathBuf },

    #[error("genome file {path} contains no instructions after CODE")]
    GenomeEmpty { path: PathBuf },

    #[error("no cells could be booted into the soup")]
    NoCellsBooted,

    #[error("soup size {requested} is too small to hold ancestor genome of length {genome_len}")]
    SoupTooSmall { requested: usize, genome_len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
