//! Input loading: exactly one circuit source per invocation.
//!
//! Only the serialized-IR path is self-contained. Raw bytes (and the
//! seed-debug wrapper around them) go through an instruction lifter, and
//! SMT input goes through an SMT frontend; both are external collaborators
//! behind the [`Lifter`] seam, so the shipped binary reports a load failure
//! for them unless a real implementation is wired in.

use std::fs::File;
use std::path::{Path, PathBuf};

use circ_ir::Circuit;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse serialized circuit {path}: {source}")]
    Parse {
        path: PathBuf,
        source: circ_ir::SerializeError,
    },
    #[error("invalid hex byte string: {0}")]
    BadHex(String),
    #[error("seed-debug file {0} contains no byte string")]
    EmptyCiff(PathBuf),
    #[error("{0}")]
    Lifter(String),
}

/// Lifts raw instruction bytes into a circuit. The in-tree default refuses
/// every input; a real lifter is linked in by downstream tooling.
pub trait Lifter {
    fn lift(&self, bytes: &[u8], arch: &str, os: &str) -> Result<Circuit, LoadError>;
}

pub struct NullLifter;

impl Lifter for NullLifter {
    fn lift(&self, _bytes: &[u8], arch: &str, _os: &str) -> Result<Circuit, LoadError> {
        Err(LoadError::Lifter(format!(
            "no instruction lifter is linked into this build (arch {arch:?})"
        )))
    }
}

/// The selected input source, after CLI validation.
pub enum Input {
    /// Hex string of raw instruction bytes.
    Bytes(String),
    /// Serialized circuit IR file.
    IrFile(PathBuf),
    /// SMT2 file.
    SmtFile(PathBuf),
    /// Seed-debug file wrapping a hex byte string.
    CiffFile(PathBuf),
}

pub fn load_circuit(
    input: &Input,
    lifter: &dyn Lifter,
    arch: &str,
    os: &str,
) -> Result<Circuit, LoadError> {
    match input {
        Input::IrFile(path) => {
            let file = File::open(path).map_err(|source| LoadError::Open {
                path: path.clone(),
                source,
            })?;
            Circuit::from_json(file).map_err(|source| LoadError::Parse {
                path: path.clone(),
                source,
            })
        }
        Input::Bytes(hex) => lifter.lift(&decode_hex(hex)?, arch, os),
        Input::CiffFile(path) => {
            let bytes = read_ciff(path)?;
            lifter.lift(&bytes, arch, os)
        }
        Input::SmtFile(path) => Err(LoadError::Lifter(format!(
            "no SMT frontend is linked into this build ({})",
            path.display()
        ))),
    }
}

pub fn decode_hex(hex: &str) -> Result<Vec<u8>, LoadError> {
    let cleaned: String = hex.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        return Err(LoadError::BadHex(hex.to_string()));
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16).map_err(|_| LoadError::BadHex(hex.to_string()))
        })
        .collect()
}

/// Unwraps a seed-debug file: comment lines (`#`) are skipped, the first
/// remaining line's first token is the hex byte string.
pub fn read_ciff(path: &Path) -> Result<Vec<u8>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let token = line.split_whitespace().next().expect("line is non-empty");
        return decode_hex(token);
    }
    Err(LoadError::EmptyCiff(path.to_path_buf()))
}
