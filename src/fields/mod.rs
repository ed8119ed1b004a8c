//! Small-field parameterization and the non-native arithmetic gadget.
//!
//! The wrapper circuit is native to the BN254 scalar field but re-derives
//! hashes computed over a 31-bit prime field. Everything field-specific
//! (prime, S-box degree, round counts, diffusion diagonal, extension
//! binomial) lives in a [`FieldSpec`] value object so the permutation and
//! the gadget are written once and parameterized at construction time.

mod babybear;
mod emulated;
mod koalabear;

pub use babybear::BABY_BEAR;
pub use emulated::{FieldChip, FieldVariable, LAZY_REDUCE_BITS, MAX_BOUND_BITS};
pub use koalabear::KOALA_BEAR;

use std::fmt;
use std::str::FromStr;

use crate::error::ProverError;

/// Field selector as it appears in configuration (`bb` / `kb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    BabyBear,
    KoalaBear,
}

impl FieldKind {
    pub fn spec(self) -> &'static FieldSpec {
        match self {
            FieldKind::BabyBear => &BABY_BEAR,
            FieldKind::KoalaBear => &KOALA_BEAR,
        }
    }
}

impl FromStr for FieldKind {
    type Err = ProverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bb" | "babybear" => Ok(FieldKind::BabyBear),
            "kb" | "koalabear" => Ok(FieldKind::KoalaBear),
            other => Err(ProverError::UnsupportedField(other.to_string())),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::BabyBear => write!(f, "bb"),
            FieldKind::KoalaBear => write!(f, "kb"),
        }
    }
}

/// Per-field description consumed by the gadget and the permutation chip.
#[derive(Debug)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub name: &'static str,
    pub prime: u32,
    /// Fixed small odd S-box exponent.
    pub sbox_degree: u32,
    /// Total external (full S-box) rounds; split half before, half after
    /// the internal rounds.
    pub external_rounds: usize,
    /// Partial (lane-0 S-box) rounds.
    pub internal_rounds: usize,
    /// W in the irreducible quartic binomial x⁴ − W of the field's
    /// degree-4 extension.
    pub ext_binomial: u32,
    /// Diagonal of the internal diffusion matrix (the `M_I − J` part).
    pub diagonal: [u32; 16],
}
