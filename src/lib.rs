//! EVM recursion boundary for a zkVM: wraps an embedded recursive proof
//! into a BN254 Groth16 proof a verifier contract can check.
//!
//! The crate has four layers, leaves first:
//! - `fields`: non-native arithmetic for a 31-bit prime (BabyBear or
//!   KoalaBear) inside the BN254 scalar field, with lazy-reduction bound
//!   tracking.
//! - `poseidon2`: the width-16 permutation chip and sponge built on that
//!   gadget, one routine parameterized per field.
//! - `circuit`: the wrapper circuit — an interpreter over the gate
//!   program and witness JSON the recursion compiler emits.
//! - `prover`: the Groth16 lifecycle (setup / load / solve / prove with
//!   self-verification / export) plus the on-chain proof encoder; served
//!   over HTTP by `server`.

pub mod circuit;
pub mod config;
pub mod error;
pub mod fields;
pub mod poseidon2;
pub mod prover;
pub mod server;

pub use circuit::{Constraint, ConstraintProgram, WitnessInput, WrapperCircuit};
pub use config::ProverConfig;
pub use error::{ProverError, Result};
pub use fields::{FieldChip, FieldKind, FieldSpec, FieldVariable};
pub use poseidon2::Poseidon2Chip;
pub use prover::ProverService;
