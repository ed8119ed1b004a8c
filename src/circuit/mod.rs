//! The wrapper circuit: an interpreter over the gate program emitted by
//! the recursion compiler, bound to one witness input.
//!
//! The compiler hands this crate two JSON files: a constraint program (the
//! circuit description) and a witness (the assignment). The circuit's only
//! public inputs are the riscv vkey hash and the committed-values digest;
//! everything else is private. `ConstraintSynthesizer` is the seam other
//! proving backends implement against.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::{One, Zero};
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{ProverError, Result};
use crate::fields::{FieldChip, FieldKind, FieldVariable};
use crate::poseidon2::{Poseidon2Chip, WIDTH};

/// Decimal-string witness description produced by the recursion compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessInput {
    pub vars: Vec<String>,
    pub felts: Vec<String>,
    pub exts: Vec<[String; 4]>,
    pub vkey_hash: String,
    pub committed_values_digest: String,
}

impl WitnessInput {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Service-mode payloads arrive hex-wrapped.
    pub fn from_hex(payload: &str) -> Result<Self> {
        let bytes = hex::decode(payload.trim())?;
        Self::from_json(&bytes)
    }

    /// The circuit's public input vector, in allocation order.
    pub fn public_inputs(&self) -> Result<Vec<Fr>> {
        Ok(vec![
            parse_fr(&self.vkey_hash)?,
            parse_fr(&self.committed_values_digest)?,
        ])
    }
}

/// One gate of the circuit description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub opcode: String,
    pub args: Vec<String>,
}

pub type ConstraintProgram = Vec<Constraint>;

pub fn read_witness(path: &Path) -> Result<WitnessInput> {
    WitnessInput::from_json(&fs::read(path)?)
}

pub fn read_program(path: &Path) -> Result<Arc<ConstraintProgram>> {
    Ok(Arc::new(serde_json::from_slice(&fs::read(path)?)?))
}

/// Expected argument count per opcode; `None` marks variable arity.
fn arity(opcode: &str) -> Option<usize> {
    match opcode {
        "ImmV" | "ImmF" | "WitnessV" | "WitnessF" | "WitnessE" => Some(2),
        "AddV" | "SubV" | "MulV" | "AddF" | "SubF" | "MulF" | "MulFConst" | "AddE" | "SubE"
        | "MulE" => Some(3),
        "SelectV" | "SelectF" => Some(4),
        "AssertEqV" | "AssertEqF" | "AssertEqE" => Some(2),
        "Permute" => Some(WIDTH),
        "CommitVkeyHash" | "CommitCommittedValuesDigest" => Some(1),
        _ => None,
    }
}

/// The circuit bound to one assignment.
#[derive(Clone)]
pub struct WrapperCircuit {
    pub field: FieldKind,
    pub program: Arc<ConstraintProgram>,
    pub witness: WitnessInput,
}

impl WrapperCircuit {
    pub fn new(field: FieldKind, program: Arc<ConstraintProgram>, witness: WitnessInput) -> Self {
        Self { field, program, witness }
    }

    /// Validate the program and witness before synthesis so malformed
    /// input surfaces as a serialization error, not a solver failure.
    pub fn check(&self) -> Result<()> {
        for (value, kind) in self
            .witness
            .vars
            .iter()
            .chain([&self.witness.vkey_hash, &self.witness.committed_values_digest])
            .map(|v| (v, "var"))
            .chain(self.witness.felts.iter().map(|v| (v, "felt")))
            .chain(self.witness.exts.iter().flatten().map(|v| (v, "ext")))
        {
            BigUint::from_str(value).map_err(|_| {
                ProverError::Serialization(format!("bad {kind} decimal {value:?}"))
            })?;
        }

        for gate in self.program.iter() {
            let expected = arity(&gate.opcode).ok_or_else(|| {
                ProverError::Serialization(format!("unknown opcode {:?}", gate.opcode))
            })?;
            if gate.args.len() != expected {
                return Err(ProverError::Serialization(format!(
                    "opcode {:?} expects {} args, got {}",
                    gate.opcode,
                    expected,
                    gate.args.len()
                )));
            }
            match gate.opcode.as_str() {
                "WitnessV" => self.check_index(&gate.args[1], self.witness.vars.len())?,
                "WitnessF" => self.check_index(&gate.args[1], self.witness.felts.len())?,
                "WitnessE" => self.check_index(&gate.args[1], self.witness.exts.len())?,
                "ImmV" | "ImmF" | "MulFConst" => {
                    let literal = gate.args.last().unwrap_or(&gate.args[0]);
                    BigUint::from_str(literal).map_err(|_| {
                        ProverError::Serialization(format!("bad literal {literal:?}"))
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_index(&self, raw: &str, len: usize) -> Result<()> {
        let idx: usize = raw
            .parse()
            .map_err(|_| ProverError::Serialization(format!("bad witness index {raw:?}")))?;
        if idx >= len {
            return Err(ProverError::Serialization(format!(
                "witness index {idx} out of range ({len} entries)"
            )));
        }
        Ok(())
    }
}

impl ConstraintSynthesizer<Fr> for WrapperCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> std::result::Result<(), SynthesisError> {
        let mut chip = Poseidon2Chip::new(cs.clone(), self.field);
        let field = FieldChip::new(cs.clone(), self.field.spec());

        // Pre-parsed assignments; synthesis in setup mode never reads them.
        let var_values: Vec<Fr> = self.witness.vars.iter().map(|v| parse_fr_or_zero(v)).collect();
        let felt_values: Vec<BigUint> =
            self.witness.felts.iter().map(|v| parse_biguint_or_zero(v)).collect();
        let ext_values: Vec<[BigUint; 4]> = self
            .witness
            .exts
            .iter()
            .map(|coords| std::array::from_fn(|i| parse_biguint_or_zero(&coords[i])))
            .collect();

        // Public inputs, fixed allocation order.
        let vkey_hash = {
            let v = parse_fr_or_zero(&self.witness.vkey_hash);
            FpVar::new_input(cs.clone(), || Ok(v))?
        };
        let committed_values_digest = {
            let v = parse_fr_or_zero(&self.witness.committed_values_digest);
            FpVar::new_input(cs.clone(), || Ok(v))?
        };

        let mut vars: HashMap<String, FpVar<Fr>> = HashMap::new();
        let mut felts: HashMap<String, FieldVariable> = HashMap::new();
        let mut exts: HashMap<String, [FieldVariable; 4]> = HashMap::new();

        for gate in self.program.iter() {
            let args = &gate.args;
            match gate.opcode.as_str() {
                "ImmV" => {
                    vars.insert(args[0].clone(), FpVar::constant(parse_fr_or_zero(&args[1])));
                }
                "ImmF" => {
                    let constant = FieldChip::from_decimal(&args[1])
                        .ok_or(SynthesisError::AssignmentMissing)?;
                    felts.insert(args[0].clone(), constant);
                }
                "WitnessV" => {
                    let value = indexed(&var_values, &args[1]).copied().unwrap_or_default();
                    vars.insert(args[0].clone(), FpVar::new_witness(cs.clone(), || Ok(value))?);
                }
                "WitnessF" => {
                    let value = indexed(&felt_values, &args[1]).cloned().unwrap_or_default();
                    felts.insert(args[0].clone(), field.alloc_witness(Some(&value))?);
                }
                "WitnessE" => {
                    let coords = indexed(&ext_values, &args[1]).cloned().unwrap_or_default();
                    let mut allocated: Vec<FieldVariable> = Vec::with_capacity(4);
                    for coord in coords.iter() {
                        allocated.push(field.alloc_witness(Some(coord))?);
                    }
                    exts.insert(args[0].clone(), to_quartic(allocated)?);
                }
                "AddV" => {
                    let out = reg(&vars, &args[1])? + reg(&vars, &args[2])?;
                    vars.insert(args[0].clone(), out);
                }
                "SubV" => {
                    let out = reg(&vars, &args[1])? - reg(&vars, &args[2])?;
                    vars.insert(args[0].clone(), out);
                }
                "MulV" => {
                    let out = reg(&vars, &args[1])? * reg(&vars, &args[2])?;
                    vars.insert(args[0].clone(), out);
                }
                "AddF" => {
                    let out = field.add(reg(&felts, &args[1])?, reg(&felts, &args[2])?)?;
                    felts.insert(args[0].clone(), out);
                }
                "SubF" => {
                    let out = field.sub(reg(&felts, &args[1])?, reg(&felts, &args[2])?)?;
                    felts.insert(args[0].clone(), out);
                }
                "MulF" => {
                    let out = field.mul(reg(&felts, &args[1])?, reg(&felts, &args[2])?)?;
                    felts.insert(args[0].clone(), out);
                }
                "MulFConst" => {
                    let literal = parse_biguint_or_zero(&args[2]);
                    let k = u32::try_from(&literal).map_err(|_| SynthesisError::AssignmentMissing)?;
                    let out = field.mul_const(reg(&felts, &args[1])?, k)?;
                    felts.insert(args[0].clone(), out);
                }
                "AddE" | "SubE" => {
                    let a = reg(&exts, &args[1])?.clone();
                    let b = reg(&exts, &args[2])?.clone();
                    let mut out: Vec<FieldVariable> = Vec::with_capacity(4);
                    for (x, y) in a.iter().zip(b.iter()) {
                        out.push(if gate.opcode == "AddE" {
                            field.add(x, y)?
                        } else {
                            field.sub(x, y)?
                        });
                    }
                    exts.insert(args[0].clone(), to_quartic(out)?);
                }
                "MulE" => {
                    let a = reg(&exts, &args[1])?.clone();
                    let b = reg(&exts, &args[2])?.clone();
                    exts.insert(args[0].clone(), mul_quartic(&field, &a, &b)?);
                }
                "SelectV" => {
                    let cond = reg(&vars, &args[1])?.clone();
                    enforce_boolean(&cond)?;
                    let a = reg(&vars, &args[2])?.clone();
                    let b = reg(&vars, &args[3])?.clone();
                    vars.insert(args[0].clone(), &b + cond.clone() * (a - &b));
                }
                "SelectF" => {
                    let cond = reg(&vars, &args[1])?.clone();
                    enforce_boolean(&cond)?;
                    let a = reg(&felts, &args[2])?.clone();
                    let b = reg(&felts, &args[3])?.clone();
                    // The selected value equals a or b exactly, so the
                    // larger bound covers both branches.
                    let upper_bound = a.upper_bound.clone().max(b.upper_bound.clone());
                    let value = &b.value + cond.clone() * (&a.value - &b.value);
                    felts.insert(args[0].clone(), FieldVariable { value, upper_bound });
                }
                "AssertEqV" => {
                    reg(&vars, &args[0])?.enforce_equal(reg(&vars, &args[1])?)?;
                }
                "AssertEqF" => {
                    field.assert_eq(reg(&felts, &args[0])?, reg(&felts, &args[1])?)?;
                }
                "AssertEqE" => {
                    let a = reg(&exts, &args[0])?.clone();
                    let b = reg(&exts, &args[1])?.clone();
                    for (x, y) in a.iter().zip(b.iter()) {
                        field.assert_eq(x, y)?;
                    }
                }
                "Permute" => {
                    let mut state: Vec<FieldVariable> = Vec::with_capacity(WIDTH);
                    for name in args.iter() {
                        state.push(reg(&felts, name)?.clone());
                    }
                    let mut state: [FieldVariable; WIDTH] =
                        state.try_into().map_err(|_| SynthesisError::AssignmentMissing)?;
                    chip.permute_mut(&mut state)?;
                    for (name, lane) in args.iter().zip(state.into_iter()) {
                        felts.insert(name.clone(), lane);
                    }
                }
                "CommitVkeyHash" => {
                    reg(&vars, &args[0])?.enforce_equal(&vkey_hash)?;
                }
                "CommitCommittedValuesDigest" => {
                    reg(&vars, &args[0])?.enforce_equal(&committed_values_digest)?;
                }
                _ => return Err(SynthesisError::AssignmentMissing),
            }
        }
        Ok(())
    }
}

fn enforce_boolean(cond: &FpVar<Fr>) -> std::result::Result<(), SynthesisError> {
    (cond.clone() * (cond - FpVar::constant(Fr::one()))).enforce_equal(&FpVar::zero())
}

fn mul_quartic(
    field: &FieldChip,
    a: &[FieldVariable; 4],
    b: &[FieldVariable; 4],
) -> std::result::Result<[FieldVariable; 4], SynthesisError> {
    let w = field.spec().ext_binomial;
    let mut out: Vec<FieldVariable> = Vec::with_capacity(4);
    for k in 0..4 {
        let mut acc = FieldChip::zero();
        for i in 0..4 {
            for j in 0..4 {
                if i + j == k {
                    acc = field.add(&acc, &field.mul(&a[i], &b[j])?)?;
                } else if i + j == k + 4 {
                    let folded = field.mul_const(&field.mul(&a[i], &b[j])?, w)?;
                    acc = field.add(&acc, &folded)?;
                }
            }
        }
        out.push(field.reduce_slow(&acc)?);
    }
    to_quartic(out)
}

fn to_quartic(
    coords: Vec<FieldVariable>,
) -> std::result::Result<[FieldVariable; 4], SynthesisError> {
    coords.try_into().map_err(|_| SynthesisError::AssignmentMissing)
}

fn reg<'m, T>(
    map: &'m HashMap<String, T>,
    name: &str,
) -> std::result::Result<&'m T, SynthesisError> {
    map.get(name).ok_or(SynthesisError::AssignmentMissing)
}

fn indexed<'v, T>(values: &'v [T], raw: &str) -> Option<&'v T> {
    raw.parse::<usize>().ok().and_then(|idx| values.get(idx))
}

pub(crate) fn parse_fr(raw: &str) -> Result<Fr> {
    let v = BigUint::from_str(raw)
        .map_err(|_| ProverError::Serialization(format!("bad decimal {raw:?}")))?;
    Ok(Fr::from(v))
}

fn parse_fr_or_zero(raw: &str) -> Fr {
    BigUint::from_str(raw).map(Fr::from).unwrap_or_else(|_| Fr::zero())
}

fn parse_biguint_or_zero(raw: &str) -> BigUint {
    BigUint::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn gate(opcode: &str, args: &[&str]) -> Constraint {
        Constraint {
            opcode: opcode.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A program exercising every register file: hash two felts, compare
    /// against a witnessed expectation, and bind the public commitments.
    fn sample_program() -> ConstraintProgram {
        vec![
            gate("WitnessV", &["vk", "0"]),
            gate("WitnessV", &["digest", "1"]),
            gate("WitnessF", &["x0", "0"]),
            gate("WitnessF", &["x1", "1"]),
            gate("AddF", &["sum", "x0", "x1"]),
            gate("MulF", &["prod", "x0", "x1"]),
            gate("WitnessF", &["want_sum", "2"]),
            gate("WitnessF", &["want_prod", "3"]),
            gate("AssertEqF", &["sum", "want_sum"]),
            gate("AssertEqF", &["prod", "want_prod"]),
            gate("CommitVkeyHash", &["vk"]),
            gate("CommitCommittedValuesDigest", &["digest"]),
        ]
    }

    fn sample_witness(kind: FieldKind) -> WitnessInput {
        let p = u64::from(kind.spec().prime);
        let x0 = p - 3;
        let x1 = 7u64;
        WitnessInput {
            vars: vec!["1234".into(), "5678".into()],
            felts: vec![
                x0.to_string(),
                x1.to_string(),
                ((x0 + x1) % p).to_string(),
                ((u128::from(x0) * u128::from(x1) % u128::from(p)).to_string()),
            ],
            exts: vec![],
            vkey_hash: "1234".into(),
            committed_values_digest: "5678".into(),
        }
    }

    #[test]
    fn sample_program_is_satisfied() {
        for kind in [FieldKind::BabyBear, FieldKind::KoalaBear] {
            let circuit = WrapperCircuit::new(
                kind,
                Arc::new(sample_program()),
                sample_witness(kind),
            );
            circuit.check().unwrap();

            let cs = ConstraintSystem::<Fr>::new_ref();
            circuit.generate_constraints(cs.clone()).unwrap();
            assert!(cs.is_satisfied().unwrap());
        }
    }

    #[test]
    fn tampered_felt_fails_constraints() {
        let mut witness = sample_witness(FieldKind::BabyBear);
        witness.felts[3] = "11".into();
        let circuit =
            WrapperCircuit::new(FieldKind::BabyBear, Arc::new(sample_program()), witness);

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn unknown_opcode_is_a_serialization_error() {
        let circuit = WrapperCircuit::new(
            FieldKind::BabyBear,
            Arc::new(vec![gate("Frobenius", &["a", "b"])]),
            sample_witness(FieldKind::BabyBear),
        );
        assert!(matches!(circuit.check(), Err(ProverError::Serialization(_))));
    }

    #[test]
    fn quartic_mul_matches_schoolbook() {
        let kind = FieldKind::BabyBear;
        let p = u128::from(kind.spec().prime);
        let w = u128::from(kind.spec().ext_binomial);
        let a = [3u128, 1, 4, 1];
        let b = [2u128, 7, 1, 8];

        let mut want = [0u128; 4];
        for i in 0..4 {
            for j in 0..4 {
                if i + j < 4 {
                    want[i + j] = (want[i + j] + a[i] * b[j]) % p;
                } else {
                    want[i + j - 4] = (want[i + j - 4] + w * a[i] * b[j]) % p;
                }
            }
        }

        let witness = WitnessInput {
            vars: vec![],
            felts: vec![],
            exts: vec![
                std::array::from_fn(|i| a[i].to_string()),
                std::array::from_fn(|i| b[i].to_string()),
                std::array::from_fn(|i| want[i].to_string()),
            ],
            vkey_hash: "0".into(),
            committed_values_digest: "0".into(),
        };
        let program = vec![
            gate("WitnessE", &["a", "0"]),
            gate("WitnessE", &["b", "1"]),
            gate("WitnessE", &["want", "2"]),
            gate("MulE", &["got", "a", "b"]),
            gate("AssertEqE", &["got", "want"]),
        ];

        let circuit = WrapperCircuit::new(kind, Arc::new(program), witness);
        circuit.check().unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
