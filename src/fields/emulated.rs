//! Non-native field arithmetic over the BN254 scalar field.
//!
//! A small-field element is carried as a native field value together with a
//! tracked upper bound on its un-reduced integer magnitude. Linear
//! operations let the bound grow instead of paying for a modular reduction;
//! a reduction is forced only when a later range check would stop pinning
//! down the residue mod p.

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, One, PrimeField, Zero};
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_r1cs_std::R1CSVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;

use super::FieldSpec;

/// Bounds at or above this bit length trigger an eager reduction. Two
/// operands below the threshold multiply to < 2^240, which still leaves
/// room for the quotient/remainder identity inside the native field.
pub const LAZY_REDUCE_BITS: u64 = 120;

/// Hard cap on any tracked bound. Above this the integer identity
/// v = q·p + r can wrap mod the native modulus and the range check no
/// longer pins the residue; hitting it is a circuit-construction bug.
pub const MAX_BOUND_BITS: u64 = 250;

/// A small-field element embedded in the native field.
#[derive(Clone, Debug)]
pub struct FieldVariable {
    pub value: FpVar<Fr>,
    pub upper_bound: BigUint,
}

/// Arithmetic over [`FieldVariable`]s for one target prime.
pub struct FieldChip {
    cs: ConstraintSystemRef<Fr>,
    spec: &'static FieldSpec,
}

impl FieldChip {
    pub fn new(cs: ConstraintSystemRef<Fr>, spec: &'static FieldSpec) -> Self {
        Self { cs, spec }
    }

    pub fn spec(&self) -> &'static FieldSpec {
        self.spec
    }

    pub fn zero() -> FieldVariable {
        FieldVariable { value: FpVar::constant(Fr::zero()), upper_bound: BigUint::zero() }
    }

    pub fn one() -> FieldVariable {
        FieldVariable { value: FpVar::constant(Fr::one()), upper_bound: BigUint::one() }
    }

    pub fn constant(value: u32) -> FieldVariable {
        FieldVariable {
            value: FpVar::constant(Fr::from(value)),
            upper_bound: BigUint::from(value),
        }
    }

    /// Constant from a decimal string, as the recursion compiler emits.
    pub fn from_decimal(digits: &str) -> Option<FieldVariable> {
        let value = BigUint::parse_bytes(digits.as_bytes(), 10)?;
        Some(FieldVariable {
            value: FpVar::constant(Fr::from(value.clone())),
            upper_bound: value,
        })
    }

    /// Allocate a small-field witness, range-checked to a canonical
    /// representative: 31 bits plus a `< p` comparison.
    pub fn alloc_witness(&self, value: Option<&BigUint>) -> Result<FieldVariable, SynthesisError> {
        let assigned = value.cloned().unwrap_or_default();
        let (bits, fp) = self.alloc_bits(31, &assigned)?;
        self.enforce_lt_p(&bits)?;
        Ok(FieldVariable { value: fp, upper_bound: self.prime() - 1u32 })
    }

    pub fn add(&self, a: &FieldVariable, b: &FieldVariable) -> Result<FieldVariable, SynthesisError> {
        self.reduce_fast(FieldVariable {
            value: &a.value + &b.value,
            upper_bound: &a.upper_bound + &b.upper_bound,
        })
    }

    /// a − b, lifted by the smallest multiple of p that dominates b's
    /// bound so the representative stays a non-negative integer.
    pub fn sub(&self, a: &FieldVariable, b: &FieldVariable) -> Result<FieldVariable, SynthesisError> {
        let lift = (&b.upper_bound / self.prime() + 1u32) * self.prime();
        self.reduce_fast(FieldVariable {
            value: &a.value + FpVar::constant(Fr::from(lift.clone())) - &b.value,
            upper_bound: &a.upper_bound + lift,
        })
    }

    pub fn mul(&self, a: &FieldVariable, b: &FieldVariable) -> Result<FieldVariable, SynthesisError> {
        self.reduce_fast(FieldVariable {
            value: &a.value * &b.value,
            upper_bound: &a.upper_bound * &b.upper_bound,
        })
    }

    pub fn mul_const(&self, a: &FieldVariable, k: u32) -> Result<FieldVariable, SynthesisError> {
        self.reduce_fast(FieldVariable {
            value: a.value.clone() * Fr::from(k),
            upper_bound: &a.upper_bound * k,
        })
    }

    /// Reduce only when the tracked bound approaches the lazy threshold.
    pub fn reduce_fast(&self, x: FieldVariable) -> Result<FieldVariable, SynthesisError> {
        if x.upper_bound.bits() >= LAZY_REDUCE_BITS {
            self.reduce_slow(&x)
        } else {
            Ok(x)
        }
    }

    /// Force a canonical bounded representative of the residue class:
    /// witness q and r with v = q·p + r, r < p, and reset the bound to
    /// p − 1.
    pub fn reduce_slow(&self, a: &FieldVariable) -> Result<FieldVariable, SynthesisError> {
        let p = self.prime();
        if a.upper_bound < p {
            return Ok(a.clone());
        }
        assert!(
            a.upper_bound.bits() <= MAX_BOUND_BITS,
            "unreduced magnitude exceeds the soundness threshold for {}",
            self.spec.name
        );

        let q_bits = (&a.upper_bound / &p).bits().max(1);
        let assigned = a.value.value().ok().map(fr_to_biguint).unwrap_or_default();
        let (_, q_fp) = self.alloc_bits(q_bits as usize, &(&assigned / &p))?;
        let (r_bits, r_fp) = self.alloc_bits(31, &(&assigned % &p))?;
        self.enforce_lt_p(&r_bits)?;

        (q_fp * Fr::from(p.clone()) + &r_fp).enforce_equal(&a.value)?;
        Ok(FieldVariable { value: r_fp, upper_bound: p - 1u32 })
    }

    /// Equality of residues mod p: canonicalize both sides, then enforce
    /// native equality.
    pub fn assert_eq(&self, a: &FieldVariable, b: &FieldVariable) -> Result<(), SynthesisError> {
        let ra = self.reduce_slow(a)?;
        let rb = self.reduce_slow(b)?;
        ra.value.enforce_equal(&rb.value)
    }

    fn prime(&self) -> BigUint {
        BigUint::from(self.spec.prime)
    }

    /// Allocate `n` bit witnesses of `value` and rebuild the field element
    /// as Σ bitᵢ·2ⁱ.
    fn alloc_bits(
        &self,
        n: usize,
        value: &BigUint,
    ) -> Result<(Vec<Boolean<Fr>>, FpVar<Fr>), SynthesisError> {
        let mut bits = Vec::with_capacity(n);
        for i in 0..n {
            let bit = value.bit(i as u64);
            bits.push(Boolean::new_witness(self.cs.clone(), || Ok(bit))?);
        }
        let mut acc = FpVar::<Fr>::zero();
        let mut coeff = Fr::one();
        for bit in &bits {
            acc += FpVar::from(bit.clone()) * coeff;
            coeff.double_in_place();
        }
        Ok((bits, acc))
    }

    /// r < p via a constant carry chain: adding C = 2³¹ − p to a 31-bit r
    /// overflows bit 31 exactly when r ≥ p.
    fn enforce_lt_p(&self, bits: &[Boolean<Fr>]) -> Result<(), SynthesisError> {
        let complement = (1u64 << 31) - u64::from(self.spec.prime);
        let mut carry = Boolean::constant(false);
        for (i, a) in bits.iter().enumerate() {
            let b = Boolean::constant((complement >> i) & 1 == 1);
            let a_and_b = a & &b;
            let a_and_c = a & &carry;
            let b_and_c = &b & &carry;
            carry = &(&a_and_b | &a_and_c) | &b_and_c;
        }
        carry.enforce_equal(&Boolean::constant(false))
    }
}

pub(crate) fn fr_to_biguint(v: Fr) -> BigUint {
    v.into_bigint().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{BABY_BEAR, KOALA_BEAR};
    use ark_relations::r1cs::ConstraintSystem;

    fn congruence_roundtrip(spec: &'static FieldSpec) {
        let p = BigUint::from(spec.prime);
        let cs = ConstraintSystem::<Fr>::new_ref();
        let chip = FieldChip::new(cs.clone(), spec);

        let a_int = BigUint::from(spec.prime - 5);
        let b_int = BigUint::from(spec.prime - 7);
        let a = chip.alloc_witness(Some(&a_int)).unwrap();
        let b = chip.alloc_witness(Some(&b_int)).unwrap();

        let sum = chip.reduce_slow(&chip.add(&a, &b).unwrap()).unwrap();
        assert_eq!(
            fr_to_biguint(sum.value.value().unwrap()),
            (&a_int + &b_int) % &p
        );

        let product = chip.reduce_slow(&chip.mul(&a, &b).unwrap()).unwrap();
        assert_eq!(
            fr_to_biguint(product.value.value().unwrap()),
            (&a_int * &b_int) % &p
        );

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn add_mul_congruence_babybear() {
        congruence_roundtrip(&BABY_BEAR);
    }

    #[test]
    fn add_mul_congruence_koalabear() {
        congruence_roundtrip(&KOALA_BEAR);
    }

    #[test]
    fn canonical_range_check_rejects_p() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let chip = FieldChip::new(cs.clone(), &BABY_BEAR);
        let too_big = BigUint::from(BABY_BEAR.prime);
        let _ = chip.alloc_witness(Some(&too_big)).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn subtraction_stays_nonnegative() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let chip = FieldChip::new(cs.clone(), &KOALA_BEAR);
        let p = BigUint::from(KOALA_BEAR.prime);

        let small = chip.alloc_witness(Some(&BigUint::from(3u32))).unwrap();
        let large = chip.alloc_witness(Some(&BigUint::from(11u32))).unwrap();
        let diff = chip.reduce_slow(&chip.sub(&small, &large).unwrap()).unwrap();
        assert_eq!(fr_to_biguint(diff.value.value().unwrap()), &p - 8u32);
        assert!(cs.is_satisfied().unwrap());
    }
}
