//! Verifying-key export as a Solidity Groth16 verifier contract.
//!
//! The rendered contract checks e(-A, B) · e(alpha, beta) · e(vk_x, gamma)
//! · e(C, delta) == 1 with the EVM pairing precompile, where vk_x is the
//! public-input MSM over the embedded IC points. G2 coordinates are laid
//! out imaginary-before-real, matching the precompile and the §proof
//! encoder's word order.

use std::fmt::Write as _;

use ark_bn254::{Bn254, Fq, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::VerifyingKey;
use num_bigint::BigUint;

fn fq_dec(v: &Fq) -> String {
    BigUint::from(v.into_bigint()).to_string()
}

fn g1_constants(out: &mut String, name: &str, p: &G1Affine) {
    let _ = writeln!(out, "    uint256 internal constant {}_X = {};", name, fq_dec(&p.x));
    let _ = writeln!(out, "    uint256 internal constant {}_Y = {};", name, fq_dec(&p.y));
}

fn g2_constants(out: &mut String, name: &str, p: &G2Affine) {
    let _ = writeln!(out, "    uint256 internal constant {}_X_1 = {};", name, fq_dec(&p.x.c1));
    let _ = writeln!(out, "    uint256 internal constant {}_X_0 = {};", name, fq_dec(&p.x.c0));
    let _ = writeln!(out, "    uint256 internal constant {}_Y_1 = {};", name, fq_dec(&p.y.c1));
    let _ = writeln!(out, "    uint256 internal constant {}_Y_0 = {};", name, fq_dec(&p.y.c0));
}

/// Render the verifier contract source for this verifying key.
pub fn render_verifier(vk: &VerifyingKey<Bn254>) -> String {
    let num_inputs = vk.gamma_abc_g1.len() - 1;
    let mut constants = String::new();
    g1_constants(&mut constants, "ALPHA", &vk.alpha_g1);
    g2_constants(&mut constants, "BETA", &vk.beta_g2);
    g2_constants(&mut constants, "GAMMA", &vk.gamma_g2);
    g2_constants(&mut constants, "DELTA", &vk.delta_g2);
    for (i, ic) in vk.gamma_abc_g1.iter().enumerate() {
        g1_constants(&mut constants, &format!("IC{i}"), ic);
    }

    let mut msm = String::new();
    for i in 0..num_inputs {
        let _ = writeln!(
            msm,
            "        vkX = addScalarMul(vkX, IC{j}_X, IC{j}_Y, input[{i}]);",
            j = i + 1,
        );
    }

    format!(
        r#"// SPDX-License-Identifier: MIT
// Generated by evm-prover; do not edit.
pragma solidity ^0.8.20;

contract VmVerifier {{
    /// Base field modulus of BN254.
    uint256 internal constant Q =
        21888242871839275222246405745257275088696311157297823662689037894645226208583;
    /// Scalar field modulus of BN254.
    uint256 internal constant R =
        21888242871839275222246405745257275088548364400416034343698204186575808495617;

{constants}
    function negateY(uint256 y) internal pure returns (uint256) {{
        if (y == 0) return 0;
        return Q - y;
    }}

    function addScalarMul(
        uint256[2] memory acc,
        uint256 x,
        uint256 y,
        uint256 scalar
    ) internal view returns (uint256[2] memory out) {{
        require(scalar < R, "scalar not in field");
        uint256[3] memory mulIn = [x, y, scalar];
        uint256[2] memory term;
        bool ok;
        assembly {{
            ok := staticcall(gas(), 7, mulIn, 0x60, term, 0x40)
        }}
        require(ok, "ec mul failed");
        uint256[4] memory addIn = [acc[0], acc[1], term[0], term[1]];
        assembly {{
            ok := staticcall(gas(), 6, addIn, 0x80, out, 0x40)
        }}
        require(ok, "ec add failed");
    }}

    /// proof = [A.x, A.y, B.x1, B.x0, B.y1, B.y0, C.x, C.y]
    function verifyProof(
        uint256[8] calldata proof,
        uint256[{num_inputs}] calldata input
    ) external view returns (bool) {{
        uint256[2] memory vkX = [IC0_X, IC0_Y];
{msm}
        uint256[24] memory pairing = [
            proof[0], negateY(proof[1]), proof[2], proof[3], proof[4], proof[5],
            ALPHA_X, ALPHA_Y, BETA_X_1, BETA_X_0, BETA_Y_1, BETA_Y_0,
            vkX[0], vkX[1], GAMMA_X_1, GAMMA_X_0, GAMMA_Y_1, GAMMA_Y_0,
            proof[6], proof[7], DELTA_X_1, DELTA_X_0, DELTA_Y_1, DELTA_Y_0
        ];

        uint256[1] memory result;
        bool ok;
        assembly {{
            ok := staticcall(gas(), 8, pairing, 0x300, result, 0x20)
        }}
        require(ok, "pairing check failed");
        return result[0] == 1;
    }}
}}
"#,
    )
}
