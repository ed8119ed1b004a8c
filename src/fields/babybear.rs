use super::{FieldKind, FieldSpec};

/// BabyBear prime: 2³¹ − 2²⁷ + 1.
pub const BABYBEAR_PRIME: u32 = 2013265921;

pub static BABY_BEAR: FieldSpec = FieldSpec {
    kind: FieldKind::BabyBear,
    name: "babybear",
    prime: BABYBEAR_PRIME,
    sbox_degree: 7,
    external_rounds: 8,
    internal_rounds: 13,
    ext_binomial: 11,
    diagonal: [
        2013265919, 1, 2, 1006632961, 3, 4, 1006632960, 2013265918, 2013265917, 2005401601,
        1509949441, 1761607681, 2013265906, 7864320, 125829120, 15,
    ],
};
