use super::{FieldKind, FieldSpec};

/// KoalaBear prime: 2³¹ − 2²⁴ + 1.
pub const KOALABEAR_PRIME: u32 = 2130706433;

pub static KOALA_BEAR: FieldSpec = FieldSpec {
    kind: FieldKind::KoalaBear,
    name: "koalabear",
    prime: KOALABEAR_PRIME,
    sbox_degree: 3,
    external_rounds: 8,
    internal_rounds: 20,
    ext_binomial: 3,
    diagonal: [
        2130706431, 1, 2, 1065353217, 3, 4, 1065353216, 2130706430, 2130706429, 2122383361,
        1864368129, 2130706306, 8323072, 266338304, 133169152, 127,
    ],
};
