//! Gate evaluation kernels over [`PackedValue`].
//!
//! One reduction per commutative gate family (and/or/xor), each with a
//! plain variant and a pin-forced variant for fault injection, over the
//! flat [`GateKind`] this crate uses.

use crate::netlist::GateKind;
use crate::value::PackedValue;

/// Evaluate `kind` over its fanin values. Source kinds (`PrimaryInput`,
/// `DffOutput`, the two constants) have no fanin to evaluate and are
/// never passed here; callers read their value directly from wherever
/// the pattern or reset state put it.
pub fn eval_gate(kind: GateKind, fanin: &[PackedValue]) -> PackedValue {
    match kind {
        GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput => fanin[0],
        GateKind::Not => !fanin[0],
        GateKind::And => reduce_and(fanin, false),
        GateKind::Nand => reduce_and(fanin, true),
        GateKind::Or => reduce_or(fanin, false),
        GateKind::Nor => reduce_or(fanin, true),
        GateKind::Xor => reduce_xor(fanin, false),
        GateKind::Xnor => reduce_xor(fanin, true),
        GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => {
            unreachable!("{} is a source kind, it has no fanin to evaluate", kind)
        }
    }
}

/// Evaluate `kind` as in [`eval_gate`], but with fanin pin `pin` forced
/// to `forced` instead of read from `fanin[pin]`. Used to inject a
/// branch (input pin) stuck-at fault without disturbing the driving
/// node's value on its other fanout edges.
pub fn eval_gate_with_pin_forced(
    kind: GateKind,
    fanin: &[PackedValue],
    pin: usize,
    forced: PackedValue,
) -> PackedValue {
    match kind {
        GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput | GateKind::Not => {
            debug_assert_eq!(pin, 0);
            if kind == GateKind::Not {
                !forced
            } else {
                forced
            }
        }
        GateKind::And => reduce_and_forced(fanin, false, pin, forced),
        GateKind::Nand => reduce_and_forced(fanin, true, pin, forced),
        GateKind::Or => reduce_or_forced(fanin, false, pin, forced),
        GateKind::Nor => reduce_or_forced(fanin, true, pin, forced),
        GateKind::Xor => reduce_xor_forced(fanin, false, pin, forced),
        GateKind::Xnor => reduce_xor_forced(fanin, true, pin, forced),
        GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => {
            unreachable!("{} is a source kind, it has no fanin pin to force", kind)
        }
    }
}

fn reduce_and(fanin: &[PackedValue], inv_out: bool) -> PackedValue {
    let mut acc = PackedValue::all_one();
    for &v in fanin {
        acc = acc & v;
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

fn reduce_or(fanin: &[PackedValue], inv_out: bool) -> PackedValue {
    let mut acc = PackedValue::all_zero();
    for &v in fanin {
        acc = acc | v;
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

fn reduce_xor(fanin: &[PackedValue], inv_out: bool) -> PackedValue {
    let mut acc = PackedValue::from_word(0);
    for &v in fanin {
        acc = acc ^ v;
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

fn reduce_and_forced(
    fanin: &[PackedValue],
    inv_out: bool,
    pin: usize,
    forced: PackedValue,
) -> PackedValue {
    let mut acc = PackedValue::all_one();
    for (i, &v) in fanin.iter().enumerate() {
        acc = acc & if i == pin { forced } else { v };
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

fn reduce_or_forced(
    fanin: &[PackedValue],
    inv_out: bool,
    pin: usize,
    forced: PackedValue,
) -> PackedValue {
    let mut acc = PackedValue::all_zero();
    for (i, &v) in fanin.iter().enumerate() {
        acc = acc | if i == pin { forced } else { v };
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

fn reduce_xor_forced(
    fanin: &[PackedValue],
    inv_out: bool,
    pin: usize,
    forced: PackedValue,
) -> PackedValue {
    let mut acc = PackedValue::from_word(0);
    for (i, &v) in fanin.iter().enumerate() {
        acc = acc ^ if i == pin { forced } else { v };
    }
    if inv_out {
        !acc
    } else {
        acc
    }
}

/// Observability of fanin pin `input_pos` through `kind`'s output: a
/// word with lane `i` set iff a value change on that pin would, given
/// the other pins' current lane-`i` values, change the gate's output in
/// lane `i`. Used by the extractor's side-input classification, where a
/// sensitization path is blocked exactly where this is zero.
///
/// AND/NAND propagate a pin's change only where every other pin is
/// firmly at AND's non-controlling value (1); OR/NOR mirror this at 0;
/// XOR/XNOR propagate unconditionally as long as every other pin is
/// defined (not X), since XOR has no controlling value.
pub fn gobs(kind: GateKind, fanin: &[PackedValue], input_pos: usize) -> crate::value::Word {
    match kind {
        GateKind::Buf | GateKind::Not | GateKind::PrimaryOutput | GateKind::DffInput => !0u64,
        GateKind::And | GateKind::Nand => {
            let mut obs = !0u64;
            for (j, v) in fanin.iter().enumerate() {
                if j != input_pos {
                    obs &= v.val1 & !v.val0;
                }
            }
            obs
        }
        GateKind::Or | GateKind::Nor => {
            let mut obs = !0u64;
            for (j, v) in fanin.iter().enumerate() {
                if j != input_pos {
                    obs &= v.val0 & !v.val1;
                }
            }
            obs
        }
        GateKind::Xor | GateKind::Xnor => {
            let mut obs = !0u64;
            for (j, v) in fanin.iter().enumerate() {
                if j != input_pos {
                    obs &= !v.any_x();
                }
            }
            obs
        }
        GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value3;

    fn w(bits: u64) -> PackedValue {
        PackedValue::from_word(bits)
    }

    #[test]
    fn test_and_nand() {
        let a = w(0b1100);
        let b = w(0b1010);
        assert_eq!(eval_gate(GateKind::And, &[a, b]).lane(2), Value3::One);
        assert_eq!(eval_gate(GateKind::And, &[a, b]).lane(1), Value3::Zero);
        assert_eq!(eval_gate(GateKind::Nand, &[a, b]).lane(1), Value3::One);
    }

    #[test]
    fn test_xor_reduction() {
        let a = w(0b101);
        let b = w(0b011);
        let c = w(0b110);
        let got = eval_gate(GateKind::Xor, &[a, b, c]);
        // lane 0: 1^1^0=0, lane 1: 0^1^1=0, lane 2: 1^0^1=0
        assert_eq!(got.lane(0), Value3::Zero);
        assert_eq!(got.lane(1), Value3::Zero);
        assert_eq!(got.lane(2), Value3::Zero);
    }

    #[test]
    fn test_pin_forced_and() {
        let a = w(0b11);
        let b = w(0b11);
        let forced = PackedValue::all_zero();
        let got = eval_gate_with_pin_forced(GateKind::And, &[a, b], 0, forced);
        assert_eq!(got, PackedValue::all_zero());
    }

    #[test]
    fn test_gobs_and_blocked_by_other_zero() {
        // Other input firmly 0: AND's output can't be changed by input 0.
        let a = PackedValue::all_one();
        let other = PackedValue::all_zero();
        assert_eq!(gobs(GateKind::And, &[a, other], 0), 0);
        let other_one = PackedValue::all_one();
        assert_eq!(gobs(GateKind::And, &[a, other_one], 0), !0u64);
    }
}
