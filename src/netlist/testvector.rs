//! `TestVector`: an ordered PPI assignment, with an optional auxiliary
//! previous-time-frame assignment for transition faults.

use std::fmt;

use crate::value::Value3;

use super::node::NodeId;

/// An assignment of [`Value3`] to every PPI of a netlist, in the fixed
/// order [`super::Netlist::ppis`] returns. Equality and hashing only
/// consider the defined-bit pattern: two X lanes compare equal to each
/// other, but a defined lane never compares equal to an X lane in the
/// same position — an X lane is itself part of the pattern's identity,
/// not a wildcard over comparison.
#[derive(Clone, Debug)]
pub struct TestVector {
    /// One entry per PPI, same order as `Netlist::ppis()`.
    values: Vec<Value3>,
    /// Present only for transition-delay faults: the PPI assignment of
    /// the time frame immediately before this one (the "launch" vector),
    /// same order and length as `values`.
    previous: Option<Vec<Value3>>,
}

impl TestVector {
    pub fn all_x(n_ppis: usize) -> TestVector {
        TestVector {
            values: vec![Value3::X; n_ppis],
            previous: None,
        }
    }

    pub fn from_values(values: Vec<Value3>) -> TestVector {
        TestVector {
            values,
            previous: None,
        }
    }

    pub fn with_previous(values: Vec<Value3>, previous: Vec<Value3>) -> TestVector {
        debug_assert_eq!(values.len(), previous.len());
        TestVector {
            values,
            previous: Some(previous),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Value3 {
        self.values[i]
    }

    pub fn set(&mut self, i: usize, v: Value3) {
        self.values[i] = v;
    }

    pub fn values(&self) -> &[Value3] {
        &self.values
    }

    pub fn previous(&self) -> Option<&[Value3]> {
        self.previous.as_deref()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Fill every still-X lane with a value from `fill`, used by `Rtpg`
    /// to turn a DTPG-computed sufficient condition into a fully defined
    /// pattern before it is handed to a real tester.
    pub fn fill_x(&mut self, mut fill: impl FnMut() -> bool) {
        for v in &mut self.values {
            if v.is_x() {
                *v = Value3::from_bool(fill());
            }
        }
        if let Some(prev) = &mut self.previous {
            for v in prev {
                if v.is_x() {
                    *v = Value3::from_bool(fill());
                }
            }
        }
    }
}

impl PartialEq for TestVector {
    fn eq(&self, other: &Self) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        let defined_eq = |a: &[Value3], b: &[Value3]| {
            a.iter().zip(b).all(|(x, y)| match (x.as_bool(), y.as_bool()) {
                (Some(bx), Some(by)) => bx == by,
                (None, None) => true,
                _ => false,
            })
        };
        if !defined_eq(&self.values, &other.values) {
            return false;
        }
        match (&self.previous, &other.previous) {
            (Some(a), Some(b)) => defined_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
impl Eq for TestVector {}

impl std::hash::Hash for TestVector {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for v in &self.values {
            v.as_bool().hash(state);
        }
        if let Some(prev) = &self.previous {
            for v in prev {
                v.as_bool().hash(state);
            }
        }
    }
}

impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for v in &self.values {
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// A PPI-indexed lookup from [`NodeId`] to position in a [`TestVector`],
/// built once per `Netlist` and shared by every consumer that needs to
/// translate between node ids and vector positions (`Fsim`, `Rtpg`,
/// the `Justifier`).
#[derive(Clone, Debug)]
pub struct PpiIndex {
    pos: std::collections::HashMap<NodeId, usize>,
    ids: Vec<NodeId>,
}

impl PpiIndex {
    pub fn build(ppis: &[NodeId]) -> PpiIndex {
        let pos = ppis.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        PpiIndex {
            pos,
            ids: ppis.to_vec(),
        }
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.pos.get(&id).copied()
    }

    pub fn node_at(&self, pos: usize) -> NodeId {
        self.ids[pos]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_lanes_compare_equal() {
        let a = TestVector::from_values(vec![Value3::Zero, Value3::X, Value3::One]);
        let b = TestVector::from_values(vec![Value3::Zero, Value3::X, Value3::One]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_defined_mismatch() {
        let a = TestVector::from_values(vec![Value3::Zero]);
        let b = TestVector::from_values(vec![Value3::One]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_x_vs_defined_not_equal() {
        let a = TestVector::from_values(vec![Value3::X]);
        let b = TestVector::from_values(vec![Value3::Zero]);
        assert_ne!(a, b);
    }
}
