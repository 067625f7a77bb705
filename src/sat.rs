//! Minimal SAT solver abstraction.
//!
//! A small trait so the CNF builder is portable across solver backends:
//! `new_var`, `add_clause`, `solve(assumptions)`, `value`,
//! `reset_assumptions`. `Dtpg` solves the same CNF build repeatedly
//! under different assumption sets, so the backend must support
//! assumption-based incremental solving (`rustsat`'s `SolveIncremental`)
//! and not just one-shot `Solve`; CaDiCaL does, and is what
//! `rustsat-cadical` binds, so that is the backend behind
//! [`CadicalBackend`]. Kissat, a SAT-competition-style solver with no
//! assumption support, cannot serve this trait and is not used here.

use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Lit as RLit, TernaryVal, Var as RVar};

/// A dense SAT variable index, distinct from a [`Lit`] (which also
/// carries a polarity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub u32);

/// A signed reference to a [`Var`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lit {
    var: Var,
    neg: bool,
}

impl Lit {
    pub fn pos(var: Var) -> Lit {
        Lit { var, neg: false }
    }

    pub fn neg(var: Var) -> Lit {
        Lit { var, neg: true }
    }

    /// A literal fixed to `b`'s truth value, independent of any
    /// variable: conventionally represented here by a reserved
    /// always-true variable, `Var(0)`, asserted once at solver
    /// construction time (see [`CadicalBackend::new`]).
    pub fn constant(b: bool) -> Lit {
        if b {
            Lit::pos(Var(0))
        } else {
            Lit::neg(Var(0))
        }
    }

    pub fn var(self) -> Var {
        self.var
    }

    pub fn is_neg(self) -> bool {
        self.neg
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit {
            var: self.var,
            neg: !self.neg,
        }
    }
}

/// The outcome of a `solve` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// Timeout, conflict-budget exhaustion, or a solver-internal error.
    Unknown,
}

/// A minimal incremental SAT solver interface.
pub trait SatBackend {
    fn new_var(&mut self) -> Var;
    fn add_clause(&mut self, clause: &[Lit]);
    fn solve(&mut self, assumptions: &[Lit]) -> SatResult;
    /// The model value of `var` after a `Sat` result. `None` if the
    /// variable's value is irrelevant to the model (not actually true
    /// for most solvers, which assign every variable, but kept
    /// `Option`-typed so a backend that reports "don't care" can say
    /// so).
    fn value(&self, var: Var) -> Option<bool>;
    /// Clear any sticky solver-side state left over from the previous
    /// `solve` (most incremental solvers need no explicit action here;
    /// assumptions are passed fresh to every `solve` call).
    fn reset_assumptions(&mut self);
}

fn to_rsat_lit(l: Lit) -> RLit {
    let v = RVar::new(l.var().0);
    if l.is_neg() {
        !RLit::positive(v)
    } else {
        RLit::positive(v)
    }
}

/// [`SatBackend`] over `rustsat-cadical`'s bundled CaDiCaL binding.
pub struct CadicalBackend {
    solver: rustsat_cadical::CaDiCaL<'static, 'static>,
    n_vars: u32,
}

impl CadicalBackend {
    pub fn new() -> CadicalBackend {
        let mut solver = rustsat_cadical::CaDiCaL::default();
        // Var(0) is reserved for `Lit::constant`: asserted true once so
        // `Lit::constant(false)` (its negation) is usable everywhere a
        // regular literal is.
        solver
            .add_clause(std::iter::once(RLit::positive(RVar::new(0))).collect())
            .expect("cadical rejected the reserved constant-true unit clause");
        CadicalBackend { solver, n_vars: 1 }
    }
}

impl Default for CadicalBackend {
    fn default() -> CadicalBackend {
        CadicalBackend::new()
    }
}

impl SatBackend for CadicalBackend {
    fn new_var(&mut self) -> Var {
        let v = self.n_vars;
        self.n_vars += 1;
        Var(v)
    }

    fn add_clause(&mut self, clause: &[Lit]) {
        let cl = clause.iter().map(|&l| to_rsat_lit(l)).collect();
        self.solver
            .add_clause(cl)
            .expect("cadical add_clause failed");
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SatResult {
        let assumps: Vec<RLit> = assumptions.iter().map(|&l| to_rsat_lit(l)).collect();
        match self.solver.solve_assumps(&assumps) {
            Ok(SolverResult::Sat) => SatResult::Sat,
            Ok(SolverResult::Unsat) => SatResult::Unsat,
            _ => SatResult::Unknown,
        }
    }

    fn value(&self, var: Var) -> Option<bool> {
        let lit = to_rsat_lit(Lit::pos(var));
        match self.solver.lit_val(lit) {
            Ok(TernaryVal::True) => Some(true),
            Ok(TernaryVal::False) => Some(false),
            _ => None,
        }
    }

    fn reset_assumptions(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_negation_roundtrip() {
        let v = Var(3);
        let l = Lit::pos(v);
        assert!(!l.is_neg());
        assert!((!l).is_neg());
        assert_eq!((!l).var(), v);
    }
}
