//! Reaction dependency graph for the next-reaction method.

use std::collections::{BTreeSet, HashSet};

use crn_expr::Expression;
use crn_model::Value;

use crate::binding::SymbolSlot;
use crate::core::SimulatorCore;

/// Which propensities must be recomputed after a reaction fires.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    dependents: Vec<Vec<usize>>,
    time_dependent: Vec<usize>,
}

/// Dynamic species and clock dependence of one rate law.
struct RateAnalysis<'a> {
    core: &'a SimulatorCore,
    locals: &'a [Value],
    species: BTreeSet<usize>,
    uses_time: bool,
    visited: HashSet<SymbolSlot>,
}

impl<'a> RateAnalysis<'a> {
    fn of_reaction(core: &'a SimulatorCore, j: usize) -> Self {
        let reaction = core.reaction(j);
        let mut analysis = Self {
            core,
            locals: &reaction.locals,
            species: BTreeSet::new(),
            uses_time: false,
            visited: HashSet::new(),
        };
        if let Some(k) = reaction.delayed_solver {
            let solver = &core.solvers()[k];
            analysis.visit_slot(SymbolSlot::Dynamic(solver.intermediate()));
            return analysis;
        }
        match &reaction.rate {
            Value::Number(_) => {
                for p in &reaction.reactants {
                    analysis.visit_slot(p.slot);
                }
            }
            Value::Expression(e) => analysis.visit_expression(e),
        }
        analysis
    }

    fn visit_expression(&mut self, expression: &'a Expression) {
        let layout = self.core.layout();
        for symbol in expression.symbols() {
            if let Some(raw) = symbol.slot() {
                self.visit_slot(layout.decode(raw));
            }
        }
    }

    fn visit_slot(&mut self, slot: SymbolSlot) {
        if !self.visited.insert(slot) {
            return;
        }
        let core = self.core;
        let locals = self.locals;
        match slot {
            SymbolSlot::Dynamic(i) => {
                self.species.insert(i);
            }
            SymbolSlot::Time => self.uses_time = true,
            SymbolSlot::Symbol(i) => {
                if let Some(Value::Expression(e)) = core.symbol_values().get(i) {
                    self.visit_expression(e);
                }
            }
            SymbolSlot::Local(i) => {
                if let Some(Value::Expression(e)) = locals.get(i) {
                    self.visit_expression(e);
                }
            }
        }
    }
}

impl DependencyGraph {
    pub fn build(core: &SimulatorCore) -> Self {
        let n = core.num_reactions();
        let mut readers: Vec<Vec<usize>> = vec![Vec::new(); core.num_dynamic()];
        let mut time_dependent = Vec::new();

        for j in 0..n {
            let analysis = RateAnalysis::of_reaction(core, j);
            for &i in &analysis.species {
                readers[i].push(j);
            }
            if analysis.uses_time {
                time_dependent.push(j);
            }
        }

        let dependents = (0..n)
            .map(|j| {
                let mut deps: Vec<usize> = core
                    .reaction(j)
                    .adjustments
                    .iter()
                    .flat_map(|&(i, _)| readers[i].iter().copied())
                    .filter(|&k| k != j)
                    .collect();
                deps.sort_unstable();
                deps.dedup();
                deps
            })
            .collect();

        Self {
            dependents,
            time_dependent,
        }
    }

    /// Reactions other than `j` whose propensity changes when `j` fires.
    pub fn dependents(&self, j: usize) -> &[usize] {
        &self.dependents[j]
    }

    /// Reactions whose propensity changes with the clock alone.
    pub fn time_dependent(&self) -> &[usize] {
        &self.time_dependent
    }

    pub fn is_time_dependent(&self, j: usize) -> bool {
        self.time_dependent.binary_search(&j).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crn_model::{Compartment, Model, Parameter, Reaction, Species};

    #[test]
    fn follows_expression_valued_symbols() {
        let cell = Compartment::default();
        let a = Species::new("A", &cell, 10.0);
        let b = Species::new("B", &cell, 0.0);
        let mut m = Model::new("m");
        m.add_parameter(Parameter::new("scaled_b", Value::parse("2 * B").unwrap()))
            .unwrap();

        let mut make_b = Reaction::new("make_b", 1.0);
        make_b.add_reactant(&a, 1).unwrap();
        make_b.add_product(&b, 1).unwrap();
        m.add_reaction(make_b).unwrap();

        let mut feedback = Reaction::new("feedback", Value::parse("scaled_b * 0.1").unwrap());
        feedback.add_product(&a, 1).unwrap();
        m.add_reaction(feedback).unwrap();

        let mut pulse = Reaction::new("pulse", Value::parse("sin(time) + 1").unwrap());
        pulse.add_product(&Species::new("C", &cell, 0.0), 1).unwrap();
        m.add_reaction(pulse).unwrap();

        let core = SimulatorCore::bind(&m, true).unwrap();
        let graph = DependencyGraph::build(&core);
        // make_b changes A and B; feedback reads B through scaled_b.
        assert_eq!(graph.dependents(0), &[1]);
        // feedback changes A, read by make_b.
        assert_eq!(graph.dependents(1), &[0]);
        assert!(graph.dependents(2).is_empty());
        assert_eq!(graph.time_dependent(), &[2]);
        assert!(graph.is_time_dependent(2));
    }
}
