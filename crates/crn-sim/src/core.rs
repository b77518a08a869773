//! Bound model state shared by every simulator.
//!
//! `SimulatorCore::bind` decomposes multi-step and delayed reactions, gives
//! every symbol a dense index and binds every expression to those indices.
//! After binding, a run never looks a symbol up by name.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use crn_core::{exceeds_integer_precision, falling_factorial};
use crn_expr::{DepthGuard, Expression};
use crn_model::{Model, RESERVED_TIME_SYMBOL, Reaction, ReactionParticipant, Value};
use tracing::debug;

use crate::binding::{BoundEvaluator, Layout, SymbolSlot, bind_expression, bind_value};
use crate::decompose::{Decomposition, decompose};
use crate::delayed::DelayedReactionSolver;
use crate::error::{SimError, SimResult};
use crate::params::DelayedSolverConfig;

/// Above this population the stochastic rate factor `n (n-1) ... (n-s+1)`
/// is replaced by `n^s`.
pub const LARGE_POPULATION_THRESHOLD: f64 = 100_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundParticipant {
    pub slot: SymbolSlot,
    pub stoichiometry: u32,
    pub dynamic: bool,
}

#[derive(Clone, Debug)]
pub struct BoundReaction {
    pub name: String,
    /// Rate constant or rate law as written.
    pub rate: Value,
    /// The rate law with mass action expanded.
    pub law: Expression,
    pub local_names: Vec<String>,
    pub locals: Vec<Value>,
    pub reactants: Vec<BoundParticipant>,
    pub products: Vec<BoundParticipant>,
    /// Net change of each dynamic species per firing, zero entries dropped.
    pub adjustments: Vec<(usize, f64)>,
    /// Solver driving this reaction, if it is the second half of a delayed pair.
    pub delayed_solver: Option<usize>,
    /// Solvers whose intermediate this reaction produces.
    pub feeds: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct SimulatorCore {
    model_name: String,
    stochastic: bool,
    layout: Layout,
    dynamic_names: Vec<String>,
    initial_values: Vec<Value>,
    symbol_names: Vec<String>,
    symbols: Vec<Value>,
    name_index: HashMap<String, SymbolSlot>,
    reactions: Vec<BoundReaction>,
    solvers: Vec<DelayedReactionSolver>,
    dynamic: Vec<f64>,
    time: f64,
    cache: Vec<Cell<Option<f64>>>,
    guard: DepthGuard,
}

fn resolve_global(index: &HashMap<String, SymbolSlot>, layout: Layout, name: &str) -> Option<usize> {
    index
        .get(name)
        .map(|&slot| layout.encode(slot))
        .or_else(|| (name == RESERVED_TIME_SYMBOL).then(|| layout.encode(SymbolSlot::Time)))
}

fn bind_reaction(
    reaction: &Reaction,
    index: &HashMap<String, SymbolSlot>,
    layout: Layout,
) -> SimResult<BoundReaction> {
    let name = reaction.name();
    let local_names: Vec<String> = reaction
        .parameters()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    let resolve = |symbol: &str| {
        local_names
            .iter()
            .position(|n| n == symbol)
            .map(|k| layout.encode(SymbolSlot::Local(k)))
            .or_else(|| resolve_global(index, layout, symbol))
    };

    let mut locals = Vec::with_capacity(local_names.len());
    for p in reaction.parameters() {
        let mut value = p.value().clone();
        bind_value(&mut value, name, resolve)?;
        locals.push(value);
    }
    let mut rate = reaction.rate().clone();
    bind_value(&mut rate, name, resolve)?;
    let mut law = reaction.rate_expression();
    bind_expression(&mut law, name, resolve)?;

    let participant = |p: &ReactionParticipant| -> SimResult<BoundParticipant> {
        let species = p.species.name();
        let slot = index.get(species).copied().ok_or_else(|| {
            SimError::not_found(format!("species \"{species}\" used by reaction \"{name}\""))
        })?;
        if p.dynamic && !matches!(slot, SymbolSlot::Dynamic(_)) {
            return Err(SimError::illegal_state(format!(
                "dynamic participant \"{species}\" of reaction \"{name}\" has no dynamic index"
            )));
        }
        Ok(BoundParticipant {
            slot,
            stoichiometry: p.stoichiometry,
            dynamic: p.dynamic,
        })
    };
    let reactants = reaction
        .reactants()
        .iter()
        .map(&participant)
        .collect::<SimResult<Vec<_>>>()?;
    let products = reaction
        .products()
        .iter()
        .map(&participant)
        .collect::<SimResult<Vec<_>>>()?;

    let mut net: BTreeMap<usize, f64> = BTreeMap::new();
    for (side, sign) in [(&reactants, -1.0), (&products, 1.0)] {
        for p in side {
            if let (true, SymbolSlot::Dynamic(i)) = (p.dynamic, p.slot) {
                *net.entry(i).or_default() += sign * f64::from(p.stoichiometry);
            }
        }
    }
    let adjustments = net.into_iter().filter(|&(_, d)| d != 0.0).collect();

    Ok(BoundReaction {
        name: name.to_string(),
        rate,
        law,
        local_names,
        locals,
        reactants,
        products,
        adjustments,
        delayed_solver: None,
        feeds: Vec::new(),
    })
}

impl SimulatorCore {
    /// Binds `model` for a stochastic or a deterministic interpretation.
    pub fn bind(model: &Model, stochastic: bool) -> SimResult<Self> {
        let Decomposition { model: flat, solvers: specs } = decompose(model.flatten())?;
        let layout = Layout {
            num_dynamic: flat.dynamic_species.len(),
            num_symbols: flat.symbols.len(),
        };

        let mut name_index = HashMap::new();
        let entries = flat
            .dynamic_species
            .iter()
            .enumerate()
            .map(|(i, s)| (&s.name, SymbolSlot::Dynamic(i)))
            .chain(
                flat.symbols
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (&s.name, SymbolSlot::Symbol(i))),
            );
        for (name, slot) in entries {
            if name_index.insert(name.clone(), slot).is_some() {
                return Err(SimError::invalid_input(format!(
                    "symbol \"{name}\" is defined more than once"
                )));
            }
        }
        let global = |name: &str| resolve_global(&name_index, layout, name);

        let mut dynamic_names = Vec::with_capacity(layout.num_dynamic);
        let mut initial_values = Vec::with_capacity(layout.num_dynamic);
        for entry in &flat.dynamic_species {
            let mut value = entry.value.clone();
            bind_value(&mut value, &entry.name, global)?;
            dynamic_names.push(entry.name.clone());
            initial_values.push(value);
        }
        let mut symbol_names = Vec::with_capacity(layout.num_symbols);
        let mut symbols = Vec::with_capacity(layout.num_symbols);
        for entry in &flat.symbols {
            let mut value = entry.value.clone();
            bind_value(&mut value, &entry.name, global)?;
            symbol_names.push(entry.name.clone());
            symbols.push(value);
        }

        let mut reactions = flat
            .reactions
            .iter()
            .map(|r| bind_reaction(r, &name_index, layout))
            .collect::<SimResult<Vec<_>>>()?;

        let config = DelayedSolverConfig::default();
        let mut solvers = Vec::with_capacity(specs.len());
        for (k, spec) in specs.iter().enumerate() {
            let reactant = name_index.get(&spec.reactant).copied().ok_or_else(|| {
                SimError::not_found(format!("delayed reactant \"{}\"", spec.reactant))
            })?;
            let Some(&SymbolSlot::Dynamic(intermediate)) = name_index.get(&spec.intermediate) else {
                return Err(SimError::not_found(format!(
                    "intermediate species \"{}\"",
                    spec.intermediate
                )));
            };
            let reaction = reactions
                .iter()
                .position(|r| r.name == spec.reaction)
                .ok_or_else(|| SimError::not_found(format!("reaction \"{}\"", spec.reaction)))?;
            solvers.push(DelayedReactionSolver::new(
                spec.reaction.clone(),
                reactant,
                intermediate,
                reaction,
                spec.delay,
                spec.rate,
                stochastic,
                &config,
                None,
            )?);
            reactions[reaction].delayed_solver = Some(k);
            for r in reactions.iter_mut() {
                let produces = r
                    .products
                    .iter()
                    .any(|p| p.dynamic && p.slot == SymbolSlot::Dynamic(intermediate));
                if produces {
                    r.feeds.push(k);
                }
            }
        }

        debug!(
            model = model.name(),
            reactions = reactions.len(),
            dynamic_species = layout.num_dynamic,
            symbols = layout.num_symbols,
            delayed_solvers = solvers.len(),
            stochastic,
            "bound model"
        );

        Ok(Self {
            model_name: model.name().to_string(),
            stochastic,
            layout,
            dynamic: vec![0.0; layout.num_dynamic],
            cache: vec![Cell::new(None); layout.num_symbols],
            dynamic_names,
            initial_values,
            symbol_names,
            symbols,
            name_index,
            reactions,
            solvers,
            time: 0.0,
            guard: DepthGuard::new(),
        })
    }

    /// Rebuilds every delayed solver with new history sizing.
    pub fn configure_delayed_solvers(
        &mut self,
        config: &DelayedSolverConfig,
        history_bins: Option<usize>,
    ) -> SimResult<()> {
        for solver in &mut self.solvers {
            *solver = solver.resized(config, history_bins)?;
        }
        Ok(())
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_stochastic(&self) -> bool {
        self.stochastic
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn num_dynamic(&self) -> usize {
        self.layout.num_dynamic
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn dynamic_names(&self) -> &[String] {
        &self.dynamic_names
    }

    pub fn dynamic_values(&self) -> &[f64] {
        &self.dynamic
    }

    pub fn initial_values(&self) -> &[Value] {
        &self.initial_values
    }

    pub fn symbol_names(&self) -> &[String] {
        &self.symbol_names
    }

    pub fn symbol_values(&self) -> &[Value] {
        &self.symbols
    }

    pub fn reactions(&self) -> &[BoundReaction] {
        &self.reactions
    }

    pub fn reaction(&self, j: usize) -> &BoundReaction {
        &self.reactions[j]
    }

    pub fn reaction_index(&self, name: &str) -> Option<usize> {
        self.reactions.iter().position(|r| r.name == name)
    }

    pub fn solvers(&self) -> &[DelayedReactionSolver] {
        &self.solvers
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn slot_of(&self, name: &str) -> Option<SymbolSlot> {
        self.name_index
            .get(name)
            .copied()
            .or_else(|| (name == RESERVED_TIME_SYMBOL).then_some(SymbolSlot::Time))
    }

    pub fn slot_name(&self, slot: SymbolSlot) -> &str {
        match slot {
            SymbolSlot::Dynamic(i) => self.dynamic_names.get(i).map_or("?", String::as_str),
            SymbolSlot::Symbol(i) => self.symbol_names.get(i).map_or("?", String::as_str),
            SymbolSlot::Time => RESERVED_TIME_SYMBOL,
            SymbolSlot::Local(_) => "local parameter",
        }
    }

    /// Evaluator over global symbols only.
    pub fn evaluator(&self) -> BoundEvaluator<'_> {
        self.evaluator_with(&[])
    }

    /// Evaluator in which reaction `j`'s local parameters shadow globals.
    pub fn reaction_evaluator(&self, j: usize) -> BoundEvaluator<'_> {
        self.evaluator_with(&self.reactions[j].locals)
    }

    fn evaluator_with<'a>(&'a self, locals: &'a [Value]) -> BoundEvaluator<'a> {
        BoundEvaluator {
            layout: self.layout,
            dynamic: &self.dynamic,
            initial: &[],
            symbols: &self.symbols,
            cache: &self.cache,
            locals,
            time: self.time,
            guard: &self.guard,
        }
    }

    pub fn slot_value(&self, slot: SymbolSlot) -> SimResult<f64> {
        Ok(self.evaluator().slot_value(slot, self.slot_name(slot))?)
    }

    /// Drops cached values of expression-valued symbols.
    pub fn invalidate(&self) {
        for cell in &self.cache {
            cell.set(None);
        }
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        self.invalidate();
    }

    /// Overwrites the clock and every dynamic value.
    pub fn load_state(&mut self, time: f64, values: &[f64]) {
        self.dynamic.copy_from_slice(values);
        self.set_time(time);
    }

    /// Replaces each dynamic value `x_i` by `f(i, x_i)`.
    pub fn map_dynamic(&mut self, mut f: impl FnMut(usize, f64) -> f64) {
        for (i, x) in self.dynamic.iter_mut().enumerate() {
            *x = f(i, *x);
        }
        self.invalidate();
    }

    /// Restores initial populations, clears every delayed solver and sets
    /// the clock to `start_time`. An expression-valued initial population
    /// sees the initial values of the species it references, so chains of
    /// expressions resolve regardless of species order. A cycle among them
    /// fails with a recursion-limit error.
    pub fn prepare(&mut self, start_time: f64) -> SimResult<()> {
        self.time = start_time;
        for solver in &mut self.solvers {
            solver.clear();
        }
        self.invalidate();
        let values = {
            let ev = BoundEvaluator {
                initial: &self.initial_values,
                ..self.evaluator()
            };
            self.initial_values
                .iter()
                .map(|v| match v {
                    Value::Number(n) => Ok(*n),
                    Value::Expression(e) => e.evaluate(&ev),
                })
                .collect::<Result<Vec<f64>, _>>()?
        };
        self.dynamic.copy_from_slice(&values);
        self.invalidate();
        Ok(())
    }

    fn rate_factor(&self, p: &BoundParticipant) -> SimResult<f64> {
        let value = self.slot_value(p.slot)?;
        let s = p.stoichiometry;
        Ok(if s == 1 {
            value
        } else if self.stochastic && p.dynamic {
            if value < f64::from(s) {
                0.0
            } else if value < LARGE_POPULATION_THRESHOLD {
                falling_factorial(value, s)
            } else {
                value.powf(f64::from(s))
            }
        } else {
            value.powf(f64::from(s))
        })
    }

    /// Propensity of reaction `j` in the current state.
    pub fn reaction_rate(&self, j: usize) -> SimResult<f64> {
        let reaction = &self.reactions[j];
        if let Some(k) = reaction.delayed_solver {
            let solver = &self.solvers[k];
            return solver.compute_rate(self.dynamic[solver.intermediate()], self.time);
        }
        match &reaction.rate {
            Value::Number(k) => {
                let mut rate = *k;
                for p in &reaction.reactants {
                    if rate == 0.0 {
                        break;
                    }
                    rate *= self.rate_factor(p)?;
                }
                Ok(rate)
            }
            Value::Expression(e) => Ok(e.evaluate(&self.reaction_evaluator(j))?),
        }
    }

    pub fn compute_rates(&self, rates: &mut [f64]) -> SimResult<()> {
        for (j, rate) in rates.iter_mut().enumerate() {
            *rate = self.reaction_rate(j)?;
        }
        Ok(())
    }

    /// `dx_i/dt = Σ_j rates_j · v_ji`.
    pub fn compute_derivative(&self, rates: &[f64], derivative: &mut [f64]) {
        derivative.fill(0.0);
        for (reaction, rate) in self.reactions.iter().zip(rates) {
            for &(i, delta) in &reaction.adjustments {
                derivative[i] += delta * rate;
            }
        }
    }

    /// Applies `firings` firings of reaction `j`. In stochastic mode every
    /// molecule entering a delayed pipeline gets a completion scheduled at
    /// the current time plus the delay.
    pub fn fire(&mut self, j: usize, firings: u64) -> SimResult<()> {
        let n = firings as f64;
        let reaction = &self.reactions[j];
        for &(i, delta) in &reaction.adjustments {
            self.dynamic[i] += delta * n;
        }
        if self.stochastic {
            for &k in &reaction.feeds {
                for _ in 0..firings {
                    self.solvers[k].add_reactant(self.time)?;
                }
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Dynamic values after applying `firings[j]` firings of every reaction
    /// `j`, without changing the state.
    pub fn project(&self, firings: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&self.dynamic);
        for (reaction, &n) in self.reactions.iter().zip(firings) {
            if n == 0.0 {
                continue;
            }
            for &(i, delta) in &reaction.adjustments {
                out[i] += delta * n;
            }
        }
    }

    /// Delayed solver with the earliest pending completion, ties to the
    /// lowest index.
    pub fn next_delayed_completion(&self) -> SimResult<Option<(usize, f64)>> {
        let mut best: Option<(usize, f64)> = None;
        for (k, solver) in self.solvers.iter().enumerate() {
            if !solver.can_have_reaction() {
                continue;
            }
            let t = solver.peek_next_reaction_time()?;
            if best.is_none_or(|(_, bt)| t < bt) {
                best = Some((k, t));
            }
        }
        Ok(best)
    }

    /// Pops solver `k`'s earliest completion without firing it. Returns the
    /// reaction to fire.
    pub fn take_delayed_completion(&mut self, k: usize) -> SimResult<usize> {
        self.solvers[k].poll_next_reaction_time()?;
        Ok(self.solvers[k].reaction_index())
    }

    /// Pops solver `k`'s earliest completion and fires its reaction.
    /// Returns the reaction index.
    pub fn complete_delayed(&mut self, k: usize) -> SimResult<usize> {
        let j = self.take_delayed_completion(k)?;
        self.fire(j, 1)?;
        Ok(j)
    }

    /// Feeds the current reactant and intermediate levels into every
    /// deterministic solver's history.
    pub fn update_delayed_solvers(&mut self) -> SimResult<()> {
        for k in 0..self.solvers.len() {
            let reactant = self.slot_value(self.solvers[k].reactant())?;
            let intermediate = self.dynamic[self.solvers[k].intermediate()];
            let time = self.time;
            self.solvers[k].update(reactant, intermediate, time);
        }
        Ok(())
    }

    pub fn resolve_symbols(&self, names: &[String]) -> SimResult<Vec<SymbolSlot>> {
        names
            .iter()
            .map(|name| {
                self.slot_of(name).ok_or_else(|| {
                    SimError::not_found(format!(
                        "requested symbol \"{name}\" is not in model \"{}\"",
                        self.model_name
                    ))
                })
            })
            .collect()
    }

    pub fn values_of(&self, slots: &[SymbolSlot], out: &mut [f64]) -> SimResult<()> {
        for (value, &slot) in out.iter_mut().zip(slots) {
            *value = self.slot_value(slot)?;
        }
        Ok(())
    }

    fn first_uncountable(&self) -> Option<(&str, f64)> {
        self.dynamic_names
            .iter()
            .zip(&self.dynamic)
            .find(|&(_, &v)| exceeds_integer_precision(v))
            .map(|(name, &v)| (name.as_str(), v))
    }

    /// Rejects initial populations too large to count one molecule at a time.
    pub fn check_initial_countable(&self) -> SimResult<()> {
        match self.first_uncountable() {
            Some((name, v)) => Err(SimError::invalid_input(format!(
                "initial population of species \"{name}\" ({v}) is too large for stochastic simulation"
            ))),
            None => Ok(()),
        }
    }

    /// Fails once a population has grown past exact integer arithmetic.
    pub fn check_countable(&self) -> SimResult<()> {
        match self.first_uncountable() {
            Some((name, v)) => Err(SimError::Accuracy {
                what: format!(
                    "population of species \"{name}\" ({v}) can no longer change by one molecule"
                ),
            }),
            None => Ok(()),
        }
    }
}
