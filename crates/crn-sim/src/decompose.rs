//! Expansion of multi-step and delayed reactions.
//!
//! A reaction `R -> P` with `n` steps becomes `R -> I0` followed either by
//! a short chain `I0 -> I1 -> ... -> P` or, for long chains and explicit
//! delays, by one delayed reaction `I0 -> P` driven by a
//! `DelayedReactionSolver`.

use crn_model::{FlatModel, NamedValue, ParticipantKind, Reaction, Species, Value};
use tracing::debug;

use crate::error::{SimError, SimResult};

/// Chains with at least this many residual steps use a delayed solver.
pub const MIN_STEPS_FOR_DELAY_SOLVER: u32 = 15;

pub fn intermediate_name(reaction: &str, step: u32) -> String {
    format!("{reaction}___intermed_species_{step}")
}

pub fn multistep_name(reaction: &str, step: u32) -> String {
    format!("{reaction}___multistep_reaction_{step}")
}

pub fn delayed_name(reaction: &str) -> String {
    format!("{reaction}___delayed_reaction")
}

/// A delayed solver still referring to species and reactions by name.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSpec {
    pub reactant: String,
    pub intermediate: String,
    pub reaction: String,
    pub delay: f64,
    pub rate: f64,
}

#[derive(Clone, Debug, Default)]
pub struct Decomposition {
    pub model: FlatModel,
    pub solvers: Vec<SolverSpec>,
}

fn push_intermediate(model: &mut FlatModel, species: &Species) {
    model.dynamic_species.push(NamedValue {
        name: species.name().to_string(),
        value: Value::Number(0.0),
    });
}

/// Expands every reaction that has more than one step or a delay.
/// Generated reactions are appended after the original ones.
pub fn decompose(mut model: FlatModel) -> SimResult<Decomposition> {
    let mut solvers = Vec::new();
    let original = model.reactions.len();

    for index in 0..original {
        if !model.reactions[index].needs_decomposition() {
            continue;
        }
        let reaction = model.reactions[index].clone();
        reaction
            .validate_decomposable()
            .map_err(|e| SimError::invalid_input(e.to_string()))?;
        let (Some(rate), [reactant], [product]) = (
            reaction.rate().as_number(),
            reaction.reactants(),
            reaction.products(),
        ) else {
            return Err(SimError::illegal_state(format!(
                "reaction \"{}\" passed validation without a decomposable shape",
                reaction.name()
            )));
        };

        let name = reaction.name();
        let compartment = reactant.species.compartment();
        let intermediate = |step: u32| Species::new(intermediate_name(name, step), compartment, 0.0);

        let first_intermediate = intermediate(0);
        push_intermediate(&mut model, &first_intermediate);
        let mut first = Reaction::new(name, rate);
        first.add_participant(ParticipantKind::Reactant, &reactant.species, 1, reactant.dynamic)?;
        first.add_product(&first_intermediate, 1)?;
        model.reactions[index] = first;

        let residual = reaction.num_steps() - 1;
        if residual > 0 && residual < MIN_STEPS_FOR_DELAY_SOLVER {
            debug!(reaction = name, steps = residual, "expanding multi-step reaction into a chain");
            for step in 0..residual {
                let mut link = Reaction::new(multistep_name(name, step), rate);
                link.add_reactant(&intermediate(step), 1)?;
                if step + 1 == residual {
                    link.add_participant(ParticipantKind::Product, &product.species, 1, product.dynamic)?;
                } else {
                    let next = intermediate(step + 1);
                    push_intermediate(&mut model, &next);
                    link.add_product(&next, 1)?;
                }
                model.reactions.push(link);
            }
        } else {
            let delay = if residual > 0 {
                f64::from(residual - 1) / rate
            } else {
                reaction.delay()
            };
            debug!(reaction = name, delay, "expanding reaction into a delayed pair");
            let mut delayed = Reaction::new(delayed_name(name), rate);
            delayed.add_reactant(&first_intermediate, 1)?;
            delayed.add_participant(ParticipantKind::Product, &product.species, 1, product.dynamic)?;
            solvers.push(SolverSpec {
                reactant: reactant.species.name().to_string(),
                intermediate: first_intermediate.name().to_string(),
                reaction: delayed.name().to_string(),
                delay,
                rate,
            });
            model.reactions.push(delayed);
        }
    }

    Ok(Decomposition { model, solvers })
}
