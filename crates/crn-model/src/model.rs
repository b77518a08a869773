//! Models: the global symbol namespace plus the reaction list.

use std::collections::HashMap;

use crate::compartment::Compartment;
use crate::error::{ModelError, ModelResult};
use crate::parameter::Parameter;
use crate::reaction::Reaction;
use crate::species::Species;
use crate::value::Value;

/// Name bound to the simulation clock inside rate expressions.
pub const RESERVED_TIME_SYMBOL: &str = "time";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SymbolKind {
    Compartment(usize),
    Species(usize),
    Parameter(usize),
}

/// A reaction network.
///
/// Compartments, species and parameters share one namespace. Species are
/// registered implicitly when a reaction that uses them is added.
#[derive(Clone, Debug, Default)]
pub struct Model {
    name: String,
    compartments: Vec<Compartment>,
    species: Vec<Species>,
    parameters: Vec<Parameter>,
    reactions: Vec<Reaction>,
    submodels: Vec<String>,
    symbols: HashMap<String, SymbolKind>,
    reaction_index: HashMap<String, usize>,
}

/// A named value in a flattened model.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub value: Value,
}

/// Model contents split the way a simulator indexes them.
#[derive(Clone, Debug, Default)]
pub struct FlatModel {
    /// Species changed by at least one reaction, in model order.
    pub dynamic_species: Vec<NamedValue>,
    /// Every other global symbol: compartments, boundary or unreferenced
    /// species, parameters.
    pub symbols: Vec<NamedValue>,
    pub reactions: Vec<Reaction>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Names of the sub-models merged into this one.
    pub fn submodels(&self) -> &[String] {
        &self.submodels
    }

    pub fn reaction(&self, name: &str) -> Option<&Reaction> {
        self.reaction_index.get(name).map(|&i| &self.reactions[i])
    }

    pub fn species_by_name(&self, name: &str) -> Option<&Species> {
        match self.symbols.get(name) {
            Some(SymbolKind::Species(i)) => Some(&self.species[*i]),
            _ => None,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        match self.symbols.get(name) {
            Some(SymbolKind::Parameter(i)) => Some(&self.parameters[*i]),
            _ => None,
        }
    }

    pub fn compartment(&self, name: &str) -> Option<&Compartment> {
        match self.symbols.get(name) {
            Some(SymbolKind::Compartment(i)) => Some(&self.compartments[*i]),
            _ => None,
        }
    }

    /// Value of any global symbol.
    pub fn symbol_value(&self, name: &str) -> Option<&Value> {
        Some(match self.symbols.get(name)? {
            SymbolKind::Compartment(i) => self.compartments[*i].volume(),
            SymbolKind::Species(i) => self.species[*i].population(),
            SymbolKind::Parameter(i) => self.parameters[*i].value(),
        })
    }

    /// Species names in ascending order.
    pub fn ordered_species_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.species.iter().map(|s| s.name().to_string()).collect();
        names.sort();
        names
    }

    fn check_name(&self, name: &str, kind: &'static str) -> ModelResult<()> {
        if name.is_empty() {
            return Err(ModelError::invalid(format!("{kind} name must not be empty")));
        }
        if name == RESERVED_TIME_SYMBOL {
            return Err(ModelError::invalid(format!(
                "\"{RESERVED_TIME_SYMBOL}\" is reserved and cannot name a {kind}"
            )));
        }
        Ok(())
    }

    /// Registers a compartment. Re-adding an identical one is a no-op.
    pub fn add_compartment(&mut self, compartment: Compartment) -> ModelResult<()> {
        self.check_name(compartment.name(), "compartment")?;
        match self.symbols.get(compartment.name()) {
            Some(SymbolKind::Compartment(i)) if self.compartments[*i] == compartment => Ok(()),
            Some(_) => Err(ModelError::Duplicate {
                kind: "symbol",
                name: compartment.name().to_string(),
            }),
            None => {
                self.symbols.insert(
                    compartment.name().to_string(),
                    SymbolKind::Compartment(self.compartments.len()),
                );
                self.compartments.push(compartment);
                Ok(())
            }
        }
    }

    /// Registers a species and its compartment. Re-adding an identical
    /// species is a no-op.
    pub fn add_species(&mut self, species: Species) -> ModelResult<()> {
        self.check_name(species.name(), "species")?;
        match self.symbols.get(species.name()) {
            Some(SymbolKind::Species(i)) if self.species[*i] == species => Ok(()),
            Some(_) => Err(ModelError::Duplicate {
                kind: "symbol",
                name: species.name().to_string(),
            }),
            None => {
                self.add_compartment(species.compartment().clone())?;
                self.symbols
                    .insert(species.name().to_string(), SymbolKind::Species(self.species.len()));
                self.species.push(species);
                Ok(())
            }
        }
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> ModelResult<()> {
        self.check_name(parameter.name(), "parameter")?;
        match self.symbols.get(parameter.name()) {
            Some(SymbolKind::Parameter(i)) if self.parameters[*i] == parameter => Ok(()),
            Some(_) => Err(ModelError::Duplicate {
                kind: "symbol",
                name: parameter.name().to_string(),
            }),
            None => {
                self.symbols.insert(
                    parameter.name().to_string(),
                    SymbolKind::Parameter(self.parameters.len()),
                );
                self.parameters.push(parameter);
                Ok(())
            }
        }
    }

    /// Adds a reaction and registers every species it references.
    pub fn add_reaction(&mut self, reaction: Reaction) -> ModelResult<()> {
        if self.reaction_index.contains_key(reaction.name()) {
            return Err(ModelError::Duplicate {
                kind: "reaction",
                name: reaction.name().to_string(),
            });
        }
        if reaction.name().is_empty() {
            return Err(ModelError::invalid("reaction name must not be empty"));
        }
        for p in reaction.reactants().iter().chain(reaction.products()) {
            self.add_species(p.species.clone())?;
        }
        self.reaction_index
            .insert(reaction.name().to_string(), self.reactions.len());
        self.reactions.push(reaction);
        Ok(())
    }

    /// Merges every symbol and reaction of `other` into this model.
    pub fn add_submodel(&mut self, other: &Model) -> ModelResult<()> {
        for c in &other.compartments {
            self.add_compartment(c.clone())?;
        }
        for s in &other.species {
            self.add_species(s.clone())?;
        }
        for p in &other.parameters {
            self.add_parameter(p.clone())?;
        }
        for r in &other.reactions {
            self.add_reaction(r.clone())?;
        }
        self.submodels.push(other.name.clone());
        self.submodels.extend(other.submodels.iter().cloned());
        Ok(())
    }

    /// Splits the model into dynamic species and other symbols.
    pub fn flatten(&self) -> FlatModel {
        let is_dynamic = |name: &str| {
            self.reactions.iter().any(|r| {
                r.reactants()
                    .iter()
                    .chain(r.products())
                    .any(|p| p.dynamic && p.species.name() == name)
            })
        };

        let mut flat = FlatModel {
            reactions: self.reactions.clone(),
            ..FlatModel::default()
        };
        for s in &self.species {
            let entry = NamedValue {
                name: s.name().to_string(),
                value: s.population().clone(),
            };
            if is_dynamic(s.name()) {
                flat.dynamic_species.push(entry);
            } else {
                flat.symbols.push(entry);
            }
        }
        flat.symbols.extend(self.compartments.iter().map(|c| NamedValue {
            name: c.name().to_string(),
            value: c.volume().clone(),
        }));
        flat.symbols.extend(self.parameters.iter().map(|p| NamedValue {
            name: p.name().to_string(),
            value: p.value().clone(),
        }));
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_time_name() {
        let mut m = Model::new("m");
        let err = m.add_parameter(Parameter::new("time", 1.0)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput { .. }));
    }

    #[test]
    fn symbol_lookup_by_kind() {
        let mut m = Model::new("m");
        let c = Compartment::new("cell").with_volume(2.0);
        m.add_species(Species::new("A", &c, 5.0)).unwrap();
        m.add_parameter(Parameter::new("k", 0.1)).unwrap();
        assert!(m.species_by_name("A").is_some());
        assert!(m.species_by_name("k").is_none());
        assert_eq!(m.compartment("cell").map(|c| c.volume().clone()), Some(Value::Number(2.0)));
        assert_eq!(m.symbol_value("k"), Some(&Value::Number(0.1)));
        assert_eq!(m.symbol_value("nope"), None);
    }
}
