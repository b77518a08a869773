use crate::compartment::Compartment;
use crate::value::Value;

/// A chemical species.
///
/// Floating species are changed by the reactions they take part in;
/// boundary species are held constant by the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    name: String,
    compartment: Compartment,
    floating: bool,
    population: Value,
}

impl Species {
    pub fn new(name: impl Into<String>, compartment: &Compartment, population: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            compartment: compartment.clone(),
            floating: true,
            population: population.into(),
        }
    }

    /// Marks the species as a boundary species.
    pub fn boundary(mut self) -> Self {
        self.floating = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compartment(&self) -> &Compartment {
        &self.compartment
    }

    pub fn is_floating(&self) -> bool {
        self.floating
    }

    /// Initial population.
    pub fn population(&self) -> &Value {
        &self.population
    }

    pub fn set_population(&mut self, population: impl Into<Value>) {
        self.population = population.into();
    }
}
