use crate::value::Value;

/// Name of the compartment species land in when none is given.
pub const DEFAULT_COMPARTMENT: &str = "univ";

/// A named volume that species live in.
#[derive(Clone, Debug, PartialEq)]
pub struct Compartment {
    name: String,
    volume: Value,
}

impl Compartment {
    /// Unit-volume compartment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: Value::Number(1.0),
        }
    }

    pub fn with_volume(mut self, volume: impl Into<Value>) -> Self {
        self.volume = volume.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> &Value {
        &self.volume
    }
}

impl Default for Compartment {
    fn default() -> Self {
        Compartment::new(DEFAULT_COMPARTMENT)
    }
}
