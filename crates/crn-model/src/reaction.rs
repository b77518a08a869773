//! Chemical reactions.
//!
//! A reaction converts reactants into products at a rate given either by a
//! mass-action constant (`Value::Number`) or by an explicit rate law
//! (`Value::Expression`). Reactions may also carry local parameters, a
//! number of intermediate steps and a delay; the latter two are expanded
//! by the simulator before binding.

use std::fmt;

use crn_core::Real;
use crn_expr::builder::{multiply, number, power};
use crn_expr::{Element, Expression};

use crate::error::{ModelError, ModelResult};
use crate::parameter::Parameter;
use crate::species::Species;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticipantKind {
    Reactant,
    Product,
}

/// A species taking part in a reaction.
///
/// `dynamic` participants have their population changed when the reaction
/// fires; non-dynamic ones only contribute to the rate.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionParticipant {
    pub species: Species,
    pub stoichiometry: u32,
    pub dynamic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    name: String,
    rate: Value,
    reactants: Vec<ReactionParticipant>,
    products: Vec<ReactionParticipant>,
    parameters: Vec<Parameter>,
    num_steps: u32,
    delay: Real,
}

impl Reaction {
    pub fn new(name: impl Into<String>, rate: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            rate: rate.into(),
            reactants: Vec::new(),
            products: Vec::new(),
            parameters: Vec::new(),
            num_steps: 1,
            delay: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate(&self) -> &Value {
        &self.rate
    }

    pub fn set_rate(&mut self, rate: impl Into<Value>) {
        self.rate = rate.into();
    }

    pub fn reactants(&self) -> &[ReactionParticipant] {
        &self.reactants
    }

    pub fn products(&self) -> &[ReactionParticipant] {
        &self.products
    }

    pub fn participants(&self, kind: ParticipantKind) -> &[ReactionParticipant] {
        match kind {
            ParticipantKind::Reactant => &self.reactants,
            ParticipantKind::Product => &self.products,
        }
    }

    /// Adds a reactant; it is dynamic iff the species is floating.
    pub fn add_reactant(&mut self, species: &Species, stoichiometry: u32) -> ModelResult<()> {
        self.add_participant(ParticipantKind::Reactant, species, stoichiometry, species.is_floating())
    }

    pub fn add_product(&mut self, species: &Species, stoichiometry: u32) -> ModelResult<()> {
        self.add_participant(ParticipantKind::Product, species, stoichiometry, species.is_floating())
    }

    /// Adds a participant with an explicit dynamic flag.
    ///
    /// Adding a species already present on the same side sums the
    /// stoichiometries; the dynamic flags must agree.
    pub fn add_participant(
        &mut self,
        kind: ParticipantKind,
        species: &Species,
        stoichiometry: u32,
        dynamic: bool,
    ) -> ModelResult<()> {
        if stoichiometry == 0 {
            return Err(ModelError::invalid(format!(
                "stoichiometry of \"{}\" in reaction \"{}\" must be positive",
                species.name(),
                self.name
            )));
        }
        let name = self.name.clone();
        let side = match kind {
            ParticipantKind::Reactant => &mut self.reactants,
            ParticipantKind::Product => &mut self.products,
        };
        match side.iter_mut().find(|p| p.species.name() == species.name()) {
            Some(existing) => {
                if existing.dynamic != dynamic {
                    return Err(ModelError::invalid(format!(
                        "species \"{}\" added to reaction \"{name}\" as both dynamic and non-dynamic",
                        species.name()
                    )));
                }
                existing.stoichiometry = existing
                    .stoichiometry
                    .checked_add(stoichiometry)
                    .ok_or_else(|| ModelError::invalid("stoichiometry overflow"))?;
            }
            None => side.push(ReactionParticipant {
                species: species.clone(),
                stoichiometry,
                dynamic,
            }),
        }
        Ok(())
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Adds a parameter visible only inside this reaction's rate law.
    pub fn add_parameter(&mut self, parameter: Parameter) -> ModelResult<()> {
        if self.parameters.iter().any(|p| p.name() == parameter.name()) {
            return Err(ModelError::Duplicate {
                kind: "reaction parameter",
                name: parameter.name().to_string(),
            });
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn has_local_symbols(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn set_num_steps(&mut self, steps: u32) -> ModelResult<()> {
        if steps == 0 {
            return Err(ModelError::invalid("number of reaction steps must be at least 1"));
        }
        self.num_steps = steps;
        Ok(())
    }

    pub fn delay(&self) -> Real {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Real) -> ModelResult<()> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ModelError::invalid(format!("invalid reaction delay: {delay}")));
        }
        self.delay = delay;
        Ok(())
    }

    /// True if the reaction must be expanded into a chain or a delayed pair.
    pub fn needs_decomposition(&self) -> bool {
        self.num_steps > 1 || self.delay > 0.0
    }

    /// Checks that a multi-step or delayed reaction has the single
    /// reactant, single product, same-compartment shape the expansion needs.
    pub fn validate_decomposable(&self) -> ModelResult<()> {
        let fail = |why: &str| {
            Err(ModelError::invalid(format!(
                "multistep or delayed reaction \"{}\" {why}",
                self.name
            )))
        };
        let ([reactant], [product]) = (self.reactants.as_slice(), self.products.as_slice()) else {
            return fail("must have exactly one reactant and one product");
        };
        if reactant.stoichiometry != 1 || product.stoichiometry != 1 {
            return fail("must have unit stoichiometry");
        }
        if reactant.species.compartment().name() != product.species.compartment().name() {
            return fail("must have reactant and product in the same compartment");
        }
        if self.rate.is_expression() {
            return fail("must have a numeric rate");
        }
        Ok(())
    }

    /// The rate law as an expression.
    ///
    /// An explicit rate expression is returned as-is; a numeric constant `k`
    /// expands to the mass-action law `k * R1^s1 * R2^s2 ...`.
    pub fn rate_expression(&self) -> Expression {
        match &self.rate {
            Value::Expression(e) => e.clone(),
            Value::Number(k) => {
                let law = self.reactants.iter().fold(number(*k), |acc, p| {
                    let s = Element::symbol(p.species.name());
                    let term = if p.stoichiometry > 1 {
                        power(s, number(p.stoichiometry as Real))
                    } else {
                        s
                    };
                    multiply(acc, term)
                });
                Expression::from_element(law)
            }
        }
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, side: &[ReactionParticipant], mark_boundary: bool) -> fmt::Result {
    let mut first = true;
    for p in side {
        for _ in 0..p.stoichiometry {
            if !first {
                f.write_str(" + ")?;
            }
            first = false;
            if mark_boundary && !p.dynamic {
                f.write_str("$")?;
            }
            f.write_str(p.species.name())?;
        }
    }
    Ok(())
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, ", self.name)?;
        write_side(f, &self.reactants, true)?;
        f.write_str(" -> ")?;
        write_side(f, &self.products, false)?;
        write!(f, ",  [Rate: {}]", self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartment::Compartment;

    fn sp(name: &str) -> Species {
        Species::new(name, &Compartment::default(), 0.0)
    }

    #[test]
    fn repeated_participant_aggregates() {
        let a = sp("A");
        let mut r = Reaction::new("r", 1.0);
        r.add_reactant(&a, 1).unwrap();
        r.add_reactant(&a, 2).unwrap();
        assert_eq!(r.reactants().len(), 1);
        assert_eq!(r.reactants()[0].stoichiometry, 3);
    }

    #[test]
    fn conflicting_dynamic_flag_is_rejected() {
        let a = sp("A");
        let mut r = Reaction::new("r", 1.0);
        r.add_participant(ParticipantKind::Reactant, &a, 1, true).unwrap();
        let err = r
            .add_participant(ParticipantKind::Reactant, &a, 1, false)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput { .. }));
    }

    #[test]
    fn zero_stoichiometry_is_rejected() {
        let mut r = Reaction::new("r", 1.0);
        assert!(r.add_product(&sp("B"), 0).is_err());
    }

    #[test]
    fn mass_action_law() {
        let mut r = Reaction::new("r", 0.5);
        r.add_reactant(&sp("A"), 2).unwrap();
        r.add_reactant(&sp("B"), 1).unwrap();
        assert_eq!(r.rate_expression().to_string(), "(0.5*(A^2.0))*B");

        let source = Reaction::new("birth", 2.0);
        assert_eq!(source.rate_expression().as_number(), Some(2.0));
    }

    #[test]
    fn display_marks_boundary_reactants() {
        let src = sp("S").boundary();
        let mut r = Reaction::new("r1", 1.5);
        r.add_reactant(&sp("A"), 2).unwrap();
        r.add_reactant(&src, 1).unwrap();
        r.add_product(&sp("B"), 1).unwrap();
        assert_eq!(r.to_string(), "r1, A + A + $S -> B,  [Rate: 1.5]");
    }

    #[test]
    fn steps_and_delay_validation() {
        let mut r = Reaction::new("r", 1.0);
        assert!(!r.needs_decomposition());
        assert!(r.set_num_steps(0).is_err());
        assert!(r.set_delay(-1.0).is_err());
        assert!(r.set_delay(Real::NAN).is_err());
        r.set_delay(2.0).unwrap();
        assert!(r.needs_decomposition());
        assert!(r.validate_decomposable().is_err());

        r.add_reactant(&sp("A"), 1).unwrap();
        r.add_product(&sp("B"), 1).unwrap();
        r.validate_decomposable().unwrap();

        let other = Compartment::new("nucleus");
        let mut moved = Reaction::new("m", 1.0);
        moved.set_num_steps(3).unwrap();
        moved.add_reactant(&sp("A"), 1).unwrap();
        moved.add_product(&Species::new("B", &other, 0.0), 1).unwrap();
        assert!(moved.validate_decomposable().is_err());
    }

    #[test]
    fn duplicate_local_parameter() {
        let mut r = Reaction::new("r", 1.0);
        r.add_parameter(Parameter::new("k", 1.0)).unwrap();
        assert!(matches!(
            r.add_parameter(Parameter::new("k", 2.0)),
            Err(ModelError::Duplicate { .. })
        ));
        assert!(r.has_local_symbols());
    }
}
