//! Fixed-step time integrators.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// A system `dx/dt = f(t, x)` with vector-space state arithmetic.
pub trait TransientModel {
    type State: Clone;

    /// State derivative at `(t, x)`. Takes `&mut self` so the model can
    /// reuse scratch buffers between calls.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Element-wise `a + b`.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// `scale * a`.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}

pub trait Integrator {
    /// Advances `x` from `t` to `t + dt`.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical fourth-order Runge-Kutta.
#[derive(Clone, Copy, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // x + dt/6 (k1 + 2 k2 + 2 k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Explicit first-order Euler, one rhs call per step.
#[derive(Clone, Copy, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegratorType {
    #[default]
    RK4,
    ForwardEuler,
}

impl IntegratorType {
    pub fn step<M: TransientModel>(
        self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        match self {
            IntegratorType::RK4 => RK4.step(model, t, x, dt),
            IntegratorType::ForwardEuler => ForwardEuler.step(model, t, x, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dx/dt = -x
    struct Decay;

    impl TransientModel for Decay {
        type State = f64;

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(-x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }
    }

    fn integrate(kind: IntegratorType, steps: usize) -> f64 {
        let dt = 1.0 / steps as f64;
        let mut x = 1.0;
        for i in 0..steps {
            x = kind.step(&mut Decay, i as f64 * dt, &x, dt).unwrap();
        }
        x
    }

    #[test]
    fn rk4_is_fourth_order() {
        let exact = (-1.0_f64).exp();
        assert!((integrate(IntegratorType::RK4, 10) - exact).abs() < 1e-6);
        assert!((integrate(IntegratorType::ForwardEuler, 1000) - exact).abs() < 1e-3);
        assert!((integrate(IntegratorType::ForwardEuler, 10) - exact).abs() > 1e-2);
    }
}
