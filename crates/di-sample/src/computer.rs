use elif_di::{Injected, InjectionResult};
use elif_di_derive::injectable;

use crate::multiplier::Multiplier;

/// Computes a fixed product with an injected [`Multiplier`]
#[injectable]
#[derive(Debug, Default)]
pub struct Computer {
    multiplier: Injected<Multiplier>,
}

impl Computer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiply the operands `1` and `2`
    pub fn compute(&self) -> InjectionResult<i32> {
        let (a, b) = (1, 2);
        let product = self.multiplier.get()?.multiply(a, b);
        tracing::debug!("Computed {} x {} = {}", a, b, product);
        Ok(product)
    }
}
