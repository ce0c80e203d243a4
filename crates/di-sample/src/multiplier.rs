use elif_di_derive::injectable;

/// Stateless integer multiplication
#[injectable]
#[derive(Debug, Default)]
pub struct Multiplier;

impl Multiplier {
    pub fn new() -> Self {
        Self
    }

    pub fn multiply(&self, a: i32, b: i32) -> i32 {
        a * b
    }
}
