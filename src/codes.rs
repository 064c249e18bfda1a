use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// source of numeric payment confirmation codes
pub trait PaymentCodeGenerator: Send + Sync {
    /// a code of exactly `length` decimal digits, leading zeros allowed
    fn generate(&self, length: usize) -> String;
}

/// codes drawn from a `StdRng`, reproducible when seeded
#[derive(Debug)]
pub struct SeededCodes {
    rng: Mutex<StdRng>,
}

impl SeededCodes {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// seeded from os entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl Default for SeededCodes {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl PaymentCodeGenerator for SeededCodes {
    fn generate(&self, length: usize) -> String {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// hands out the same code every time
#[derive(Debug, Clone)]
pub struct FixedCode(pub String);

impl PaymentCodeGenerator for FixedCode {
    fn generate(&self, length: usize) -> String {
        self.0.chars().cycle().take(length).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let codes = SeededCodes::default();
        for _ in 0..50 {
            let code = codes.generate(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_seeded_codes_are_reproducible() {
        let a = SeededCodes::new(42);
        let b = SeededCodes::new(42);
        let first: Vec<String> = (0..5).map(|_| a.generate(6)).collect();
        let second: Vec<String> = (0..5).map(|_| b.generate(6)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_code() {
        let codes = FixedCode("123456".to_string());
        assert_eq!(codes.generate(6), "123456");
        assert_eq!(codes.generate(3), "123");
    }
}
