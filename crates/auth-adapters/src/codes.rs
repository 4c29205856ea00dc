use domains::CodeGenerator;
use rand::{distr::Alphanumeric, Rng};

/// Upper-case alphanumeric codes, e.g. `Q7KD2M9X`.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    len: usize,
}

impl RandomCodeGenerator {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn referral_code(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_requested_length_and_case() {
        let code = RandomCodeGenerator::new(10).referral_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
