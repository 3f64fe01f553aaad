//! Prefixing stub provider.

use super::{HashProvider, ProviderKind};
use crate::error::HashError;

/// Provider whose "hashes" are the input with a marker prefix.
///
/// `hash_a(x) = "A:" + x` and `hash_b(x) = "B:" + x`, so the composition
/// each stage applies can be read straight off the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelHashProvider;

impl HashProvider for LabelHashProvider {
    fn hash_a(&self, text: &str) -> Result<String, HashError> {
        Ok(format!("A:{text}"))
    }

    fn hash_b(&self, text: &str) -> Result<String, HashError> {
        Ok(format!("B:{text}"))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_input() {
        let provider = LabelHashProvider;
        assert_eq!(provider.hash_a("0").unwrap(), "A:0");
        assert_eq!(provider.hash_b("0").unwrap(), "B:0");
        assert_eq!(
            provider.hash_a(&provider.hash_b("1").unwrap()).unwrap(),
            "A:B:1"
        );
    }
}
