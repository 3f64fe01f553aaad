//! The signing stages: pair hash, sextet hash, merge.

mod merge;
mod pair;
mod sextet;

pub use merge::MergeStage;
pub use pair::PairHashStage;
pub use sextet::SextetHashStage;

use crate::error::{panic_message, HashError};
use std::panic::{self, AssertUnwindSafe};

/// Call into a hash provider, turning a panic into a [`HashError`].
pub(crate) fn guarded(
    function: &'static str,
    call: impl FnOnce() -> Result<String, HashError>,
) -> Result<String, HashError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(HashError::Panicked {
            function,
            message: panic_message(payload.as_ref()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_passes_results_through() {
        assert_eq!(guarded("hash_a", || Ok("ok".to_string())).unwrap(), "ok");
    }

    #[test]
    fn guarded_converts_panics() {
        match guarded("hash_b", || panic!("overheated")) {
            Err(HashError::Panicked { function, message }) => {
                assert_eq!(function, "hash_b");
                assert_eq!(message, "overheated");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
