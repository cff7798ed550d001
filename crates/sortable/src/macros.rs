//! Early-return helpers for `Outcome`-returning async code.

/// Unwrap an `Outcome::Ok`, returning any other variant from the enclosing
/// function unchanged.
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}

/// Unwrap a `Result`, returning `Outcome::Err` on failure.
macro_rules! try_result {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return $crate::Outcome::Err(e),
        }
    };
}

pub(crate) use {try_outcome, try_result};
