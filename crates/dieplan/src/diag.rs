//! Diagnostics.

use ecow::EcoString;

/// The result type for fallible construction and parsing.
pub type StrResult<T> = Result<T, EcoString>;

/// Early-return with a formatted [`EcoString`] error.
///
/// ```ignore
/// bail!("module {name}: area must be positive");
/// ```
#[macro_export]
#[doc(hidden)]
macro_rules! __bail {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::diag::eco_format!($fmt $(, $arg)*))
    };
}

/// Construct an [`EcoString`] error without returning it.
#[macro_export]
#[doc(hidden)]
macro_rules! __error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::diag::eco_format!($fmt $(, $arg)*)
    };
}

#[doc(inline)]
pub use {
    crate::__bail as bail, crate::__error as error, ecow::eco_format,
};
