use crate::env::Env;
use crate::error::SprigError;

mod core;
mod math;

#[macro_export]
macro_rules! def_builtin {
    ($env:expr, $name:expr, $arity:expr, |$args:ident| $body:block) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::native(
                $name,
                $arity,
                move |$args: &[$crate::ast::Value]| -> Result<
                    $crate::ast::Value,
                    $crate::error::SprigError,
                > { $body },
            ),
        );
    };
    ($env:expr, $name:expr, $arity:expr, |$args:ident| $body:expr) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::native(
                $name,
                $arity,
                move |$args: &[$crate::ast::Value]| -> Result<
                    $crate::ast::Value,
                    $crate::error::SprigError,
                > { $body },
            ),
        );
    };
}

pub use def_builtin;

pub fn err<T>(msg: impl Into<String>) -> Result<T, SprigError> {
    Err(SprigError::runtime(msg))
}

/// Install every native builtin into the (future) root scope. The
/// standard library layers the rest on top in Sprig itself.
pub fn install_core(env: &mut Env) {
    math::install(env);
    core::install(env);
}
