//! A small owned SQL abstract syntax tree and renderer.
//!
//! This crate carries the expression language the query planner uses for
//! opaque filter predicates, synthetic annotation columns and window
//! rewrites, together with a deterministic ANSI renderer used for
//! diagnostics and tests.

pub mod ast;
pub mod visitor;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::visitor::{Ansi, Visitor};
}
