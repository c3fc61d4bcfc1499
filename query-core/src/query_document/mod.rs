mod argument_value;
mod selection;

pub use argument_value::*;
pub use selection::*;
