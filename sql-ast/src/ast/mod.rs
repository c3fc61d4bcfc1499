mod column;
mod expression;
mod function;
mod ordering;
mod over;
mod select;
mod values;

pub use column::*;
pub use expression::*;
pub use function::*;
pub use ordering::*;
pub use over::*;
pub use select::*;
pub use values::*;
