//! The planning layer: walks a client selection tree against the entity
//! schema and rewrites querysets so a request costs one round trip per
//! multi-valued relation, everything else folding into projections and
//! joins on the root query.

mod cache;
mod error;
mod executor;
mod fields;
mod filter_info;
mod optimizer;
mod pagination;
mod plan_store;
mod query_document;
mod resolve_info;
mod settings;
mod walker;

pub use cache::*;
pub use error::*;
pub use executor::*;
pub use fields::*;
pub use filter_info::*;
pub use optimizer::*;
pub use pagination::*;
pub use plan_store::*;
pub use query_document::*;
pub use resolve_info::*;
pub use settings::*;

pub(crate) use walker::*;
