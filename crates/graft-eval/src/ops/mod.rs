//! Built-in operators

mod concat;
mod grab;
mod inject;
mod vault;

pub use concat::ConcatOperator;
pub use grab::GrabOperator;
pub use inject::InjectOperator;
pub use vault::VaultOperator;
