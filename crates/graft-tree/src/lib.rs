//! Document tree, cursors, and deep merge for graft
//!
//! Every document graft works on is converted into a [`Tree`] at the edge of
//! the system. Locations inside a tree are addressed with [`Cursor`]s, and
//! several source trees are combined into one with [`merge`].

pub mod cursor;
pub mod error;
pub mod merge;
pub mod placeholder;
pub mod value;

pub use cursor::{Cursor, Segment};
pub use error::{Error, MultiError, PathError, Result};
pub use merge::{merge, merge_maps, merge_pair, ListDirective};
pub use placeholder::placeholder_body;
pub use value::{Mapping, Tree};
