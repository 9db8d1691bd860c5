pub mod date;
pub mod person;
pub mod tree;
pub mod workspace;

pub use date::PartialDate;
pub use person::{Person, PersonPatch};
pub use tree::{InvariantViolation, Tree, TreeSummary};
pub use workspace::Workspace;
