//! Core domain entities
//!
//! Pure data structures and input normalization - no I/O or external
//! dependencies.

mod task;
mod user;
pub mod result;

pub use task::{normalize_completed, parse_deadline, Task, TaskInput, UNASSIGNED};
pub use user::{normalize_pending_tasks, User, UserInput};

pub(crate) use task::is_blank;
