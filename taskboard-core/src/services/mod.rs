//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. The task and
//! user services together keep the two denormalized assignment views
//! convergent; the query module turns raw list parameters into bounded
//! plans.

pub mod query;
mod task;
mod user;

pub use query::{
    EntityKind, ListParams, ListResult, Projection, QueryMode, QueryPlan, QueryPlanBuilder,
    SortDirection,
};
pub use task::TaskService;
pub use user::UserService;
