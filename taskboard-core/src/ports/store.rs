//! Entity store port - document persistence abstraction
//!
//! The core only ever talks to persistence through this trait. Per-document
//! fetch/save and per-filter bulk updates are each atomic; nothing larger
//! is. Timeout and retry policy belong to the implementing adapter.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::{Task, User};
use crate::services::query::QueryPlan;

/// Document store abstraction
///
/// The pending-set membership methods are atomic set-add / set-remove
/// primitives: they replace the racy fetch-modify-save pattern on
/// `User.pendingTasks`, and like a filtered bulk update they match nothing
/// (returning `false`) when the target user does not exist.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // === Tasks ===

    /// Insert a new task, assigning its identifier
    async fn insert_task(&self, task: Task) -> Result<Task>;

    /// Fetch a task by id
    async fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Execute a fetch plan, returning projected documents
    async fn find_tasks(&self, plan: &QueryPlan) -> Result<Vec<JsonValue>>;

    /// Execute a count plan (filter plus skip/limit bounds)
    async fn count_tasks(&self, plan: &QueryPlan) -> Result<u64>;

    /// Whole-document save of a previously fetched task
    async fn save_task(&self, task: &Task) -> Result<Task>;

    /// Delete a task by id; false when no such task existed
    async fn delete_task(&self, id: &str) -> Result<bool>;

    /// Clear assignment on every listed task still assigned to `user_id`;
    /// returns the number of tasks updated
    async fn unassign_tasks(&self, task_ids: &[String], user_id: &str) -> Result<u64>;

    /// Unconditionally assign every listed task to `user_id`, overwriting
    /// any prior assignee; returns the number of tasks updated
    async fn assign_tasks(
        &self,
        task_ids: &[String],
        user_id: &str,
        user_name: &str,
    ) -> Result<u64>;

    // === Users ===

    /// Insert a new user, assigning its identifier; fails on a duplicate
    /// email
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Fetch a user by id
    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Execute a fetch plan, returning projected documents
    async fn find_users(&self, plan: &QueryPlan) -> Result<Vec<JsonValue>>;

    /// Execute a count plan (filter plus skip/limit bounds)
    async fn count_users(&self, plan: &QueryPlan) -> Result<u64>;

    /// Whole-document save of a previously fetched user; fails on a
    /// duplicate email
    async fn save_user(&self, user: &User) -> Result<User>;

    /// Delete a user by id; false when no such user existed
    async fn delete_user(&self, id: &str) -> Result<bool>;

    /// Atomically add a task id to a user's pending set if absent;
    /// returns whether the set changed
    async fn add_pending_task(&self, user_id: &str, task_id: &str) -> Result<bool>;

    /// Atomically remove a task id from a user's pending set; removing an
    /// absent id is a no-op, never an error
    async fn remove_pending_task(&self, user_id: &str, task_id: &str) -> Result<bool>;

    /// Remove the given task ids from every user's pending set except
    /// `except_user_id`; returns the number of users updated. Used when a
    /// user's list update steals tasks from their former assignees.
    async fn release_pending_tasks(&self, task_ids: &[String], except_user_id: &str)
        -> Result<u64>;
}
