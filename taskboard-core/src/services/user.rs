//! User service - user CRUD and task-list reconciliation
//!
//! Updating a user treats the caller's `pendingTasks` list as
//! authoritative: the service diffs it against the stored list and applies
//! one bulk compensating update per side of the diff before saving the
//! user document verbatim. Task-side writes trust the diff; the user-side
//! write trusts the caller.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_pending_tasks, User, UserInput};
use crate::ports::EntityStore;
use crate::services::query::{EntityKind, ListParams, ListResult, QueryMode, QueryPlanBuilder};

/// User service for user CRUD and user-side reconciliation
pub struct UserService {
    store: Arc<dyn EntityStore>,
    plans: QueryPlanBuilder,
}

impl UserService {
    pub fn new(store: Arc<dyn EntityStore>, plans: QueryPlanBuilder) -> Self {
        Self { store, plans }
    }

    /// List or count users according to the raw query parameters
    pub async fn list(&self, params: &ListParams) -> Result<ListResult> {
        let plan = self.plans.build(EntityKind::User, params);
        match plan.mode {
            QueryMode::Count => Ok(ListResult::Count(self.store.count_users(&plan).await?)),
            QueryMode::Fetch => Ok(ListResult::Documents(self.store.find_users(&plan).await?)),
        }
    }

    /// Fetch one user by id, honoring the `select`/`filter` projection
    pub async fn get(&self, id: &str, params: &ListParams) -> Result<JsonValue> {
        let plan = self.plans.build(EntityKind::User, params);
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;
        Ok(plan.projection.apply(serde_json::to_value(&user)?))
    }

    /// Create a user with an empty pending list
    ///
    /// Assignment cannot be set at creation time; any `pendingTasks` in
    /// the input is ignored.
    pub async fn create(&self, input: UserInput) -> Result<User> {
        let (name, email) = require_name_and_email(&input)?;
        let user = User {
            id: String::new(),
            name,
            email,
            pending_tasks: Vec::new(),
        };
        self.store.insert_user(user).await
    }

    /// Update a user, reconciling its task list against the desired one
    ///
    /// Computes `toUnassign = old - new` and `toAssign = new - old` and
    /// applies bulk compensating updates per set: unassignment is guarded
    /// on the task still pointing at this user; assignment is
    /// unconditional (last-writer-wins) and releases the stolen ids from
    /// their former assignees' pending sets. The user document is saved
    /// last, with the desired list verbatim.
    pub async fn update(&self, id: &str, input: UserInput) -> Result<User> {
        let (name, email) = require_name_and_email(&input)?;
        let desired = normalize_pending_tasks(input.pending_tasks.as_ref());

        let mut user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;

        let to_unassign: Vec<String> = user
            .pending_tasks
            .iter()
            .filter(|task_id| !desired.contains(task_id))
            .cloned()
            .collect();
        let to_assign: Vec<String> = desired
            .iter()
            .filter(|task_id| !user.pending_tasks.contains(task_id))
            .cloned()
            .collect();

        debug!(
            user = %user.id,
            unassign = to_unassign.len(),
            assign = to_assign.len(),
            "reconciling user task list"
        );

        if !to_unassign.is_empty() {
            self.store.unassign_tasks(&to_unassign, &user.id).await?;
        }
        if !to_assign.is_empty() {
            self.store.assign_tasks(&to_assign, &user.id, &name).await?;
            // Stolen tasks must also vanish from their former assignees'
            // pending sets
            self.store
                .release_pending_tasks(&to_assign, &user.id)
                .await?;
        }

        user.name = name;
        user.email = email;
        user.pending_tasks = desired;
        self.store.save_user(&user).await
    }

    /// Delete a user, unassigning every task it still holds first
    pub async fn delete(&self, id: &str) -> Result<()> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;

        if !user.pending_tasks.is_empty() {
            self.store
                .unassign_tasks(&user.pending_tasks, &user.id)
                .await?;
        }
        self.store.delete_user(id).await?;
        Ok(())
    }
}

fn require_name_and_email(input: &UserInput) -> Result<(String, String)> {
    let name = input.name.clone().filter(|n| !n.is_empty());
    let email = input.email.clone().filter(|e| !e.is_empty());
    match (name, email) {
        (Some(name), Some(email)) => Ok((name, email)),
        _ => Err(Error::validation("name and email are required")),
    }
}
