//! Task service - task CRUD with assignment reconciliation
//!
//! Every write is a bounded, strictly ordered sequence of store calls with
//! no ambient transaction. User-side compensations always run before the
//! final task write, so a mid-sequence failure leaves pending sets under-
//! rather than over-populated; every step is idempotent and a retry of the
//! same operation converges.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{is_blank, normalize_completed, parse_deadline, Task, TaskInput, UNASSIGNED};
use crate::ports::EntityStore;
use crate::services::query::{EntityKind, ListParams, ListResult, QueryMode, QueryPlanBuilder};

/// Task service for task CRUD and task-side reconciliation
pub struct TaskService {
    store: Arc<dyn EntityStore>,
    plans: QueryPlanBuilder,
}

impl TaskService {
    pub fn new(store: Arc<dyn EntityStore>, plans: QueryPlanBuilder) -> Self {
        Self { store, plans }
    }

    /// List or count tasks according to the raw query parameters
    pub async fn list(&self, params: &ListParams) -> Result<ListResult> {
        let plan = self.plans.build(EntityKind::Task, params);
        match plan.mode {
            QueryMode::Count => Ok(ListResult::Count(self.store.count_tasks(&plan).await?)),
            QueryMode::Fetch => Ok(ListResult::Documents(self.store.find_tasks(&plan).await?)),
        }
    }

    /// Fetch one task by id, honoring the `select`/`filter` projection
    pub async fn get(&self, id: &str, params: &ListParams) -> Result<JsonValue> {
        let plan = self.plans.build(EntityKind::Task, params);
        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| Error::not_found("Task"))?;
        Ok(plan.projection.apply(serde_json::to_value(&task)?))
    }

    /// Create a task, linking it into its assignee's pending set
    ///
    /// The assignee is resolved before anything is persisted, so an
    /// unknown `assignedUser` leaves no document created. The task is
    /// persisted first (it needs an id), then linked; a failure of the
    /// link is surfaced but the task is not rolled back.
    pub async fn create(&self, input: TaskInput) -> Result<Task> {
        let name = match input.name {
            Some(n) if !n.is_empty() => n,
            _ => return Err(Error::validation("name is required")),
        };
        let completed = normalize_completed(input.completed.as_ref());
        let deadline = match input.deadline.as_ref() {
            Some(v) if !is_blank(Some(v)) => Some(
                parse_deadline(v).ok_or_else(|| Error::validation("deadline is not a valid date"))?,
            ),
            _ => None,
        };
        let assigned_user = input.assigned_user.unwrap_or_default();

        let mut task = Task {
            id: String::new(),
            name,
            description: input.description.unwrap_or_default(),
            deadline,
            completed,
            assigned_user: assigned_user.clone(),
            assigned_user_name: UNASSIGNED.to_string(),
        };

        if task.is_assigned() {
            let user = self
                .store
                .get_user(&assigned_user)
                .await?
                .ok_or_else(|| Error::reference("assignedUser"))?;
            task.assigned_user_name = user.name;
        }

        let created = self.store.insert_task(task).await?;

        if created.is_assigned() && !created.completed {
            if let Err(err) = self
                .store
                .add_pending_task(&created.assigned_user, &created.id)
                .await
            {
                // Accepted consistency gap: the task is persisted and
                // stays persisted; the missing link is re-correctable.
                warn!(
                    task = %created.id,
                    user = %created.assigned_user,
                    error = %err,
                    "task created but pending-set link failed"
                );
                return Err(err);
            }
        }

        Ok(created)
    }

    /// Update a task, reconciling both the previous and the new assignee
    pub async fn update(&self, id: &str, input: TaskInput) -> Result<Task> {
        // Update is stricter than create: name AND deadline are required
        let name = match input.name {
            Some(n) if !n.is_empty() => n,
            _ => return Err(Error::validation("name and deadline are required")),
        };
        if is_blank(input.deadline.as_ref()) {
            return Err(Error::validation("name and deadline are required"));
        }
        let deadline = input
            .deadline
            .as_ref()
            .and_then(parse_deadline)
            .ok_or_else(|| Error::validation("deadline is not a valid date"))?;
        let completed = normalize_completed(input.completed.as_ref());
        let next_user = input.assigned_user.unwrap_or_default();

        let mut task = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| Error::not_found("Task"))?;
        let prev_user = task.assigned_user.clone();

        task.name = name;
        task.description = input.description.unwrap_or_default();
        task.deadline = Some(deadline);
        task.completed = completed;
        task.assigned_user = next_user.clone();

        if next_user.is_empty() {
            task.assigned_user_name = UNASSIGNED.to_string();
        } else {
            let user = self
                .store
                .get_user(&next_user)
                .await?
                .ok_or_else(|| Error::reference("assignedUser"))?;
            task.assigned_user_name = user.name;

            // Step 1: link into the new assignee's pending set. The
            // add-if-absent primitive covers the mandatory presence
            // check, so self-reassignment cannot duplicate the entry.
            if !task.completed {
                self.store.add_pending_task(&next_user, &task.id).await?;
            }
        }

        // Step 2: unlink from the previous assignee on reassignment
        if !prev_user.is_empty() && prev_user != next_user {
            self.store.remove_pending_task(&prev_user, &task.id).await?;
        }

        // Step 3: a completed task is never pending, whether or not the
        // assignee changed
        if task.completed && task.is_assigned() {
            self.store
                .remove_pending_task(&task.assigned_user, &task.id)
                .await?;
        }

        // The task document is saved last, after every user-side
        // compensation
        let saved = self.store.save_task(&task).await?;
        debug!(
            task = %saved.id,
            prev_user = %prev_user,
            next_user = %saved.assigned_user,
            completed = saved.completed,
            "task reconciled"
        );
        Ok(saved)
    }

    /// Delete a task, unlinking it from its assignee first
    pub async fn delete(&self, id: &str) -> Result<()> {
        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| Error::not_found("Task"))?;

        // The back-reference is removed before the task document: a
        // failure in between leaves the task referenced but existing,
        // which a retry can still correct, rather than a dangling id.
        if task.is_assigned() {
            self.store
                .remove_pending_task(&task.assigned_user, &task.id)
                .await?;
        }
        self.store.delete_task(id).await?;
        Ok(())
    }
}
