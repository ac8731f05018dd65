//! In-memory entity store
//!
//! Backs tests and default wiring. Documents live in insertion-ordered
//! vectors behind async locks; ids are UUID v4 strings assigned at insert.
//! Each method is atomic with respect to its own lock, which is exactly
//! the per-document / per-filter atomicity the port promises - nothing
//! larger.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Task, User, UNASSIGNED};
use crate::ports::EntityStore;
use crate::services::query::QueryPlan;

/// In-memory document store implementing the entity store port
pub struct MemoryStore {
    tasks: RwLock<Vec<Task>>,
    users: RwLock<Vec<User>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            users: RwLock::new(Vec::new()),
        }
    }

    fn serialize_all<T: serde::Serialize>(docs: &[T]) -> Result<Vec<JsonValue>> {
        docs.iter()
            .map(|d| serde_json::to_value(d).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // === Tasks ===

    async fn insert_task(&self, mut task: Task) -> Result<Task> {
        task.id = Uuid::new_v4().to_string();
        let mut tasks = self.tasks.write().await;
        tasks.push(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tasks(&self, plan: &QueryPlan) -> Result<Vec<JsonValue>> {
        let tasks = self.tasks.read().await;
        Ok(plan.run(Self::serialize_all(&tasks)?))
    }

    async fn count_tasks(&self, plan: &QueryPlan) -> Result<u64> {
        let tasks = self.tasks.read().await;
        Ok(plan.run_count(Self::serialize_all(&tasks)?))
    }

    async fn save_task(&self, task: &Task) -> Result<Task> {
        if task.id.is_empty() {
            return Err(Error::store("cannot save a task without an id"));
        }
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter().position(|t| t.id == id) {
            Some(index) => {
                tasks.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unassign_tasks(&self, task_ids: &[String], user_id: &str) -> Result<u64> {
        let mut tasks = self.tasks.write().await;
        let mut updated = 0;
        for task in tasks
            .iter_mut()
            .filter(|t| task_ids.contains(&t.id) && t.assigned_user == user_id)
        {
            task.assigned_user.clear();
            task.assigned_user_name = UNASSIGNED.to_string();
            updated += 1;
        }
        Ok(updated)
    }

    async fn assign_tasks(
        &self,
        task_ids: &[String],
        user_id: &str,
        user_name: &str,
    ) -> Result<u64> {
        let mut tasks = self.tasks.write().await;
        let mut updated = 0;
        for task in tasks.iter_mut().filter(|t| task_ids.contains(&t.id)) {
            task.assigned_user = user_id.to_string();
            task.assigned_user_name = user_name.to_string();
            updated += 1;
        }
        Ok(updated)
    }

    // === Users ===

    async fn insert_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(Error::unique("Email"));
        }
        user.id = Uuid::new_v4().to_string();
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_users(&self, plan: &QueryPlan) -> Result<Vec<JsonValue>> {
        let users = self.users.read().await;
        Ok(plan.run(Self::serialize_all(&users)?))
    }

    async fn count_users(&self, plan: &QueryPlan) -> Result<u64> {
        let users = self.users.read().await;
        Ok(plan.run_count(Self::serialize_all(&users)?))
    }

    async fn save_user(&self, user: &User) -> Result<User> {
        if user.id.is_empty() {
            return Err(Error::store("cannot save a user without an id"));
        }
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id != user.id && u.email == user.email) {
            return Err(Error::unique("Email"));
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.iter().position(|u| u.id == id) {
            Some(index) => {
                users.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_pending_task(&self, user_id: &str, task_id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        // A missing user matches nothing, like a filtered bulk update
        let Some(user) = users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(false);
        };
        if user.pending_tasks.iter().any(|t| t == task_id) {
            return Ok(false);
        }
        user.pending_tasks.push(task_id.to_string());
        Ok(true)
    }

    async fn remove_pending_task(&self, user_id: &str, task_id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(false);
        };
        let before = user.pending_tasks.len();
        user.pending_tasks.retain(|t| t != task_id);
        Ok(user.pending_tasks.len() != before)
    }

    async fn release_pending_tasks(
        &self,
        task_ids: &[String],
        except_user_id: &str,
    ) -> Result<u64> {
        let mut users = self.users.write().await;
        let mut updated = 0;
        for user in users.iter_mut().filter(|u| u.id != except_user_id) {
            let before = user.pending_tasks.len();
            user.pending_tasks.retain(|t| !task_ids.contains(t));
            if user.pending_tasks.len() != before {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query::{EntityKind, ListParams, QueryPlanBuilder};

    fn task(name: &str) -> Task {
        Task {
            id: String::new(),
            name: name.to_string(),
            description: String::new(),
            deadline: None,
            completed: false,
            assigned_user: String::new(),
            assigned_user_name: UNASSIGNED.to_string(),
        }
    }

    fn user(name: &str, email: &str) -> User {
        User {
            id: String::new(),
            name: name.to_string(),
            email: email.to_string(),
            pending_tasks: Vec::new(),
        }
    }

    fn plan(pairs: &[(&str, &str)]) -> QueryPlan {
        let params = ListParams::from_pairs(pairs.iter().map(|(k, v)| (*k, v.to_string())));
        QueryPlanBuilder::new(100).build(EntityKind::Task, &params)
    }

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.insert_task(task("a")).await.unwrap();
        let b = store.insert_task(task("b")).await.unwrap();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_save_task_replaces_in_place() {
        let store = MemoryStore::new();
        let mut t = store.insert_task(task("a")).await.unwrap();
        t.completed = true;
        store.save_task(&t).await.unwrap();

        let fetched = store.get_task(&t.id).await.unwrap().unwrap();
        assert!(fetched.completed);
        let all = store.find_tasks(&plan(&[])).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_save_without_id_is_store_error() {
        let store = MemoryStore::new();
        let err = store.save_task(&task("a")).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_unique_email_on_insert_and_save() {
        let store = MemoryStore::new();
        store.insert_user(user("Alice", "a@x.com")).await.unwrap();
        let err = store.insert_user(user("Bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint(_)));

        let mut bob = store.insert_user(user("Bob", "b@x.com")).await.unwrap();
        bob.email = "a@x.com".to_string();
        let err = store.save_user(&bob).await.unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint(_)));

        // Saving a user with its own unchanged email is fine
        let alice = store
            .find_users(&plan(&[]))
            .await
            .unwrap()
            .into_iter()
            .find(|u| u["name"] == "Alice")
            .unwrap();
        let alice = store
            .get_user(alice["id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        store.save_user(&alice).await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_set_membership_semantics() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("Alice", "a@x.com")).await.unwrap();

        assert!(store.add_pending_task(&u.id, "t1").await.unwrap());
        // Double add is a no-op
        assert!(!store.add_pending_task(&u.id, "t1").await.unwrap());
        let fetched = store.get_user(&u.id).await.unwrap().unwrap();
        assert_eq!(fetched.pending_tasks, vec!["t1"]);

        assert!(store.remove_pending_task(&u.id, "t1").await.unwrap());
        // Double remove is a no-op, never an error
        assert!(!store.remove_pending_task(&u.id, "t1").await.unwrap());

        // Missing user matches nothing
        assert!(!store.add_pending_task("ghost", "t1").await.unwrap());
        assert!(!store.remove_pending_task("ghost", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unassign_is_guarded_on_current_assignee() {
        let store = MemoryStore::new();
        let mut a = task("a");
        a.assigned_user = "alice".to_string();
        a.assigned_user_name = "Alice".to_string();
        let a = store.insert_task(a).await.unwrap();

        let mut b = task("b");
        b.assigned_user = "bob".to_string();
        b.assigned_user_name = "Bob".to_string();
        let b = store.insert_task(b).await.unwrap();

        // Unassign both ids on behalf of alice: only her task changes
        let ids = vec![a.id.clone(), b.id.clone()];
        let updated = store.unassign_tasks(&ids, "alice").await.unwrap();
        assert_eq!(updated, 1);

        let a = store.get_task(&a.id).await.unwrap().unwrap();
        assert_eq!(a.assigned_user, "");
        assert_eq!(a.assigned_user_name, UNASSIGNED);
        let b = store.get_task(&b.id).await.unwrap().unwrap();
        assert_eq!(b.assigned_user, "bob");
    }

    #[tokio::test]
    async fn test_assign_is_unconditional() {
        let store = MemoryStore::new();
        let mut t = task("t");
        t.assigned_user = "bob".to_string();
        t.assigned_user_name = "Bob".to_string();
        let t = store.insert_task(t).await.unwrap();

        let updated = store
            .assign_tasks(&[t.id.clone()], "alice", "Alice")
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let t = store.get_task(&t.id).await.unwrap().unwrap();
        assert_eq!(t.assigned_user, "alice");
        assert_eq!(t.assigned_user_name, "Alice");
    }

    #[tokio::test]
    async fn test_find_applies_plan() {
        let store = MemoryStore::new();
        for name in ["c", "a", "b"] {
            store.insert_task(task(name)).await.unwrap();
        }
        let mut done = task("done");
        done.completed = true;
        store.insert_task(done).await.unwrap();

        let docs = store
            .find_tasks(&plan(&[
                ("where", r#"{"completed":false}"#),
                ("sort", r#"{"name":1}"#),
                ("select", r#"{"name":1}"#),
            ]))
            .await
            .unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        // Projection keeps only id and name
        assert!(docs[0].get("completed").is_none());
        assert!(docs[0].get("id").is_some());

        let count = store
            .count_tasks(&plan(&[("where", r#"{"completed":false}"#), ("count", "true")]))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }
}
