//! Taskboard Core - business logic for the task-tracking API
//!
//! This crate implements the core domain logic following hexagonal
//! architecture:
//!
//! - **domain**: Core business entities (Task, User) and input normalization
//! - **ports**: Trait definitions for external dependencies (EntityStore)
//! - **services**: Business logic orchestration (query plans, reconciliation)
//! - **adapters**: Concrete implementations (in-memory store)
//!
//! Assignment is stored denormalized on both sides: each task carries its
//! assignee's id and display name, each user carries the ids of its
//! pending tasks. The services keep the two views convergent under every
//! supported operation without a transactional join.

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;

use std::path::Path;
use std::sync::Arc;

use adapters::memory::MemoryStore;
use config::Config;
use ports::EntityStore;
use services::{QueryPlanBuilder, TaskService, UserService};

// Re-export commonly used types at crate root
pub use domain::result::{Envelope, Error, Result};
pub use domain::{Task, TaskInput, User, UserInput, UNASSIGNED};
pub use services::{ListParams, ListResult};

/// Main context for Taskboard operations
///
/// This is the primary entry point for all business logic. It holds the
/// entity store, configuration, and both services.
pub struct TaskboardContext {
    pub config: Config,
    pub store: Arc<dyn EntityStore>,
    pub task_service: TaskService,
    pub user_service: UserService,
}

impl TaskboardContext {
    /// Create a new context backed by the in-memory store
    pub fn new(taskboard_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(taskboard_dir)?;
        Ok(Self::with_store(config, Arc::new(MemoryStore::new())))
    }

    /// Create a context over any entity store implementation
    pub fn with_store(config: Config, store: Arc<dyn EntityStore>) -> Self {
        let plans = QueryPlanBuilder::new(config.default_task_limit);
        let task_service = TaskService::new(Arc::clone(&store), plans.clone());
        let user_service = UserService::new(Arc::clone(&store), plans);

        Self {
            config,
            store,
            task_service,
            user_service,
        }
    }
}
