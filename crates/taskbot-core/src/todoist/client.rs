//! Todoist REST API HTTP client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::TodoistConfig;
use crate::error::{Error, Result};

use super::parse::parse_task_input;
use super::types::*;

/// Task operations the chat front-end relies on
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Create a task from free text, extracting the due hint
    async fn create_task(&self, raw_text: &str, priority: u8) -> Result<Task>;

    /// List every active task
    async fn get_all_tasks(&self) -> Result<Vec<Task>>;

    /// List the tasks due on the current local date
    async fn get_today_tasks(&self) -> Result<Vec<Task>>;
}

/// Keep only the tasks whose due date is exactly `date` (`YYYY-MM-DD`)
pub fn filter_due_on(tasks: Vec<Task>, date: &str) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| t.due_date() == Some(date))
        .collect()
}

/// Reject input the task service would refuse
fn validate_task_params(content: &str, priority: u8) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::Validation(
            "El contenido de la tarea no puede estar vacío".to_string(),
        ));
    }

    if !(PRIORITY_LOW..=PRIORITY_URGENT).contains(&priority) {
        return Err(Error::Validation(format!(
            "La prioridad debe estar entre {} y {}",
            PRIORITY_LOW, PRIORITY_URGENT
        )));
    }

    Ok(())
}

/// Todoist REST API client
#[derive(Clone)]
pub struct TodoistClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TodoistClient {
    /// Create a new Todoist client
    pub fn new(config: &TodoistConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create with custom base URL (for testing or proxies)
    pub fn with_base_url(config: &TodoistConfig, base_url: &str) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Send an already-parsed task to Todoist
    pub async fn add_task(&self, task: &NewTask) -> Result<Task> {
        let url = format!("{}/tasks", self.base_url);

        debug!("Creating task at {}: {:?}", url, task);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(task)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            return Err(Error::Task(format!("{}: {}", status, body)));
        }

        let created: Task = serde_json::from_str(&body)?;
        Ok(created)
    }

    /// Fetch the raw task listing and normalize its shape
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let url = format!("{}/tasks", self.base_url);

        debug!("Listing tasks from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            return Err(Error::Task(format!("{}: {}", status, body)));
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(normalize_task_list(value))
    }

    /// List the tasks due on a given date (`YYYY-MM-DD`)
    pub async fn get_tasks_due(&self, date: &str) -> Result<Vec<Task>> {
        let tasks = self.list_tasks().await.map_err(|e| {
            error!("Failed to list tasks for {}: {}", date, e);
            Error::Task(format!("Error al recuperar tareas para hoy: {}", e))
        })?;

        let due = filter_due_on(tasks, date);
        info!("{} tasks due on {}", due.len(), date);
        Ok(due)
    }
}

#[async_trait]
impl TaskService for TodoistClient {
    async fn create_task(&self, raw_text: &str, priority: u8) -> Result<Task> {
        let parsed = parse_task_input(raw_text);
        validate_task_params(&parsed.content, priority)?;

        let new_task = NewTask {
            content: parsed.content,
            due_hint: parsed.due_hint,
            priority,
        };

        let task = self.add_task(&new_task).await.map_err(|e| {
            error!("Failed to create task: {}", e);
            Error::Task(format!("Error al crear la tarea: {}", e))
        })?;

        info!("Task created: {}", task.content);
        Ok(task)
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        let tasks = self.list_tasks().await.map_err(|e| {
            error!("Failed to list tasks: {}", e);
            Error::Task(format!("Error al recuperar tareas: {}", e))
        })?;

        info!("{} tasks retrieved", tasks.len());
        Ok(tasks)
    }

    async fn get_today_tasks(&self) -> Result<Vec<Task>> {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        self.get_tasks_due(&today).await
    }
}
