// Static list of backend projects (environment or built-in) and the current selection.

use crate::credential_store::{KvStore, SELECTED_PROJECT_KEY};
use crate::models::Project;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Environment slots scanned: `<PREFIX>_PROJECT_1_*` .. `<PREFIX>_PROJECT_5_*`.
pub const PROJECT_SLOTS: usize = 5;

const PALETTE: [&str; PROJECT_SLOTS] = ["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6"];

fn var_name(prefix: &str, slot: usize, field: &str) -> String {
    if prefix.is_empty() {
        format!("PROJECT_{}_{}", slot, field)
    } else {
        format!("{}_PROJECT_{}_{}", prefix, slot, field)
    }
}

/// Projects defined through `lookup` (normally the process environment). A slot counts
/// only when both NAME and API_URL are non-empty. ENABLED is false only for "false".
pub fn projects_from_vars<F>(prefix: &str, lookup: F) -> Vec<Project>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |slot: usize, field: &str| lookup(&var_name(prefix, slot, field)).filter(|v| !v.is_empty());
    (1..=PROJECT_SLOTS)
        .filter_map(|slot| {
            let name = get(slot, "NAME")?;
            let api_url = get(slot, "API_URL")?;
            let enabled = lookup(&var_name(prefix, slot, "ENABLED")).as_deref() != Some("false");
            Some(Project {
                id: format!("project-{}", slot),
                name,
                api_url,
                description: get(slot, "DESCRIPTION"),
                color: Some(PALETTE[slot - 1].to_string()),
                enabled,
            })
        })
        .collect()
}

pub fn projects_from_env(prefix: &str) -> Vec<Project> {
    projects_from_vars(prefix, |key| std::env::var(key).ok())
}

/// Built-in targets used when nothing is configured.
pub fn default_projects() -> Vec<Project> {
    let entries = [
        ("SMT V1 Backend", "https://test.flyai.tr:8080", "Spring Boot Backend"),
        ("Project 2", "http://localhost:8081", "Second Project"),
        ("Project 3", "http://localhost:8082", "Third Project"),
        ("Project 4", "http://localhost:8083", "Fourth Project"),
        ("Project 5", "http://localhost:8084", "Fifth Project"),
    ];
    entries
        .iter()
        .enumerate()
        .map(|(i, (name, url, description))| Project {
            id: format!("project-{}", i + 1),
            name: name.to_string(),
            api_url: url.to_string(),
            description: Some(description.to_string()),
            color: Some(PALETTE[i].to_string()),
            enabled: true,
        })
        .collect()
}

pub fn load_projects(prefix: &str) -> Vec<Project> {
    let from_env = projects_from_env(prefix);
    if from_env.is_empty() {
        info!("no projects configured in environment; using built-in list");
        default_projects()
    } else {
        from_env
    }
}

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("unknown project {0}")]
    NotFound(String),
    #[error("project {0} is disabled")]
    Disabled(String),
}

pub struct ProjectRegistry {
    prefix: String,
    projects: RwLock<Vec<Project>>,
    current: RwLock<Option<String>>,
    kv: Arc<dyn KvStore>,
}

impl ProjectRegistry {
    /// Registry over an explicit project list; nothing is selected until `restore`.
    pub fn new(prefix: &str, projects: Vec<Project>, kv: Arc<dyn KvStore>) -> Self {
        Self {
            prefix: prefix.to_string(),
            projects: RwLock::new(projects),
            current: RwLock::new(None),
            kv,
        }
    }

    /// Load from the environment (or defaults) and restore the persisted selection.
    pub async fn load(prefix: &str, kv: Arc<dyn KvStore>) -> Self {
        let registry = Self::new(prefix, load_projects(prefix), kv);
        registry.restore().await;
        registry
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Project> {
        self.projects.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn current(&self) -> Option<Project> {
        let id = self.current.read().await.clone()?;
        self.get(&id).await
    }

    /// Make `id` current and persist it. Disabled projects cannot be selected.
    pub async fn select(&self, id: &str) -> Result<Project, SelectError> {
        let project = self
            .get(id)
            .await
            .ok_or_else(|| SelectError::NotFound(id.to_string()))?;
        if !project.enabled {
            return Err(SelectError::Disabled(id.to_string()));
        }
        self.set_current(&project).await;
        Ok(project)
    }

    /// Saved project if it still exists and is enabled, else the first enabled
    /// project, else the first project. The choice is persisted.
    pub async fn restore(&self) -> Option<Project> {
        let saved = match self.kv.get(SELECTED_PROJECT_KEY).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "could not read saved project selection");
                None
            }
        };
        let chosen = {
            let projects = self.projects.read().await;
            saved
                .and_then(|id| projects.iter().find(|p| p.id == id && p.enabled).cloned())
                .or_else(|| projects.iter().find(|p| p.enabled).cloned())
                .or_else(|| projects.first().cloned())
        }?;
        self.set_current(&chosen).await;
        Some(chosen)
    }

    /// Re-read configuration. The selection survives unless its project disappeared.
    pub async fn reload(&self) {
        *self.projects.write().await = load_projects(&self.prefix);
        if self.current().await.is_none() {
            self.restore().await;
        }
    }

    async fn set_current(&self, project: &Project) {
        *self.current.write().await = Some(project.id.clone());
        if let Err(e) = self.kv.set(SELECTED_PROJECT_KEY, &project.id).await {
            warn!(error = %e, project = %project.id, "could not persist project selection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn enabled_defaults_to_true_when_absent() {
        let p = projects_from_vars(
            "MONITOR",
            vars(&[
                ("MONITOR_PROJECT_1_NAME", "Billing"),
                ("MONITOR_PROJECT_1_API_URL", "http://billing:8080"),
            ]),
        );
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].id, "project-1");
        assert!(p[0].enabled);
        assert_eq!(p[0].color.as_deref(), Some("#3b82f6"));
        assert_eq!(p[0].description, None);
    }

    #[test]
    fn only_literal_false_disables() {
        for (value, expected) in [("false", false), ("FALSE", true), ("0", true), ("no", true), ("true", true)] {
            let p = projects_from_vars(
                "",
                vars(&[
                    ("PROJECT_2_NAME", "Orders"),
                    ("PROJECT_2_API_URL", "http://orders"),
                    ("PROJECT_2_ENABLED", value),
                ]),
            );
            assert_eq!(p[0].enabled, expected, "ENABLED={value}");
            assert_eq!(p[0].id, "project-2");
            assert_eq!(p[0].color.as_deref(), Some("#10b981"));
        }
    }

    #[test]
    fn slot_needs_both_name_and_url() {
        let p = projects_from_vars(
            "X",
            vars(&[
                ("X_PROJECT_1_NAME", "only name"),
                ("X_PROJECT_3_API_URL", "http://only-url"),
                ("X_PROJECT_4_NAME", ""),
                ("X_PROJECT_4_API_URL", "http://empty-name"),
            ]),
        );
        assert!(p.is_empty());
    }

    #[test]
    fn defaults_have_five_enabled_projects() {
        let d = default_projects();
        assert_eq!(d.len(), PROJECT_SLOTS);
        assert!(d.iter().all(|p| p.enabled));
        assert_eq!(d[0].api_url, "https://test.flyai.tr:8080");
    }
}
