use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::notification::Permission;
use crate::schedule::PermissionSource;

/// State that outlives a single run.  Written by the CLI, read by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default)]
    pub permission: Permission,
}

/// File-backed permission, re-read on every query so the daemon picks up a
/// change made by the CLI without restarting.
#[derive(Debug, Clone)]
pub struct PermissionStore {
    state_file: PathBuf,
}

impl PermissionStore {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn load(&self) -> PersistentState {
        let content = match std::fs::read_to_string(&self.state_file) {
            Ok(content) => content,
            Err(_) => return PersistentState::default(),
        };
        match serde_json::from_str::<PersistentState>(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring unreadable state file {:?}: {}", self.state_file, e);
                PersistentState::default()
            }
        }
    }

    pub fn set_permission(&self, permission: Permission) -> anyhow::Result<()> {
        let mut state = self.load();
        state.permission = permission;
        self.save(&state)
    }

    fn save(&self, state: &PersistentState) -> anyhow::Result<()> {
        if let Some(parent) = self.state_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.state_file, json)
            .with_context(|| format!("writing {}", self.state_file.display()))?;
        Ok(())
    }
}

impl PermissionSource for PermissionStore {
    fn permission(&self) -> Permission {
        self.load().permission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default_permission() {
        let dir = tempfile::tempdir().unwrap();
        let store = PermissionStore::new(dir.path().join("state.json"));
        assert_eq!(store.permission(), Permission::Default);
    }

    #[test]
    fn test_set_permission_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("state.json");
        let store = PermissionStore::new(path.clone());

        store.set_permission(Permission::Granted).unwrap();
        assert_eq!(PermissionStore::new(path.clone()).permission(), Permission::Granted);

        store.set_permission(Permission::Denied).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"denied\""));
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(PermissionStore::new(path).permission(), Permission::Default);
    }
}
