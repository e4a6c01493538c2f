use crate::model::TaskList;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("reading {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("writing {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("parsing desk file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("locating data directory")]
    NoDataDir,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator. Lists own their tasks, so deleting a list
/// cascades. Mutations are staged in memory until `save`.
pub trait Store {
    /// Every list, oldest first.
    fn query_all(&self) -> &[TaskList];
    fn get_mut(&mut self, hash: &str) -> Option<&mut TaskList>;
    fn insert(&mut self, list: TaskList);
    fn delete(&mut self, hash: &str) -> Option<TaskList>;
    fn save(&mut self) -> Result<(), StoreError>;

    fn get(&self, hash: &str) -> Option<&TaskList> {
        self.query_all().iter().find(|l| l.hash() == hash)
    }
}

/// On-disk layout of the data file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Desk {
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

impl Desk {
    fn insert(&mut self, list: TaskList) {
        let idx = self
            .lists
            .partition_point(|l| l.created_at <= list.created_at);
        self.lists.insert(idx, list);
    }

    fn delete(&mut self, hash: &str) -> Option<TaskList> {
        let idx = self.lists.iter().position(|l| l.hash() == hash)?;
        Some(self.lists.remove(idx))
    }

    fn get_mut(&mut self, hash: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.hash() == hash)
    }
}

#[derive(Debug)]
pub struct YamlStore {
    path: PathBuf,
    desk: Desk,
}

impl YamlStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let desk = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            if data.trim().is_empty() {
                Desk::default()
            } else {
                let mut desk: Desk = serde_yaml::from_str(&data)?;
                desk.lists.sort_by_key(|l| l.created_at);
                desk
            }
        } else {
            Desk::default()
        };
        tracing::debug!(path = ?path, lists = desk.lists.len(), "opened desk store");
        Ok(YamlStore { path, desk })
    }

    pub fn open_default() -> Result<Self, StoreError> {
        YamlStore::open(default_store_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for YamlStore {
    fn query_all(&self) -> &[TaskList] {
        &self.desk.lists
    }

    fn get_mut(&mut self, hash: &str) -> Option<&mut TaskList> {
        self.desk.get_mut(hash)
    }

    fn insert(&mut self, list: TaskList) {
        self.desk.insert(list);
    }

    fn delete(&mut self, hash: &str) -> Option<TaskList> {
        self.desk.delete(hash)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = serde_yaml::to_string(&self.desk)?;
        fs::write(&self.path, serialized).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Store that never touches disk; `fail_saves` simulates a broken device.
#[derive(Debug, Default)]
pub struct MemoryStore {
    desk: Desk,
    pub saves: usize,
    pub fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_lists(lists: Vec<TaskList>) -> Self {
        let mut store = MemoryStore::new();
        for list in lists {
            store.desk.insert(list);
        }
        store
    }
}

impl Store for MemoryStore {
    fn query_all(&self) -> &[TaskList] {
        &self.desk.lists
    }

    fn get_mut(&mut self, hash: &str) -> Option<&mut TaskList> {
        self.desk.get_mut(hash)
    }

    fn insert(&mut self, list: TaskList) {
        self.desk.insert(list);
    }

    fn delete(&mut self, hash: &str) -> Option<TaskList> {
        self.desk.delete(hash)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("save rejected".into()));
        }
        self.saves += 1;
        Ok(())
    }
}

pub fn default_store_path() -> Result<PathBuf, StoreError> {
    let dirs = ProjectDirs::from("", "", "stickydesk").ok_or(StoreError::NoDataDir)?;
    Ok(dirs.data_dir().join("desk.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn list_at(secs: i64) -> TaskList {
        TaskList::new(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap())
    }

    #[test]
    fn yaml_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("desk.yml");

        let mut store = YamlStore::open(&path).unwrap();
        assert!(store.query_all().is_empty());
        let mut list = list_at(5);
        list.set_topic("groceries");
        list.append_task("milk");
        let hash = list.hash();
        store.insert(list);
        store.save().unwrap();

        let reopened = YamlStore::open(&path).unwrap();
        let loaded = reopened.get(&hash).unwrap();
        assert_eq!(loaded.topic.as_deref(), Some("Groceries"));
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].text, "Milk");
    }

    #[test]
    fn query_all_is_oldest_first() {
        let mut store = MemoryStore::new();
        store.insert(list_at(30));
        store.insert(list_at(10));
        store.insert(list_at(20));
        let stamps: Vec<i64> = store
            .query_all()
            .iter()
            .map(|l| l.created_at.timestamp() - 1_700_000_000)
            .collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[test]
    fn delete_unknown_hash_is_none() {
        let mut store = MemoryStore::with_lists(vec![list_at(1)]);
        assert!(store.delete("0000000000000000").is_none());
        assert_eq!(store.query_all().len(), 1);
    }

    #[test]
    fn failing_store_reports_error() {
        let mut store = MemoryStore::new();
        store.fail_saves = true;
        assert!(matches!(store.save(), Err(StoreError::Unavailable(_))));
        assert_eq!(store.saves, 0);
    }

    #[test]
    fn unreadable_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.yml");
        fs::write(&path, "lists: [unterminated").unwrap();
        assert!(matches!(YamlStore::open(&path), Err(StoreError::Parse(_))));
    }
}
