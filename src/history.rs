use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;

const SIMULATION_CAP: usize = 5;
const CHAT_CAP: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationEntry {
    pub timestamp: String,
    pub kind: String,
    pub plant: String,
    pub conditions: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEntry {
    pub timestamp: String,
    pub user: String,
    pub bot: String,
}

/// Capped, most-recent-first logs persisted as JSON files under the
/// config directory. Corrupt or missing files read as empty.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        HistoryStore { dir }
    }

    pub fn open_default() -> Self {
        Self::new(Config::get_config_dir())
    }

    fn simulation_path(&self) -> PathBuf {
        self.dir.join("simulation_history.json")
    }

    fn chat_path(&self) -> PathBuf {
        self.dir.join("chat_history.json")
    }

    /// Prepend, truncate to the cap, persist synchronously.
    pub fn append_simulation(&self, entry: SimulationEntry) -> anyhow::Result<()> {
        let mut entries = self.load_simulations();
        entries.insert(0, entry);
        entries.truncate(SIMULATION_CAP);
        self.persist(&self.simulation_path(), &entries)
    }

    pub fn append_chat(&self, entry: ChatEntry) -> anyhow::Result<()> {
        let mut entries = self.load_chats();
        entries.insert(0, entry);
        entries.truncate(CHAT_CAP);
        self.persist(&self.chat_path(), &entries)
    }

    pub fn load_simulations(&self) -> Vec<SimulationEntry> {
        load_or_empty(&self.simulation_path())
    }

    pub fn load_chats(&self) -> Vec<ChatEntry> {
        load_or_empty(&self.chat_path())
    }

    fn persist<T: Serialize>(&self, path: &PathBuf, entries: &[T]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(entries)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn load_or_empty<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Vec<T> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sim_entry(n: usize) -> SimulationEntry {
        SimulationEntry {
            timestamp: format!("2026-01-0{}T00:00:00Z", n % 9 + 1),
            kind: "simulation".to_string(),
            plant: format!("Plant {n}"),
            conditions: "18-24\u{b0}C, 60% humidity".to_string(),
            summary: "Looks promising".to_string(),
        }
    }

    #[test]
    fn appending_past_the_cap_keeps_five_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());
        for n in 0..6 {
            store.append_simulation(sim_entry(n)).unwrap();
        }
        let entries = store.load_simulations();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].plant, "Plant 5");
        assert_eq!(entries[4].plant, "Plant 1");
    }

    #[test]
    fn chat_cap_is_ten() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());
        for n in 0..12 {
            store
                .append_chat(ChatEntry {
                    timestamp: now_timestamp(),
                    user: format!("question {n}"),
                    bot: "answer".to_string(),
                })
                .unwrap();
        }
        let entries = store.load_chats();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].user, "question 11");
        assert_eq!(entries[9].user, "question 2");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());
        assert!(store.load_simulations().is_empty());
        assert!(store.load_chats().is_empty());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.simulation_path(), "{not json").unwrap();
        assert!(store.load_simulations().is_empty());
    }

    #[test]
    fn entries_survive_reopening_the_store() {
        let dir = TempDir::new().unwrap();
        {
            let store = HistoryStore::new(dir.path().to_path_buf());
            store.append_simulation(sim_entry(1)).unwrap();
        }
        let reopened = HistoryStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.load_simulations().len(), 1);
    }
}
