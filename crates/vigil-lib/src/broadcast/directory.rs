//! Connected-clients directory
//!
//! Written only by the connect, registration and disconnect handlers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    pub registered: bool,
    pub connected_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at_ms: Option<i64>,
}

/// Registration payload sent by a client
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ClientDirectory {
    entries: RwLock<BTreeMap<String, ClientEntry>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, now_ms: i64) {
        self.entries.write().insert(
            id.to_string(),
            ClientEntry {
                id: id.to_string(),
                name: None,
                kind: None,
                capabilities: Vec::new(),
                registered: false,
                connected_at_ms: now_ms,
                registered_at_ms: None,
            },
        );
    }

    /// Add or update the registration of `id`
    pub fn register(&self, id: &str, registration: Registration, now_ms: i64) {
        let mut entries = self.entries.write();
        let entry = entries.entry(id.to_string()).or_insert_with(|| ClientEntry {
            id: id.to_string(),
            name: None,
            kind: None,
            capabilities: Vec::new(),
            registered: false,
            connected_at_ms: now_ms,
            registered_at_ms: None,
        });
        entry.name = Some(registration.name);
        entry.kind = registration.kind;
        entry.capabilities = registration.capabilities;
        entry.registered = true;
        entry.registered_at_ms = Some(now_ms);
    }

    pub fn remove(&self, id: &str) -> Option<ClientEntry> {
        self.entries.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<ClientEntry> {
        self.entries.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<ClientEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_updates_existing_entry() {
        let directory = ClientDirectory::new();
        directory.insert("a", 1_000);
        directory.register(
            "a",
            Registration {
                name: "planner".to_string(),
                kind: Some("agent".to_string()),
                capabilities: vec!["reasoning".to_string()],
            },
            2_000,
        );

        let entry = directory.get("a").unwrap();
        assert!(entry.registered);
        assert_eq!(entry.connected_at_ms, 1_000);
        assert_eq!(entry.registered_at_ms, Some(2_000));
        assert_eq!(directory.len(), 1);

        directory.register(
            "a",
            Registration {
                name: "planner-v2".to_string(),
                ..Default::default()
            },
            3_000,
        );
        assert_eq!(directory.get("a").unwrap().name.as_deref(), Some("planner-v2"));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_remove() {
        let directory = ClientDirectory::new();
        directory.insert("a", 0);
        assert!(directory.remove("a").is_some());
        assert!(directory.is_empty());
        assert!(directory.remove("a").is_none());
    }
}
