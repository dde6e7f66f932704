use serde::{Deserialize, Serialize};

/// A value in the legacy build system's definition vocabulary.
///
/// Switches render as `ON`/`OFF`; everything else (paths, path lists, numeric
/// strings) is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Switch(bool),
    Text(String),
}

impl ConfigValue {
    pub fn on() -> Self {
        ConfigValue::Switch(true)
    }

    pub fn off() -> Self {
        ConfigValue::Switch(false)
    }

    pub fn text(s: impl Into<String>) -> Self {
        ConfigValue::Text(s.into())
    }

    /// The exact string handed to the legacy build system.
    pub fn render(&self) -> String {
        match self {
            ConfigValue::Switch(true) => "ON".to_string(),
            ConfigValue::Switch(false) => "OFF".to_string(),
            ConfigValue::Text(s) => s.clone(),
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, ConfigValue::Switch(true))
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: ConfigValue,
}

/// Ordered key/value definitions for the legacy build system's configure step.
///
/// Keys are case-sensitive. Writing an existing key replaces its value in
/// place (last write wins) and keeps the key's original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ConfigEntry>", into = "Vec<ConfigEntry>")]
pub struct ConfigSet {
    entries: Vec<ConfigEntry>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the value it replaced, if any.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) -> Option<ConfigValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.value, value)),
            None => {
                self.entries.push(ConfigEntry { key, value });
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ConfigEntry>> for ConfigSet {
    fn from(entries: Vec<ConfigEntry>) -> Self {
        let mut set = ConfigSet::new();
        for e in entries {
            set.set(e.key, e.value);
        }
        set
    }
}

impl From<ConfigSet> for Vec<ConfigEntry> {
    fn from(set: ConfigSet) -> Self {
        set.entries
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ConfigSet {
    fn from_iter<I: IntoIterator<Item = (K, ConfigValue)>>(iter: I) -> Self {
        let mut set = ConfigSet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}
