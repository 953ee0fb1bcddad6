//! Agent configuration loading (JSON files, discovered or explicit).
//!
//! Each file describes one agent. Files are resolved in a deterministic
//! order and every agent ends up with a unique short name used by the
//! `:<agent_name>` switch command.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ProbeError, Result};

/// Canonical config file name looked up in the working directory.
pub const CANONICAL_CONFIG: &str = "config.json";

/// Names that would collide with built-in `:` commands.
pub const RESERVED_AGENT_NAMES: [&str; 4] = ["paste", "chmod", "end", "cancel"];

/// Why `name` cannot be used as an agent name, if it cannot. `:<name>`
/// must parse back to a switch for every accepted name.
fn name_problem(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        Some("agent name must not be empty".to_string())
    } else if name.contains(char::is_whitespace) {
        Some(format!("agent name `{name}` must not contain whitespace"))
    } else if RESERVED_AGENT_NAMES.contains(&name.to_lowercase().as_str()) {
        Some(format!("agent name `{name}` is reserved for a built-in command"))
    } else {
        None
    }
}

/// One named agent: endpoint, credentials and the free-form context blocks
/// forwarded with every request.
#[derive(Clone, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub timezone: String,
    pub user_id: String,
    pub current_state: Map<String, Value>,
    pub user_memory: Map<String, Value>,
    pub behavioral_patterns: Map<String, Value>,
    pub insight: Map<String, Value>,
    pub candidate_items: Vec<Value>,
    pub context_info: Option<Value>,
    /// Extra entries merged into the request's `inputs` block.
    pub inputs: Map<String, Value>,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timezone", &self.timezone)
            .field("user_id", &self.user_id)
            .field("candidate_items", &self.candidate_items.len())
            .field("context_info", &self.context_info.is_some())
            .finish_non_exhaustive()
    }
}

impl AgentConfig {
    /// Minimal config with every optional block empty.
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timezone: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            timezone: timezone.into(),
            user_id: user_id.into(),
            current_state: Map::new(),
            user_memory: Map::new(),
            behavioral_patterns: Map::new(),
            insight: Map::new(),
            candidate_items: Vec::new(),
            context_info: None,
            inputs: Map::new(),
        }
    }

    /// The api key cut to a short prefix for display.
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

/// Show at most the first 10 characters of a key.
pub fn mask_api_key(key: &str) -> String {
    if key.chars().count() > 10 {
        let prefix: String = key.chars().take(10).collect();
        format!("{prefix}...")
    } else {
        key.to_string()
    }
}

/// On-disk shape. Required fields are optional here so a missing one can be
/// reported by name instead of as a generic serde error.
#[derive(Debug, Default, Deserialize)]
struct RawAgentConfig {
    agent_name: Option<String>,
    api_key: Option<String>,
    #[serde(alias = "dify_base_url")]
    base_url: Option<String>,
    timezone: Option<String>,
    user: Option<String>,
    #[serde(default)]
    current_state: Option<Map<String, Value>>,
    #[serde(default)]
    user_memory: Option<Map<String, Value>>,
    #[serde(default)]
    behavioral_patterns: Option<Map<String, Value>>,
    #[serde(default)]
    insight: Option<Map<String, Value>>,
    #[serde(default)]
    candidate_items: Option<Vec<Value>>,
    #[serde(default)]
    context_info: Option<Value>,
    #[serde(default)]
    inputs: Option<Map<String, Value>>,
}

fn required(value: Option<String>, field: &str, path: &Path) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ProbeError::config_at(
            format!("required field `{field}` is empty"),
            path,
        )),
        None => Err(ProbeError::config_at(
            format!("missing required field `{field}`"),
            path,
        )),
    }
}

/// Parse one config file. `position` is 1-based and only used for the
/// default `agentN` name.
pub fn load_file(path: &Path, position: usize) -> Result<AgentConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProbeError::config_at("config file not found", path)
        } else {
            ProbeError::config_at(format!("failed to read config file: {e}"), path)
        }
    })?;

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| ProbeError::config_at(format!("invalid JSON: {e}"), path))?;
    if !value.is_object() {
        return Err(ProbeError::config_at(
            "config file must contain a JSON object",
            path,
        ));
    }
    let raw: RawAgentConfig = serde_json::from_value(value)
        .map_err(|e| ProbeError::config_at(format!("invalid config: {e}"), path))?;

    let api_key = required(raw.api_key, "api_key", path)?;
    let base_url = required(raw.base_url, "base_url", path)?;
    let timezone = required(raw.timezone, "timezone", path)?;
    let user_id = required(raw.user, "user", path)?;

    if timezone.parse::<Tz>().is_err() {
        return Err(ProbeError::config_at(
            format!("unknown timezone `{timezone}`"),
            path,
        ));
    }

    let name = match raw.agent_name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ProbeError::config_at("`agent_name` is empty", path));
            }
            name
        }
        None => format!("agent{position}"),
    };
    if let Some(problem) = name_problem(&name) {
        return Err(ProbeError::config_at(problem, path));
    }

    Ok(AgentConfig {
        name,
        api_key,
        base_url,
        timezone,
        user_id,
        current_state: raw.current_state.unwrap_or_default(),
        user_memory: raw.user_memory.unwrap_or_default(),
        behavioral_patterns: raw.behavioral_patterns.unwrap_or_default(),
        insight: raw.insight.unwrap_or_default(),
        candidate_items: raw.candidate_items.unwrap_or_default(),
        context_info: raw.context_info.filter(|v| !v.is_null()),
        inputs: raw.inputs.unwrap_or_default(),
    })
}

/// Find config files in `dir`: `config.json` first, then `config_*.json`
/// sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut variants = Vec::new();
    let mut canonical = None;

    let entries = std::fs::read_dir(dir).map_err(|e| {
        ProbeError::config_at(format!("failed to scan directory: {e}"), dir)
    })?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name == CANONICAL_CONFIG {
            canonical = Some(entry.path());
        } else if name.starts_with("config_") && name.ends_with(".json") {
            variants.push(entry.path());
        }
    }

    variants.sort();
    let found: Vec<PathBuf> = canonical.into_iter().chain(variants).collect();
    debug!(dir = %dir.display(), count = found.len(), "discovered config files");
    Ok(found)
}

/// The loaded agents, in load order, with unique names.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    agents: Vec<AgentConfig>,
}

impl ConfigStore {
    /// Load explicit paths, or discover in the working directory when
    /// `paths` is empty.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            let cwd = std::env::current_dir()?;
            Self::load_discovered(&cwd)
        } else {
            Self::load_paths(paths)
        }
    }

    pub fn load_discovered(dir: &Path) -> Result<Self> {
        let paths = discover(dir)?;
        if paths.is_empty() {
            return Err(ProbeError::config_at(
                format!(
                    "no config files found (expected {CANONICAL_CONFIG} or config_*.json); \
                     create one or pass --config <path>"
                ),
                dir,
            ));
        }
        Self::load_paths(&paths)
    }

    pub fn load_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut agents: Vec<AgentConfig> = Vec::with_capacity(paths.len());
        let mut seen = HashSet::new();

        for (idx, path) in paths.iter().enumerate() {
            let config = load_file(path, idx + 1)?;
            if !seen.insert(config.name.clone()) {
                return Err(ProbeError::config_at(
                    format!("duplicate agent name `{}`", config.name),
                    path,
                ));
            }
            info!(agent = %config.name, path = %path.display(), "loaded agent config");
            agents.push(config);
        }

        Self::from_agents(agents)
    }

    /// Build a store from in-memory configs, enforcing the same invariants
    /// as file loading.
    pub fn from_agents(agents: Vec<AgentConfig>) -> Result<Self> {
        if agents.is_empty() {
            return Err(ProbeError::config("no agent configs resolved"));
        }
        let mut seen = HashSet::new();
        for agent in &agents {
            if let Some(problem) = name_problem(&agent.name) {
                return Err(ProbeError::config(problem));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(ProbeError::config(format!(
                    "duplicate agent name `{}`",
                    agent.name
                )));
            }
        }
        Ok(Self { agents })
    }

    pub fn get(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn agents(&self) -> &[AgentConfig] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
