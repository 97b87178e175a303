//! Trigger-service boundary.
//!
//! Contract: `list_rules()` returns every rule the backend knows, or `None`
//! when the backend returned no listing at all. `enable_rule`/`disable_rule`
//! set the named rule's state; unknown names are an error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleState {
    Enabled,
    Disabled,
}

impl RuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleState::Enabled => "ENABLED",
            RuleState::Disabled => "DISABLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub name: String,
    pub state: RuleState,
}

impl TriggerRule {
    pub fn new(name: impl Into<String>, state: RuleState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

pub trait TriggerService: Send + Sync {
    fn list_rules(&self) -> Result<Option<Vec<TriggerRule>>>;

    fn enable_rule(&self, name: &str) -> Result<()>;

    fn disable_rule(&self, name: &str) -> Result<()>;
}

fn set_state(rules: &mut [TriggerRule], name: &str, state: RuleState) -> Result<()> {
    let rule = rules
        .iter_mut()
        .find(|r| r.name == name)
        .ok_or_else(|| anyhow!("trigger rule not found: {name}"))?;
    rule.state = state;
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed service
// ---------------------------------------------------------------------------

/// Rule table kept as a JSON array on disk. A missing file is "no listing".
#[derive(Debug, Clone)]
pub struct FileTriggerService {
    path: PathBuf,
}

impl FileTriggerService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<root>/trigger_rules.json`
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join("trigger_rules.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Vec<TriggerRule>>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .with_context(|| format!("rule table is not a JSON rule array: {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read rule table failed: {}", self.path.display())),
        }
    }

    fn write(&self, rules: &[TriggerRule]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("create rule table dir failed: {}", dir.display()))?;

        let json = serde_json::to_string_pretty(rules).context("serialize rule table failed")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file failed in: {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("write rule table temp file failed")?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("replace rule table failed: {}: {}", self.path.display(), e.error))?;
        Ok(())
    }

    fn update(&self, name: &str, state: RuleState) -> Result<()> {
        let Some(mut rules) = self.read()? else {
            bail!("rule table missing: {}", self.path.display());
        };
        set_state(&mut rules, name, state)?;
        self.write(&rules)
    }

    /// Replace the whole rule table.
    pub fn seed(&self, rules: &[TriggerRule]) -> Result<()> {
        self.write(rules)
    }
}

impl TriggerService for FileTriggerService {
    fn list_rules(&self) -> Result<Option<Vec<TriggerRule>>> {
        self.read()
    }

    fn enable_rule(&self, name: &str) -> Result<()> {
        self.update(name, RuleState::Enabled)
    }

    fn disable_rule(&self, name: &str) -> Result<()> {
        self.update(name, RuleState::Disabled)
    }
}

// ---------------------------------------------------------------------------
// In-memory service
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    rules: Option<Vec<TriggerRule>>,
    toggles: usize,
}

/// Process-local trigger service for tests. Counts state-changing calls.
#[derive(Debug, Default)]
pub struct MemoryTriggerService {
    state: Mutex<MemoryState>,
}

impl MemoryTriggerService {
    /// A backend that returns no listing.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<TriggerRule>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rules: Some(rules),
                toggles: 0,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory trigger service poisoned"))
    }

    pub fn state_of(&self, name: &str) -> Option<RuleState> {
        self.lock()
            .ok()?
            .rules
            .as_ref()?
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.state)
    }

    pub fn toggle_count(&self) -> usize {
        self.lock().map(|s| s.toggles).unwrap_or(0)
    }

    fn update(&self, name: &str, state: RuleState) -> Result<()> {
        let mut st = self.lock()?;
        let rules = st
            .rules
            .as_mut()
            .ok_or_else(|| anyhow!("no rules registered"))?;
        set_state(rules, name, state)?;
        st.toggles += 1;
        Ok(())
    }
}

impl TriggerService for MemoryTriggerService {
    fn list_rules(&self) -> Result<Option<Vec<TriggerRule>>> {
        Ok(self.lock()?.rules.clone())
    }

    fn enable_rule(&self, name: &str) -> Result<()> {
        self.update(name, RuleState::Enabled)
    }

    fn disable_rule(&self, name: &str) -> Result<()> {
        self.update(name, RuleState::Disabled)
    }
}
