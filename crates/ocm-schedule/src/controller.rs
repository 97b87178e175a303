//! Enable or disable the collector's trigger rule.
//!
//! The rule is the single one whose name contains every configured marker.
//! Toggles are idempotent: a rule already in the target state is not touched.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::service::{RuleState, TriggerRule, TriggerService};

#[derive(Debug)]
pub enum ScheduleError {
    /// Zero or several rules carry every marker.
    RuleNotFound { markers: Vec<String>, matched: usize },
    /// The backend returned no rule listing.
    RulesUnavailable,
    Backend(String),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::RuleNotFound { markers, matched } => write!(
                f,
                "expected exactly one trigger rule matching [{}], found {matched}",
                markers.join(", ")
            ),
            ScheduleError::RulesUnavailable => write!(f, "trigger service returned no rule listing"),
            ScheduleError::Backend(msg) => write!(f, "trigger service error: {msg}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Outcome of one toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleToggle {
    pub rule: String,
    pub state: RuleState,
    /// False when the rule was already in `state`.
    pub changed: bool,
}

pub struct ScheduleController {
    service: Arc<dyn TriggerService>,
    markers: Vec<String>,
}

impl ScheduleController {
    pub fn new(service: Arc<dyn TriggerService>, markers: Vec<String>) -> Self {
        Self { service, markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Stop scheduled fetches (ahead of the weekly re-authorization).
    pub fn disable(&self) -> Result<RuleToggle, ScheduleError> {
        self.toggle(RuleState::Disabled)
    }

    /// Resume scheduled fetches after a successful re-authorization.
    pub fn enable_for_refresh(&self) -> Result<RuleToggle, ScheduleError> {
        self.toggle(RuleState::Enabled)
    }

    pub fn find_rule(&self) -> Result<TriggerRule, ScheduleError> {
        let rules = self
            .service
            .list_rules()
            .map_err(|e| ScheduleError::Backend(format!("{e:#}")))?
            .ok_or(ScheduleError::RulesUnavailable)?;

        let mut matches: Vec<TriggerRule> = rules
            .into_iter()
            .filter(|r| self.markers.iter().all(|m| r.name.contains(m.as_str())))
            .collect();

        if matches.len() != 1 {
            return Err(ScheduleError::RuleNotFound {
                markers: self.markers.clone(),
                matched: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }

    fn toggle(&self, target: RuleState) -> Result<RuleToggle, ScheduleError> {
        let rule = self.find_rule()?;

        let changed = rule.state != target;
        if changed {
            warn!(rule = %rule.name, state = target.as_str(), "toggling trigger rule");
            let res = match target {
                RuleState::Enabled => self.service.enable_rule(&rule.name),
                RuleState::Disabled => self.service.disable_rule(&rule.name),
            };
            res.map_err(|e| ScheduleError::Backend(format!("{e:#}")))?;
        }
        info!(rule = %rule.name, state = target.as_str(), changed, "trigger rule in target state");

        Ok(RuleToggle {
            rule: rule.name,
            state: target,
            changed,
        })
    }
}
