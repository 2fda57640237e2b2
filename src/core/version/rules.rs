// ─── Rule Ladder ───
// Conditional allow/disallow rules attached to libraries and launch arguments.
// Evaluation is last-match-wins: every matching rule overwrites the decision.

use std::collections::HashMap;

use serde::Deserialize;

use crate::core::platform::Platform;

/// Named boolean toggles supplied by the caller for one run.
pub type FeatureSet = HashMap<String, bool>;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    /// Version regex carried by some manifests; not evaluated.
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub features: HashMap<String, bool>,
    #[serde(default)]
    pub os: Option<OsRule>,
}

impl Rule {
    pub fn new(action: RuleAction) -> Self {
        Self {
            action,
            features: HashMap::new(),
            os: None,
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: bool) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn with_os_name(mut self, name: impl Into<String>) -> Self {
        self.os.get_or_insert_with(OsRule::default).name = Some(name.into());
        self
    }

    pub fn with_os_arch(mut self, arch: impl Into<String>) -> Self {
        self.os.get_or_insert_with(OsRule::default).arch = Some(arch.into());
        self
    }

    /// A rule matches when every feature it names is present with the same
    /// value, and its OS name/arch (when set) equal the platform's.
    pub fn matches(&self, features: &FeatureSet, platform: &Platform) -> bool {
        let features_match = self
            .features
            .iter()
            .all(|(name, wanted)| features.get(name) == Some(wanted));
        if !features_match {
            return false;
        }

        let Some(os) = &self.os else {
            return true;
        };
        let arch_matches = os.arch.as_ref().is_none_or(|arch| *arch == platform.arch);
        let name_matches = os
            .name
            .as_ref()
            .is_none_or(|name| *name == platform.os_name);
        arch_matches && name_matches
    }
}

/// Evaluate a rule ladder.
///
/// - No rules → `Allow`.
/// - Otherwise start at `Disallow` and let each matching rule overwrite the
///   decision, in order.
pub fn evaluate(rules: &[Rule], features: &FeatureSet, platform: &Platform) -> RuleAction {
    if rules.is_empty() {
        return RuleAction::Allow;
    }

    rules
        .iter()
        .filter(|rule| rule.matches(features, platform))
        .fold(RuleAction::Disallow, |_, rule| rule.action)
}

/// `true` when [`evaluate`] yields `Allow`.
pub fn is_allowed(rules: &[Rule], features: &FeatureSet, platform: &Platform) -> bool {
    evaluate(rules, features, platform) == RuleAction::Allow
}
