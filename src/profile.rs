//! Profiles: named, ordered lists of policy bindings.
//!
//! Profiles are written as TOML files:
//!
//! ```toml
//! title = "Basic hygiene"
//! description = "Settings file present and locked down"
//!
//! [[policy]]
//! name = "fs.file_exists"
//! parameters = { path = "sites/{uri}/settings.php" }
//!
//! [[policy]]
//! name = "fs.permissions"
//! parameters = { path = "sites/{uri}/settings.php", max_mode = "444" }
//! ```
//!
//! The profile name is the file stem. Binding order is execution order.

use crate::{Result, SiteCheckError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-binding policy parameters. Keys are unique by construction.
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// A policy identifier with the parameters to run it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyBinding {
    #[serde(rename = "name")]
    pub policy: String,
    #[serde(default)]
    pub parameters: Parameters,
}

/// An immutable, ordered set of policy bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub description: String,
    bindings: Vec<PolicyBinding>,
}

/// On-disk shape of a profile file.
#[derive(Debug, Deserialize)]
struct ProfileFile {
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    policy: Vec<PolicyBinding>,
}

impl Profile {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Profile {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            bindings: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a binding. A profile may bind each policy only once.
    pub fn bind(mut self, policy: impl Into<String>, parameters: Parameters) -> Result<Self> {
        self.push_binding(PolicyBinding {
            policy: policy.into(),
            parameters,
        })?;
        Ok(self)
    }

    fn push_binding(&mut self, binding: PolicyBinding) -> Result<()> {
        if self.bindings.iter().any(|b| b.policy == binding.policy) {
            return Err(SiteCheckError::ProfileParse {
                context: self.name.clone(),
                message: format!("policy '{}' is bound more than once", binding.policy),
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Bindings in execution order.
    pub fn bindings(&self) -> &[PolicyBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Parse a profile from TOML text.
    pub fn from_toml(name: &str, content: &str) -> Result<Self> {
        let file: ProfileFile = toml::from_str(content).map_err(|e| SiteCheckError::ProfileParse {
            context: name.to_string(),
            message: e.to_string(),
        })?;

        let mut profile = Profile::new(name, file.title.unwrap_or_else(|| name.to_string()))
            .with_description(file.description);
        for binding in file.policy {
            profile.push_binding(binding)?;
        }
        Ok(profile)
    }

    /// Load a profile file; the profile is named after the file stem.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SiteCheckError::ProfileParse {
                context: path.display().to_string(),
                message: "file name is not valid UTF-8".to_string(),
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(name, &content)
    }
}

/// Build a parameter map from string pairs.
pub fn params<I, K, V>(pairs: I) -> Parameters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
