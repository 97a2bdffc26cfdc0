//! Registration table for target types, policies and profiles.
//!
//! Built once at process start and passed by reference to the orchestrator.
//! Profiles are checked against the registered policies when they are
//! registered, so every binding in a registered profile resolves.

use crate::policies::{builtin_policies, PolicyDefinition};
use crate::profile::{params, Profile};
use crate::target::{builtin_target_types, TargetType};
use crate::{Result, SiteCheckError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Explicit table of everything a run can refer to by name.
#[derive(Default)]
pub struct Registry {
    target_types: BTreeMap<String, Arc<dyn TargetType>>,
    policies: BTreeMap<String, Arc<PolicyDefinition>>,
    profiles: BTreeMap<String, Profile>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in target types, policies and profiles.
    pub fn builtin() -> Result<Self> {
        let mut registry = Registry::new();
        for kind in builtin_target_types() {
            registry.register_target_type(kind);
        }
        for policy in builtin_policies() {
            registry.register_policy(policy)?;
        }
        for profile in builtin_profiles()? {
            registry.register_profile(profile)?;
        }
        Ok(registry)
    }

    /// Register a target type, replacing any type of the same name.
    pub fn register_target_type(&mut self, kind: Arc<dyn TargetType>) {
        self.target_types.insert(kind.name().to_string(), kind);
    }

    /// Register a policy. Policy names are unique.
    pub fn register_policy(&mut self, policy: PolicyDefinition) -> Result<()> {
        if self.policies.contains_key(&policy.name) {
            return Err(SiteCheckError::Config(format!(
                "policy '{}' is already registered",
                policy.name
            )));
        }
        self.policies.insert(policy.name.clone(), Arc::new(policy));
        Ok(())
    }

    /// Register a profile after checking that each binding names a known
    /// policy. A later profile with the same name replaces the earlier one.
    pub fn register_profile(&mut self, profile: Profile) -> Result<()> {
        if let Some(binding) = profile
            .bindings()
            .iter()
            .find(|b| !self.policies.contains_key(&b.policy))
        {
            return Err(SiteCheckError::ProfileParse {
                context: profile.name.clone(),
                message: format!("unknown policy '{}'", binding.policy),
            });
        }
        if self.profiles.contains_key(&profile.name) {
            debug!(profile = %profile.name, "replacing registered profile");
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Load and register a single profile file.
    pub fn load_profile_file(&mut self, path: &Path) -> Result<()> {
        let profile = Profile::from_file(path)?;
        debug!(profile = %profile.name, path = %path.display(), "loaded profile");
        self.register_profile(profile)
    }

    /// Load every `*.toml` file in `dir`, in file name order. Returns the
    /// number of profiles loaded.
    pub fn load_profile_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| SiteCheckError::Config(format!("profile directory {}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in &paths {
            self.load_profile_file(path)?;
        }
        Ok(paths.len())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn policies(&self) -> impl Iterator<Item = &Arc<PolicyDefinition>> {
        self.policies.values()
    }

    pub fn target_types(&self) -> impl Iterator<Item = &Arc<dyn TargetType>> {
        self.target_types.values()
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn policy(&self, name: &str) -> Option<Arc<PolicyDefinition>> {
        self.policies.get(name).cloned()
    }

    pub fn target_type(&self, name: &str) -> Option<Arc<dyn TargetType>> {
        self.target_types.get(name).cloned()
    }
}

/// Profiles shipped with the binary.
pub fn builtin_profiles() -> Result<Vec<Profile>> {
    let settings = "sites/{uri}/settings.php";
    Ok(vec![
        Profile::new("basic", "Basic site hygiene")
            .with_description("Settings file present and read-only, no CHANGELOG.txt in the docroot")
            .bind("fs.file_exists", params([("path", settings)]))?
            .bind("fs.permissions", params([("path", settings), ("max_mode", "444")]))?
            .bind("fs.file_absent", params([("path", "CHANGELOG.txt")]))?,
        Profile::new("drush-hygiene", "Drupal module hygiene")
            .with_description("Development modules disabled")
            .bind(
                "drush.modules_disabled",
                [("modules".to_string(), serde_json::json!(["devel", "php"]))]
                    .into_iter()
                    .collect(),
            )?,
    ])
}
