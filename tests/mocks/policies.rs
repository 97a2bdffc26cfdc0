//! Policies with scripted behaviour.
//!
//! - `mock.pass`: always passes
//! - `mock.fail`: always fails, no remediation
//! - `mock.fixable`: fails until `fixed.txt` exists in the docroot; remediation creates it
//! - `mock.broken_fix`: fails, and its remediation returns an error
//! - `mock.panics`: panics inside the check
//! - `mock.uri`: passes with the scoped uri as its message
//! - `mock.counter`: passes and counts invocations

use sitecheck::policies::PolicyDefinition;
use sitecheck::profile::{Parameters, Profile};
use sitecheck::registry::Registry;
use sitecheck::target::local::LocalTarget;
use sitecheck::{Outcome, SiteCheckError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const FIXED_MARKER: &str = "fixed.txt";

/// Registry with the local target type and every mock policy. The returned
/// counter tracks `mock.counter` invocations.
pub fn mock_registry() -> (Registry, Arc<AtomicUsize>) {
    let mut registry = Registry::new();
    registry.register_target_type(Arc::new(LocalTarget));

    let calls = Arc::new(AtomicUsize::new(0));
    for policy in mock_policies(calls.clone()) {
        registry.register_policy(policy).unwrap();
    }
    (registry, calls)
}

/// Register a profile binding `policies` in order, without parameters.
pub fn add_profile(registry: &mut Registry, name: &str, policies: &[&str]) {
    let mut profile = Profile::new(name, format!("Mock profile {}", name));
    for policy in policies {
        profile = profile.bind(*policy, Parameters::new()).unwrap();
    }
    registry.register_profile(profile).unwrap();
}

fn mock_policies(calls: Arc<AtomicUsize>) -> Vec<PolicyDefinition> {
    vec![
        PolicyDefinition::new("mock.pass", "Always passes", |_| Ok(Outcome::pass("fine"))),
        PolicyDefinition::new("mock.fail", "Always fails", |_| {
            Ok(Outcome::fail("broken", "nothing can be done"))
        }),
        PolicyDefinition::new("mock.fixable", "Fixable", |ctx| {
            let root = ctx.target.root().unwrap();
            if root.join(FIXED_MARKER).exists() {
                Ok(Outcome::pass("marker present"))
            } else {
                Ok(Outcome::fail("marker missing", FIXED_MARKER))
            }
        })
        .with_remediation(|ctx| {
            let root = ctx.target.root().unwrap();
            std::fs::write(root.join(FIXED_MARKER), "ok")?;
            ctx.info("wrote marker");
            Ok(format!("Created {}", FIXED_MARKER))
        }),
        PolicyDefinition::new("mock.broken_fix", "Broken fix", |_| {
            Ok(Outcome::fail("broken", "remediation will not help"))
        })
        .with_remediation(|ctx| {
            Err(SiteCheckError::Policy {
                policy: ctx.policy.to_string(),
                message: "permission denied".to_string(),
            })
        }),
        PolicyDefinition::new("mock.panics", "Panics", |_| -> sitecheck::Result<Outcome> {
            panic!("check exploded")
        }),
        PolicyDefinition::new("mock.uri", "Echo uri", |ctx| {
            ctx.debug("echoing uri");
            Ok(Outcome::pass(ctx.target.uri_or_default()))
        }),
        PolicyDefinition::new("mock.counter", "Counter", move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Outcome::pass(format!("call {}", n)))
        }),
    ]
}
