//! Integration tests for sitecheck.
//!
//! Profiles run against temporary local docroots with the policies from
//! [`crate::mocks`], so no Drupal site or drush binary is needed.

pub mod orchestrator_tests;
pub mod report_tests;
