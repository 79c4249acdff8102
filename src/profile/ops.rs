//! Profile and store mutators.
//!
//! # Responsibilities
//! - Header upsert with case-insensitive name dedup
//! - Target/exclude list edits with entry validation
//! - Method toggling
//! - Profile lifecycle (create, delete, switch) with invariant guards
//!
//! # Design Decisions
//! - Mutators operate on in-memory values and return `Result`; persisting
//!   the change and triggering recompilation are the caller's job
//! - Duplicate detection in domain lists compares literal strings, not
//!   pattern equivalence
//! - Empty domain strings are rejected here so they never reach the
//!   pattern compiler

use thiserror::Error;

use crate::pattern::PatternError;
use crate::profile::schema::{HeaderOverride, HttpMethod, Profile, ProfileStore};

/// Errors from profile and store mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// A profile with this name already exists.
    #[error("profile '{0}' already exists")]
    DuplicateProfile(String),

    /// The named profile does not exist.
    #[error("no profile named '{0}'")]
    UnknownProfile(String),

    /// The store must always hold at least one profile.
    #[error("cannot delete the last remaining profile")]
    LastProfile,

    /// Index out of bounds for a list edit.
    #[error("no entry at index {0}")]
    BadIndex(usize),

    /// This exact domain string is already in the list.
    #[error("domain '{0}' is already in the list")]
    DuplicateDomain(String),

    /// Invalid domain string.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl Profile {
    /// Add a header override, or update the existing one whose name is
    /// equal under case-insensitive comparison. Upserts re-enable the
    /// entry and keep its position in the list.
    pub fn upsert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
        {
            existing.name = name;
            existing.value = value;
            existing.enabled = true;
        } else {
            self.headers.push(HeaderOverride {
                name,
                value,
                enabled: true,
            });
        }
    }

    /// Enable or disable the header at `index`.
    pub fn toggle_header(&mut self, index: usize, enabled: bool) -> Result<(), ProfileError> {
        let header = self
            .headers
            .get_mut(index)
            .ok_or(ProfileError::BadIndex(index))?;
        header.enabled = enabled;
        Ok(())
    }

    /// Remove the header at `index`.
    pub fn remove_header(&mut self, index: usize) -> Result<(), ProfileError> {
        if index >= self.headers.len() {
            return Err(ProfileError::BadIndex(index));
        }
        self.headers.remove(index);
        Ok(())
    }

    /// Add a domain to the target list.
    pub fn add_target(&mut self, domain: impl Into<String>) -> Result<(), ProfileError> {
        Self::add_domain(&mut self.targets, domain.into())
    }

    /// Add a domain to the exclude list.
    pub fn add_exclude(&mut self, domain: impl Into<String>) -> Result<(), ProfileError> {
        Self::add_domain(&mut self.excludes, domain.into())
    }

    fn add_domain(list: &mut Vec<String>, domain: String) -> Result<(), ProfileError> {
        let domain = domain.trim().to_string();
        if domain.is_empty() {
            return Err(PatternError::Empty.into());
        }
        if list.iter().any(|d| d == &domain) {
            return Err(ProfileError::DuplicateDomain(domain));
        }
        list.push(domain);
        Ok(())
    }

    /// Remove the target at `index`.
    pub fn remove_target(&mut self, index: usize) -> Result<(), ProfileError> {
        if index >= self.targets.len() {
            return Err(ProfileError::BadIndex(index));
        }
        self.targets.remove(index);
        Ok(())
    }

    /// Remove the exclude at `index`.
    pub fn remove_exclude(&mut self, index: usize) -> Result<(), ProfileError> {
        if index >= self.excludes.len() {
            return Err(ProfileError::BadIndex(index));
        }
        self.excludes.remove(index);
        Ok(())
    }

    /// Add the method to the filter if absent, remove it if present.
    pub fn toggle_method(&mut self, method: HttpMethod) {
        if let Some(pos) = self.methods.iter().position(|m| *m == method) {
            self.methods.remove(pos);
        } else {
            self.methods.push(method);
        }
    }
}

impl ProfileStore {
    /// Create a new empty profile and make it active.
    pub fn create_profile(&mut self, name: impl Into<String>) -> Result<(), ProfileError> {
        let name = name.into();
        if self.profiles.contains_key(&name) {
            return Err(ProfileError::DuplicateProfile(name));
        }
        self.profiles.insert(name.clone(), Profile::default());
        self.active_profile = name;
        Ok(())
    }

    /// Delete a profile. Deleting the last remaining profile is refused.
    /// If the deleted profile was active, the first remaining profile
    /// becomes active.
    pub fn delete_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(name) {
            return Err(ProfileError::UnknownProfile(name.to_string()));
        }
        if self.profiles.len() <= 1 {
            return Err(ProfileError::LastProfile);
        }
        self.profiles.remove(name);
        if self.active_profile == name {
            // BTreeMap keys are ordered, so this pick is deterministic.
            if let Some(first) = self.profiles.keys().next() {
                self.active_profile = first.clone();
            }
        }
        Ok(())
    }

    /// Switch the active profile.
    pub fn set_active(&mut self, name: &str) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(name) {
            return Err(ProfileError::UnknownProfile(name.to_string()));
        }
        self.active_profile = name.to_string();
        Ok(())
    }

    /// Mutable access to the active profile.
    pub fn active_mut(&mut self) -> &mut Profile {
        let name = self.active_profile.clone();
        self.profiles.entry(name).or_default()
    }
}
