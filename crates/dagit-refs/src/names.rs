//! Ref name checks.
//!
//! Git writes `<ref>.lock` next to a ref while updating it, and tools
//! occasionally leave other debris under `refs/heads/`. Only names git
//! itself would accept are reported as branches.

use crate::error::{RefError, Result};

const FORBIDDEN_CHARS: &[char] = &[
    ' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\', '\x7f',
];

/// Check a branch name (relative to `refs/heads/`) against git's ref
/// naming rules.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(RefError::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("empty");
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return reject(&format!("contains {ch:?}"));
    }
    if name.contains("..") || name.contains("@{") || name == "@" {
        return reject("contains a revision expression");
    }
    if name == "HEAD" {
        return reject("is reserved for HEAD");
    }
    if name.ends_with(".lock") {
        return reject("is a lock file");
    }
    for component in name.split('/') {
        if component.is_empty() {
            return reject("has an empty path component");
        }
        if component.starts_with('.') || component.ends_with('.') {
            return reject("has a path component starting or ending with '.'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["main", "develop", "v1.0", "feature/auth", "user/alice/fix-123"] {
            assert!(validate_branch_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_lock_files() {
        assert!(validate_branch_name("main.lock").is_err());
        assert!(validate_branch_name("feature/x.lock").is_err());
    }

    #[test]
    fn rejects_forbidden_characters() {
        for name in ["has space", "a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b"] {
            assert!(validate_branch_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_components() {
        for name in [
            "", "a..b", "ref@{0}", "@", ".hidden", "trailing.", "/lead", "trail/", "a//b", "x/.y",
        ] {
            assert!(validate_branch_name(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn rejects_head() {
        assert!(matches!(
            validate_branch_name("HEAD"),
            Err(RefError::InvalidBranchName { .. })
        ));
        assert!(validate_branch_name("feature/HEAD").is_ok());
    }
}
