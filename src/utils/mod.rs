//! Utility functions and helpers.

pub mod date;
pub mod http;
pub mod log;
pub mod url;

pub use self::url::{Canonicalizer, get_domain, resolve};

/// File-system safe form of a category name.
///
/// Every run of characters outside `[A-Za-z0-9]` collapses to one `_`.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "uncategorized".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("SSH & Credential Abuse"), "SSH_Credential_Abuse");
        assert_eq!(safe_name("NFS / File-Share Exposure"), "NFS_File_Share_Exposure");
        assert_eq!(safe_name("  "), "uncategorized");
    }
}
