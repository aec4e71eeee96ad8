//! Permission list helpers
//!
//! Policy evaluation happens downstream; this only summarises what a token
//! carries.
//!
//! Wildcard forms:
//! - `"*"` and `"all"` grant everything
//! - `"orders:*"` grants every action under `orders`

use shared::client::PermissionSummary;

/// Whether a single permission entry is a wildcard grant
pub fn is_wildcard(permission: &str) -> bool {
    permission == "*" || permission == "all" || permission.ends_with(":*")
}

pub fn summarize(permissions: &[String], roles: &[String]) -> PermissionSummary {
    PermissionSummary {
        count: permissions.len(),
        role_count: roles.len(),
        has_wildcard: permissions.iter().any(|p| is_wildcard(p)),
    }
}

/// First `limit` permissions, for responses that only show a preview
pub fn preview(permissions: &[String], limit: usize) -> Vec<String> {
    permissions.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcards() {
        assert!(is_wildcard("*"));
        assert!(is_wildcard("all"));
        assert!(is_wildcard("orders:*"));
        assert!(!is_wildcard("orders:read"));
        assert!(!is_wildcard("allow"));
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&strings(&["a:read", "b:*"]), &strings(&["staff"]));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.role_count, 1);
        assert!(summary.has_wildcard);

        assert!(!summarize(&strings(&["a:read"]), &[]).has_wildcard);
    }

    #[test]
    fn test_preview_truncates() {
        let perms: Vec<String> = (0..30).map(|i| format!("p:{i}")).collect();
        assert_eq!(preview(&perms, 20).len(), 20);
        assert_eq!(preview(&perms, 20)[0], "p:0");
        assert_eq!(preview(&perms[..5], 20).len(), 5);
    }
}
