//! Endpoint permission policies.
//!
//! Every endpoint either declares [`PermissionPolicy::AllowAny`] explicitly or
//! falls back to the configured default policy
//! (`BAZAAR_DEFAULT_PERMISSION`). The extractors in
//! [`crate::middleware::auth`] apply the decision.

use std::fmt;
use std::str::FromStr;

/// Who may call an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionPolicy {
    /// Anonymous callers are accepted.
    AllowAny,
    /// The caller must be authenticated.
    #[default]
    IsAuthenticated,
}

impl PermissionPolicy {
    /// Whether a caller is admitted, given whether they authenticated.
    #[must_use]
    pub const fn admits(self, authenticated: bool) -> bool {
        match self {
            Self::AllowAny => true,
            Self::IsAuthenticated => authenticated,
        }
    }
}

impl FromStr for PermissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow_any" | "allowany" => Ok(Self::AllowAny),
            "is_authenticated" | "isauthenticated" => Ok(Self::IsAuthenticated),
            other => Err(format!("unknown permission policy '{other}'")),
        }
    }
}

impl fmt::Display for PermissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowAny => write!(f, "allow_any"),
            Self::IsAuthenticated => write!(f, "is_authenticated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        assert!(PermissionPolicy::AllowAny.admits(false));
        assert!(PermissionPolicy::AllowAny.admits(true));
        assert!(!PermissionPolicy::IsAuthenticated.admits(false));
        assert!(PermissionPolicy::IsAuthenticated.admits(true));
    }

    #[test]
    fn test_parse_and_display() {
        for policy in [PermissionPolicy::AllowAny, PermissionPolicy::IsAuthenticated] {
            assert_eq!(policy.to_string().parse::<PermissionPolicy>(), Ok(policy));
        }
        assert_eq!(
            "IsAuthenticated".parse::<PermissionPolicy>(),
            Ok(PermissionPolicy::IsAuthenticated)
        );
    }
}
