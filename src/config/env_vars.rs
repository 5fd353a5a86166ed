use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// Matches `${VAR}` (group 1) or `$VAR` (group 2)
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expand Unix-style environment variables (`$VAR` and `${VAR}`).
///
/// An unset `${VAR}` expands to nothing; an unset `$VAR` is left untouched so
/// literal dollar signs in tokens survive.
pub fn expand_env_vars(value: &str) -> String {
    if !value.contains('$') {
        return value.to_string();
    }

    ENV_VAR_PATTERN
        .replace_all(value, |caps: &Captures| {
            if let Some(name) = caps.get(1) {
                std::env::var(name.as_str()).unwrap_or_default()
            } else {
                let name = &caps[2];
                std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_expand_braced_variable() {
        env::set_var("BF_ENV_BRACED", "value1");
        assert_eq!(expand_env_vars("${BF_ENV_BRACED}/path"), "value1/path");
        env::remove_var("BF_ENV_BRACED");
    }

    #[test]
    fn test_expand_bare_variable() {
        env::set_var("BF_ENV_BARE", "/home/forwarder");
        assert_eq!(expand_env_vars("$BF_ENV_BARE/.aws/credentials"), "/home/forwarder/.aws/credentials");
        env::remove_var("BF_ENV_BARE");
    }

    #[test]
    fn test_missing_variables() {
        env::remove_var("BF_ENV_MISSING");
        assert_eq!(expand_env_vars("a${BF_ENV_MISSING}b"), "ab");
        assert_eq!(expand_env_vars("a$BF_ENV_MISSING"), "a$BF_ENV_MISSING");
    }

    #[test]
    fn test_no_variables() {
        assert_eq!(expand_env_vars("us-east-1:bucket"), "us-east-1:bucket");
        assert_eq!(expand_env_vars("cost: 5$"), "cost: 5$");
    }
}
