//! `check-env`: validates the environment variables a deployment needs.
//!
//! The report is computed from a lookup function so it can be built from the
//! process environment or from a fixed map in tests.

use crate::cli::output::Output;

/// Variables the server cannot run without, with a short description.
pub const REQUIRED_VARS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "OpenAI API key (sk-...)"),
    ("ADMIN_USER", "Admin username"),
    ("ADMIN_PASSWORD", "Admin password"),
    ("SECRET_KEY", "JWT signing key (at least 32 characters)"),
];

/// Variables with working defaults.
pub const OPTIONAL_VARS: &[(&str, &str)] = &[
    ("QDRANT_URL", "Qdrant Cloud URL (https://...)"),
    ("QDRANT_API_KEY", "Qdrant Cloud API key"),
    ("QDRANT_HOST", "Qdrant host (Docker)"),
    ("QDRANT_PORT", "Qdrant port (Docker)"),
    ("OPENAI_MODEL", "OpenAI chat model"),
    ("COLLECTION_NAME", "Qdrant collection name"),
    ("ACCESS_TOKEN_EXPIRE_MINUTES", "Token lifetime in minutes"),
];

const MIN_SECRET_KEY_LEN: usize = 32;

/// State of a single variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarStatus {
    Set,
    Missing,
    /// Present but malformed, with the reason.
    Invalid(String),
}

/// How the vector store will be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QdrantMode {
    /// `QDRANT_URL` is set.
    Cloud { has_api_key: bool },
    /// `QDRANT_HOST` or `QDRANT_PORT` is set.
    Docker,
    /// Nothing set, the local default endpoint is used.
    Default,
}

#[derive(Debug, Clone)]
pub struct EnvReport {
    pub required: Vec<(&'static str, &'static str, VarStatus)>,
    pub optional: Vec<(&'static str, &'static str, VarStatus)>,
    pub qdrant: QdrantMode,
}

impl EnvReport {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let required = REQUIRED_VARS
            .iter()
            .map(|&(name, description)| {
                let status = match get(name) {
                    None => VarStatus::Missing,
                    Some(value) => validate(name, &value),
                };
                (name, description, status)
            })
            .collect();

        let optional = OPTIONAL_VARS
            .iter()
            .map(|&(name, description)| {
                let status = if get(name).is_some() {
                    VarStatus::Set
                } else {
                    VarStatus::Missing
                };
                (name, description, status)
            })
            .collect();

        let qdrant = if get("QDRANT_URL").is_some() {
            QdrantMode::Cloud {
                has_api_key: get("QDRANT_API_KEY").is_some(),
            }
        } else if get("QDRANT_HOST").is_some() || get("QDRANT_PORT").is_some() {
            QdrantMode::Docker
        } else {
            QdrantMode::Default
        };

        Self {
            required,
            optional,
            qdrant,
        }
    }

    /// Names of required variables that are not set.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required
            .iter()
            .filter(|(_, _, status)| *status == VarStatus::Missing)
            .map(|(name, _, _)| *name)
            .collect()
    }

    /// Problems that do not prevent startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .required
            .iter()
            .filter_map(|(name, _, status)| match status {
                VarStatus::Invalid(reason) => Some(format!("{name} {reason}")),
                _ => None,
            })
            .collect();

        match self.qdrant {
            QdrantMode::Cloud { has_api_key: false } => {
                warnings.push("QDRANT_URL is set but QDRANT_API_KEY is missing".to_string())
            }
            QdrantMode::Default => warnings.push(
                "No Qdrant configuration, the local default endpoint will be used".to_string(),
            ),
            _ => {}
        }

        warnings
    }

    pub fn is_ok(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Prints the report. Returns whether every required variable is set.
    pub fn print(&self, output: &Output) -> bool {
        output.section("Required variables");
        for (name, description, status) in &self.required {
            output.variable(name, description, status, true);
        }

        output.section("Optional variables");
        for (name, description, status) in &self.optional {
            output.variable(name, description, status, false);
        }

        output.section("Qdrant");
        match self.qdrant {
            QdrantMode::Cloud { has_api_key: true } => {
                output.ok("Qdrant Cloud configuration complete")
            }
            QdrantMode::Cloud { has_api_key: false } => {
                output.warn("QDRANT_URL is set but QDRANT_API_KEY is missing")
            }
            QdrantMode::Docker => output.ok("Local Docker Qdrant configuration"),
            QdrantMode::Default => {
                output.warn("No Qdrant configuration, using the local default endpoint")
            }
        }

        let missing = self.missing_required();
        if !missing.is_empty() {
            output.blank();
            output.fail("Configuration incomplete. Missing required variables:");
            for name in missing {
                output.fail(&format!("  {name}"));
            }
            return false;
        }

        let warnings = self.warnings();
        if warnings.is_empty() {
            output.finished("Configuration complete");
        } else {
            output.section("Configuration has warnings");
            for warning in &warnings {
                output.warn(warning);
            }
            output.hint("The server can start; fix these in .env and run check-env again.");
        }
        true
    }
}

fn validate(name: &str, value: &str) -> VarStatus {
    match name {
        "SECRET_KEY" if value.chars().count() < MIN_SECRET_KEY_LEN => VarStatus::Invalid(format!(
            "is too short (at least {MIN_SECRET_KEY_LEN} characters)"
        )),
        "OPENAI_API_KEY" if !value.starts_with("sk-") => {
            VarStatus::Invalid("does not look valid (should start with 'sk-')".to_string())
        }
        _ => VarStatus::Set,
    }
}

/// Checks the process environment and prints the report.
///
/// Returns the process exit code.
pub fn run(output: &Output) -> i32 {
    output.info("Checking environment configuration...");
    let report = EnvReport::from_lookup(|name| std::env::var(name).ok());
    if report.print(output) { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn report(vars: &[(&str, &str)]) -> EnvReport {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvReport::from_lookup(|name| map.get(name).cloned())
    }

    fn complete_required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OPENAI_API_KEY", "sk-test"),
            ("ADMIN_USER", "admin"),
            ("ADMIN_PASSWORD", "pw"),
            ("SECRET_KEY", "0123456789abcdef0123456789abcdef"),
        ]
    }

    #[test]
    fn test_missing_required_fails() {
        let report = report(&[("ADMIN_USER", "admin")]);
        assert!(!report.is_ok());
        assert_eq!(
            report.missing_required(),
            vec!["OPENAI_API_KEY", "ADMIN_PASSWORD", "SECRET_KEY"]
        );
        assert!(!report.print(&Output::no_color()));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut vars = complete_required();
        vars[1] = ("ADMIN_USER", "");
        assert_eq!(report(&vars).missing_required(), vec!["ADMIN_USER"]);
    }

    #[test]
    fn test_short_secret_and_bad_key_are_warnings() {
        let report = report(&[
            ("OPENAI_API_KEY", "pk-123"),
            ("ADMIN_USER", "admin"),
            ("ADMIN_PASSWORD", "pw"),
            ("SECRET_KEY", "short"),
            ("QDRANT_HOST", "qdrant"),
        ]);

        assert!(report.is_ok());
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("OPENAI_API_KEY"));
        assert!(warnings[1].starts_with("SECRET_KEY"));
        assert!(report.print(&Output::no_color()));
    }

    #[test]
    fn test_qdrant_modes() {
        let mut vars = complete_required();
        assert_eq!(report(&vars).qdrant, QdrantMode::Default);
        assert_eq!(report(&vars).warnings().len(), 1);

        vars.push(("QDRANT_PORT", "6334"));
        assert_eq!(report(&vars).qdrant, QdrantMode::Docker);
        assert!(report(&vars).warnings().is_empty());

        vars.push(("QDRANT_URL", "https://cluster.cloud.qdrant.io"));
        assert_eq!(
            report(&vars).qdrant,
            QdrantMode::Cloud { has_api_key: false }
        );

        vars.push(("QDRANT_API_KEY", "key"));
        assert_eq!(report(&vars).qdrant, QdrantMode::Cloud { has_api_key: true });
        assert!(report(&vars).warnings().is_empty());
    }

    #[test]
    fn test_optional_vars_reported() {
        let mut vars = complete_required();
        vars.push(("OPENAI_MODEL", "gpt-4o"));
        let report = report(&vars);

        let model = report
            .optional
            .iter()
            .find(|(name, _, _)| *name == "OPENAI_MODEL")
            .unwrap();
        assert_eq!(model.2, VarStatus::Set);
        assert_eq!(report.optional.len(), OPTIONAL_VARS.len());
    }
}
