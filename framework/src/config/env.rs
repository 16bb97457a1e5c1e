use std::path::Path;

/// Environment type enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        Self::from_name(std::env::var("APP_ENV").ok().as_deref())
    }

    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Testing => "testing",
            Self::Custom(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

/// Load environment variables from .env files with proper precedence
///
/// Precedence (later entries override earlier):
/// 1. .env
/// 2. .env.local
/// 3. .env.{environment}
/// 4. .env.{environment}.local
/// 5. Actual system environment variables
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = Environment::detect();

    // dotenvy never overwrites a variable that is already set, so load the
    // most specific file first
    let files = [
        format!(".env.{}.local", env),
        format!(".env.{}", env),
        ".env.local".to_string(),
        ".env".to_string(),
    ];
    for file in files {
        let _ = dotenvy::from_path(project_root.join(file));
    }

    env
}

/// Get an environment variable with a default value
///
/// # Example
/// ```
/// use kit_negotiation::config::env;
///
/// let port: u16 = env("SERVER_PORT", 8080);
/// ```
pub fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_optional(key).unwrap_or(default)
}

/// Get an optional environment variable
///
/// Unset or unparsable values yield `None`.
pub fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
