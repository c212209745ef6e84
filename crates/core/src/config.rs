//! Runtime configuration of the marker API.

/// Environment variable naming the backend to use (e.g. `mock`, `webcore`).
pub const BACKEND_ENV: &str = "AXMARKER_BACKEND";

/// Environment variable that must be truthy before the private WebCore
/// primitives are called.
pub const ALLOW_PRIVATE_API_ENV: &str = "AXMARKER_ALLOW_PRIVATE_API";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerConfig {
    /// Explicit backend id. `None` selects by priority.
    pub backend: Option<String>,
    /// Opt-in for backends that call private, crash-prone symbols.
    pub allow_private_api: bool,
}

impl MarkerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = lookup(BACKEND_ENV)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let allow_private_api = lookup(ALLOW_PRIVATE_API_ENV).is_some_and(|value| is_truthy(&value));
        Self { backend, allow_private_api }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
