//! Engine configuration

/// What to do when a target names a section that was never created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSectionPolicy {
    /// Log a warning and treat the section as empty.
    #[default]
    Warn,
    /// Fail with [`ValidationError::UnknownSection`](crate::ValidationError::UnknownSection).
    Fail,
}

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Example
///
/// ```
/// use formguard::{EngineConfig, UnknownSectionPolicy};
///
/// let config = EngineConfig::default()
///     .with_unknown_sections(UnknownSectionPolicy::Fail)
///     .with_deprecation_warnings(false);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Handling of section names that do not exist.
    ///
    /// Default: [`UnknownSectionPolicy::Warn`]
    pub unknown_sections: UnknownSectionPolicy,

    /// Log a warning when a deprecated entry point is used.
    ///
    /// Default: `true`
    pub deprecation_warnings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_sections: UnknownSectionPolicy::Warn,
            deprecation_warnings: true,
        }
    }
}

impl EngineConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unknown section policy.
    pub fn with_unknown_sections(mut self, policy: UnknownSectionPolicy) -> Self {
        self.unknown_sections = policy;
        self
    }

    /// Enables or disables deprecation warnings.
    pub fn with_deprecation_warnings(mut self, enabled: bool) -> Self {
        self.deprecation_warnings = enabled;
        self
    }

    /// Creates a config that rejects unknown sections and stays quiet about
    /// deprecated calls.
    pub fn strict() -> Self {
        Self {
            unknown_sections: UnknownSectionPolicy::Fail,
            deprecation_warnings: false,
        }
    }
}
