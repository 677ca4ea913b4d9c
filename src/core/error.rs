//! Error types for pexforge with contextual messages and exit codes
//!
//! Errors are grouped by the collaborator that raised them so the orchestrator
//! can tell a fatal configuration problem (abort before any side effect) from a
//! per-version failure (log, skip the version, keep going).

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for pexforge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (registry, release store, build tool, I/O)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for pexforge
#[derive(Debug)]
pub enum ForgeError {
  /// Configuration errors (fatal, raised before any side effect)
  Config(ConfigError),

  /// Upstream registry errors
  Registry(RegistryError),

  /// Remote release store errors
  ReleaseStore(ReleaseStoreError),

  /// Build tool errors
  Build(BuildError),

  /// I/O errors
  Io(io::Error),

  /// One or more versions failed during a batch run
  Incomplete { package: String, failed: Vec<String> },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ForgeError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ForgeError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ForgeError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ForgeError::Message { message, context, help } => ForgeError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ForgeError::Io(e) => ForgeError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", e)),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ForgeError::Config(_) => ExitCode::User,
      ForgeError::Registry(_) => ExitCode::System,
      ForgeError::ReleaseStore(_) => ExitCode::System,
      ForgeError::Build(_) => ExitCode::System,
      ForgeError::Io(_) => ExitCode::System,
      ForgeError::Incomplete { .. } => ExitCode::System,
      ForgeError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ForgeError::Config(e) => e.help_message(),
      ForgeError::Registry(e) => e.help_message(),
      ForgeError::ReleaseStore(e) => e.help_message(),
      ForgeError::Build(e) => e.help_message(),
      ForgeError::Incomplete { .. } => {
        Some("Failed versions were skipped; fix the cause and re-run, completed work is kept.".to_string())
      }
      ForgeError::Message { help, .. } => help.clone(),
      ForgeError::Io(_) => None,
    }
  }

  /// True for errors the orchestration layer may recover from by re-running later
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      ForgeError::Registry(RegistryError::Unavailable { .. })
        | ForgeError::ReleaseStore(ReleaseStoreError::Unavailable { .. })
    )
  }
}

impl fmt::Display for ForgeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ForgeError::Config(e) => write!(f, "{}", e),
      ForgeError::Registry(e) => write!(f, "{}", e),
      ForgeError::ReleaseStore(e) => write!(f, "{}", e),
      ForgeError::Build(e) => write!(f, "{}", e),
      ForgeError::Io(e) => write!(f, "I/O error: {}", e),
      ForgeError::Incomplete { package, failed } => {
        write!(f, "{} version(s) of {} failed: {}", failed.len(), package, failed.join(", "))
      }
      ForgeError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ForgeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ForgeError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ForgeError {
  fn from(err: io::Error) -> Self {
    ForgeError::Io(err)
  }
}

impl From<String> for ForgeError {
  fn from(msg: String) -> Self {
    ForgeError::message(msg)
  }
}

impl From<&str> for ForgeError {
  fn from(msg: &str) -> Self {
    ForgeError::message(msg)
  }
}

impl From<ConfigError> for ForgeError {
  fn from(err: ConfigError) -> Self {
    ForgeError::Config(err)
  }
}

impl From<RegistryError> for ForgeError {
  fn from(err: RegistryError) -> Self {
    ForgeError::Registry(err)
  }
}

impl From<ReleaseStoreError> for ForgeError {
  fn from(err: ReleaseStoreError) -> Self {
    ForgeError::ReleaseStore(err)
  }
}

impl From<BuildError> for ForgeError {
  fn from(err: BuildError) -> Self {
    ForgeError::Build(err)
  }
}

impl From<toml_edit::de::Error> for ForgeError {
  fn from(err: toml_edit::de::Error) -> Self {
    ForgeError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ForgeError {
  fn from(err: serde_json::Error) -> Self {
    ForgeError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for ForgeError {
  fn from(err: semver::Error) -> Self {
    ForgeError::message(format!("Version parse error: {}", err))
  }
}

impl From<tempfile::PersistError> for ForgeError {
  fn from(err: tempfile::PersistError) -> Self {
    ForgeError::Io(err.error)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// pexforge.toml not found
  NotFound { workspace_root: PathBuf },

  /// Package config.toml not found
  PackageNotFound { name: String, path: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// A package declares no version anchors
  EmptyAnchors { package: String },

  /// Two anchors share the same floor version
  DuplicateFloor { package: String, floor: String },

  /// A version string in configuration is not valid semver
  InvalidVersion { value: String, reason: String },

  /// Any other validation failure
  Invalid { message: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create pexforge.toml at the repository root (see README.md for an example).".to_string())
      }
      ConfigError::PackageNotFound { name, .. } => Some(format!(
        "Create {}/config.toml with a package name, binaries and at least one [[versions]] anchor.",
        name
      )),
      ConfigError::EmptyAnchors { .. } => {
        Some("Add a [[versions]] table with `floor` and `runtime` keys to the package config.".to_string())
      }
      ConfigError::DuplicateFloor { .. } => {
        Some("Each [[versions]] anchor needs a distinct floor; merge or remove the duplicate.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { workspace_root } => {
        write!(
          f,
          "No pexforge configuration found.\nExpected file: {}/pexforge.toml",
          workspace_root.display()
        )
      }
      ConfigError::PackageNotFound { name, path } => {
        write!(f, "Package '{}' has no config at {}", name, path.display())
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::EmptyAnchors { package } => {
        write!(f, "No version anchors configured for '{}'", package)
      }
      ConfigError::DuplicateFloor { package, floor } => {
        write!(f, "Duplicate anchor floor {} for '{}'", floor, package)
      }
      ConfigError::InvalidVersion { value, reason } => {
        write!(f, "Invalid version '{}' in config: {}", value, reason)
      }
      ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
    }
  }
}

/// Upstream registry errors
#[derive(Debug)]
pub enum RegistryError {
  /// Registry could not be reached or returned an unusable answer
  Unavailable { package: String, reason: String },
}

impl RegistryError {
  fn help_message(&self) -> Option<String> {
    match self {
      RegistryError::Unavailable { .. } => {
        Some("The registry is retried on the next run; no releases were touched.".to_string())
      }
    }
  }
}

impl fmt::Display for RegistryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RegistryError::Unavailable { package, reason } => {
        write!(f, "Registry unavailable while listing '{}': {}", package, reason)
      }
    }
  }
}

/// Release store errors
#[derive(Debug)]
pub enum ReleaseStoreError {
  /// The store could not be reached or rejected the request
  Unavailable { tag: String, reason: String },

  /// The release for a tag does not exist
  NotFound { tag: String },

  /// A write did not produce the expected remote state
  Postcondition { tag: String, expected: String },

  /// A mutating call needs credentials that are not configured
  Unauthenticated { reason: String },
}

impl ReleaseStoreError {
  fn help_message(&self) -> Option<String> {
    match self {
      ReleaseStoreError::Postcondition { .. } => Some(
        "Another run may have modified the release concurrently; re-run to reconcile against the new state."
          .to_string(),
      ),
      ReleaseStoreError::Unauthenticated { .. } => {
        Some("Export GITHUB_TOKEN with `contents: write` permission for the release repository.".to_string())
      }
      ReleaseStoreError::NotFound { .. } => Some("Run `pexforge sync --apply` to create the release first.".to_string()),
      ReleaseStoreError::Unavailable { .. } => None,
    }
  }
}

impl fmt::Display for ReleaseStoreError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseStoreError::Unavailable { tag, reason } => {
        write!(f, "Release store unavailable for {}: {}", tag, reason)
      }
      ReleaseStoreError::NotFound { tag } => write!(f, "Release {} not found", tag),
      ReleaseStoreError::Postcondition { tag, expected } => {
        write!(f, "Release {} did not reach expected state: {}", tag, expected)
      }
      ReleaseStoreError::Unauthenticated { reason } => write!(f, "Release store authentication missing: {}", reason),
    }
  }
}

/// Build tool errors
#[derive(Debug)]
pub enum BuildError {
  /// The build tool could not be started
  Spawn { tool: String, reason: String },

  /// The build tool ran but did not produce the lock artifacts
  Failed { version: String, stderr: String },
}

impl BuildError {
  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::Spawn { tool, .. } => Some(format!(
        "Install `{}` or point [build] uv at the binary in pexforge.toml.",
        tool
      )),
      BuildError::Failed { .. } => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::Spawn { tool, reason } => write!(f, "Failed to run {}: {}", tool, reason),
      BuildError::Failed { version, stderr } => {
        write!(f, "Lock generation failed for {}:\n{}", version, stderr)
      }
    }
  }
}

/// Result type alias for pexforge
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ForgeResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ForgeResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ForgeError>,
{
  fn context(self, ctx: impl Into<String>) -> ForgeResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ForgeResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ForgeError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
