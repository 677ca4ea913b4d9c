//! PyPI JSON API client

use crate::core::error::{ForgeResult, RegistryError};
use crate::registry::{PypiDocument, Registry};
use std::io::Read;

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Lists versions from `{index_url}/{package}/json`
pub struct PypiRegistry {
  agent: ureq::Agent,
  index_url: String,
}

impl PypiRegistry {
  pub fn new(index_url: impl Into<String>) -> Self {
    Self {
      agent: ureq::Agent::new_with_defaults(),
      index_url: index_url.into().trim_end_matches('/').to_string(),
    }
  }

  fn unavailable(package: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::Unavailable {
      package: package.to_string(),
      reason: reason.into(),
    }
  }
}

impl Registry for PypiRegistry {
  fn list_versions(&self, package: &str) -> ForgeResult<Vec<String>> {
    let url = format!("{}/{}/json", self.index_url, package);
    tracing::debug!("GET {url}");

    let resp = match self.agent.get(&url).header("Accept", "application/json").call() {
      Ok(r) => r,
      Err(ureq::Error::StatusCode(code)) => {
        return Err(Self::unavailable(package, format!("HTTP {code} for {url}")).into());
      }
      Err(e) => return Err(Self::unavailable(package, e.to_string()).into()),
    };

    let mut body = Vec::new();
    resp
      .into_body()
      .into_reader()
      .read_to_end(&mut body)
      .map_err(|e| Self::unavailable(package, e.to_string()))?;

    let document: PypiDocument =
      serde_json::from_slice(&body).map_err(|e| Self::unavailable(package, format!("unexpected response: {e}")))?;
    let versions = document.versions();
    tracing::info!("{} lists {} version(s) of {}", self.index_url, versions.len(), package);
    Ok(versions)
  }
}
