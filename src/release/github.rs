//! GitHub Releases client
//!
//! Talks to the REST API directly with `ureq`. Reads work without a token on
//! public repositories; every mutating call requires one.

use crate::core::error::{ForgeError, ForgeResult, ReleaseStoreError};
use crate::release::descriptor::BuildDescriptor;
use crate::release::record::{AssetRecord, ReleaseRecord};
use crate::release::store::ReleaseStore;
use crate::utils::sha256_hex;
use rayon::prelude::*;
use serde::Deserialize;
use std::io::Read;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_UPLOADS_URL: &str = "https://uploads.github.com";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ApiRelease {
  id: u64,
  tag_name: String,
  prerelease: bool,
  #[serde(default)]
  body: Option<String>,
  #[serde(default)]
  assets: Vec<ApiAsset>,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
  id: u64,
  name: String,
  url: String,
  #[serde(default)]
  digest: Option<String>,
}

/// Release store backed by GitHub Releases
pub struct GithubReleases {
  agent: ureq::Agent,
  repository: String,
  api_url: String,
  uploads_url: String,
  token: Option<String>,
}

impl GithubReleases {
  pub fn new(
    repository: impl Into<String>,
    api_url: impl Into<String>,
    uploads_url: impl Into<String>,
    token: Option<String>,
  ) -> Self {
    Self {
      agent: ureq::Agent::new_with_defaults(),
      repository: repository.into(),
      api_url: api_url.into().trim_end_matches('/').to_string(),
      uploads_url: uploads_url.into().trim_end_matches('/').to_string(),
      token,
    }
  }

  fn repo_url(&self, suffix: &str) -> String {
    format!("{}/repos/{}/{}", self.api_url, self.repository, suffix)
  }

  fn require_token(&self) -> ForgeResult<&str> {
    self.token.as_deref().ok_or_else(|| {
      ReleaseStoreError::Unauthenticated {
        reason: format!("writing releases in {} needs GITHUB_TOKEN", self.repository),
      }
      .into()
    })
  }

  fn with_headers<B>(&self, req: ureq::RequestBuilder<B>, accept: &str) -> ureq::RequestBuilder<B> {
    let req = req.header("Accept", accept).header("X-GitHub-Api-Version", API_VERSION);
    match &self.token {
      Some(token) => req.header("Authorization", &format!("Bearer {token}")),
      None => req,
    }
  }

  /// GET returning `None` on 404
  fn get_bytes(&self, tag: &str, url: &str, accept: &str) -> ForgeResult<Option<Vec<u8>>> {
    tracing::debug!("GET {url}");
    let req = self.with_headers(self.agent.get(url), accept);
    match req.call() {
      Ok(resp) => read_body(tag, resp).map(Some),
      Err(ureq::Error::StatusCode(404)) => Ok(None),
      Err(e) => Err(map_error(tag, e)),
    }
  }

  fn fetch_release(&self, tag: &str) -> ForgeResult<Option<ApiRelease>> {
    let url = self.repo_url(&format!("releases/tags/{tag}"));
    match self.get_bytes(tag, &url, "application/vnd.github+json")? {
      Some(body) => Ok(Some(parse(tag, &body)?)),
      None => Ok(None),
    }
  }

  fn require_release(&self, tag: &str) -> ForgeResult<ApiRelease> {
    self.fetch_release(tag)?.ok_or_else(|| {
      ReleaseStoreError::NotFound {
        tag: tag.to_string(),
      }
      .into()
    })
  }

  fn patch_release(&self, tag: &str, id: u64, payload: serde_json::Value) -> ForgeResult<()> {
    self.require_token()?;
    let url = self.repo_url(&format!("releases/{id}"));
    tracing::debug!("PATCH {url}");
    let body = serde_json::to_vec(&payload)?;
    let req = self.with_headers(self.agent.patch(&url), "application/vnd.github+json");
    req
      .header("Content-Type", "application/json")
      .send(&body[..])
      .map_err(|e| map_error(tag, e))?;
    Ok(())
  }

  fn delete_url(&self, tag: &str, url: &str) -> ForgeResult<()> {
    self.require_token()?;
    tracing::debug!("DELETE {url}");
    let req = self.with_headers(self.agent.delete(url), "application/vnd.github+json");
    req.call().map_err(|e| map_error(tag, e))?;
    Ok(())
  }

  /// Hash every asset, preferring the server-side digest and downloading the rest in parallel
  fn hash_assets(&self, tag: &str, assets: &[ApiAsset]) -> ForgeResult<AssetRecord> {
    let mut record = AssetRecord::new();
    let mut pending = Vec::new();
    for asset in assets {
      match asset.digest.as_deref().and_then(|d| d.strip_prefix("sha256:")) {
        Some(hex) => {
          record.insert(asset.name.clone(), hex.to_lowercase());
        }
        None => pending.push(asset),
      }
    }

    if !pending.is_empty() {
      tracing::debug!("hashing {} asset(s) of {} without a server digest", pending.len(), tag);
      let hashed = pending
        .par_iter()
        .map(|asset| -> ForgeResult<(String, String)> {
          let bytes = self
            .get_bytes(tag, &asset.url, "application/octet-stream")?
            .ok_or_else(|| ReleaseStoreError::Unavailable {
              tag: tag.to_string(),
              reason: format!("asset {} disappeared while reading", asset.name),
            })?;
          Ok((asset.name.clone(), sha256_hex(&bytes)))
        })
        .collect::<ForgeResult<Vec<_>>>()?;
      record.extend(hashed);
    }

    Ok(record)
  }
}

impl ReleaseStore for GithubReleases {
  fn name(&self) -> &'static str {
    "github"
  }

  fn get(&self, tag: &str) -> ForgeResult<Option<ReleaseRecord>> {
    let Some(release) = self.fetch_release(tag)? else {
      return Ok(None);
    };

    let assets = self.hash_assets(tag, &release.assets)?;
    Ok(Some(ReleaseRecord {
      tag: release.tag_name,
      is_prerelease: release.prerelease,
      build_descriptor: release.body.as_deref().and_then(BuildDescriptor::from_description),
      assets,
    }))
  }

  fn create(&self, tag: &str, title: &str, prerelease: bool) -> ForgeResult<ReleaseRecord> {
    self.require_token()?;
    let url = self.repo_url("releases");
    tracing::debug!("POST {url} ({tag})");
    let payload = serde_json::json!({
      "tag_name": tag,
      "name": title,
      "body": "",
      "draft": false,
      "prerelease": prerelease,
    });
    let body = serde_json::to_vec(&payload)?;
    let req = self.with_headers(self.agent.post(&url), "application/vnd.github+json");
    let resp = req
      .header("Content-Type", "application/json")
      .send(&body[..])
      .map_err(|e| map_error(tag, e))?;
    let release: ApiRelease = parse(tag, &read_body(tag, resp)?)?;

    Ok(ReleaseRecord {
      tag: release.tag_name,
      is_prerelease: release.prerelease,
      build_descriptor: None,
      assets: AssetRecord::new(),
    })
  }

  fn delete(&self, tag: &str) -> ForgeResult<()> {
    let release = self.require_release(tag)?;
    self.delete_url(tag, &self.repo_url(&format!("releases/{}", release.id)))
  }

  fn upload_asset(&self, tag: &str, name: &str, bytes: &[u8]) -> ForgeResult<String> {
    self.require_token()?;
    let release = self.require_release(tag)?;

    // Same name: drop the old asset first, uploads cannot overwrite in place
    if let Some(existing) = release.assets.iter().find(|a| a.name == name) {
      self.delete_url(tag, &self.repo_url(&format!("releases/assets/{}", existing.id)))?;
    }

    let url = format!(
      "{}/repos/{}/releases/{}/assets",
      self.uploads_url, self.repository, release.id
    );
    tracing::debug!("POST {url} ({name}, {} bytes)", bytes.len());
    let req = self.with_headers(self.agent.post(&url), "application/vnd.github+json");
    req
      .query("name", name)
      .header("Content-Type", "application/octet-stream")
      .send(bytes)
      .map_err(|e| map_error(tag, e))?;

    Ok(sha256_hex(bytes))
  }

  fn set_final(&self, tag: &str) -> ForgeResult<()> {
    let release = self.require_release(tag)?;
    self.patch_release(tag, release.id, serde_json::json!({ "prerelease": false }))
  }

  fn set_description(&self, tag: &str, text: &str) -> ForgeResult<()> {
    let release = self.require_release(tag)?;
    self.patch_release(tag, release.id, serde_json::json!({ "body": text }))
  }
}

fn read_body(tag: &str, resp: ureq::http::Response<ureq::Body>) -> ForgeResult<Vec<u8>> {
  let mut reader = resp.into_body().into_reader();
  let mut body = Vec::new();
  reader.read_to_end(&mut body).map_err(|e| ReleaseStoreError::Unavailable {
    tag: tag.to_string(),
    reason: e.to_string(),
  })?;
  Ok(body)
}

fn parse<T: serde::de::DeserializeOwned>(tag: &str, body: &[u8]) -> ForgeResult<T> {
  serde_json::from_slice(body).map_err(|e| {
    ReleaseStoreError::Unavailable {
      tag: tag.to_string(),
      reason: format!("unexpected response: {e}"),
    }
    .into()
  })
}

fn map_error(tag: &str, err: ureq::Error) -> ForgeError {
  match err {
    ureq::Error::StatusCode(401) => ReleaseStoreError::Unauthenticated {
      reason: "GitHub rejected the token (HTTP 401)".to_string(),
    }
    .into(),
    ureq::Error::StatusCode(code) => ReleaseStoreError::Unavailable {
      tag: tag.to_string(),
      reason: format!("HTTP {code}"),
    }
    .into(),
    other => ReleaseStoreError::Unavailable {
      tag: tag.to_string(),
      reason: other.to_string(),
    }
    .into(),
  }
}
