use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::foundation::error::{BrandframeError, BrandframeResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the bytes of a template or font live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSource {
    /// Inline `data:` URL payload.
    Inline(Vec<u8>),
    Remote(String),
    File(PathBuf),
}

impl AssetSource {
    /// Classify `reference`: `data:` URLs, `http(s)://` URLs, `file://` URLs, or paths
    /// (relative ones are joined onto `base_dir`).
    pub fn parse(reference: &str, base_dir: &Path) -> BrandframeResult<Self> {
        let r = reference.trim();
        if r.is_empty() {
            return Err(BrandframeError::resource_load("empty asset reference"));
        }
        if r.starts_with("data:") {
            return decode_data_url(r).map(Self::Inline);
        }
        if r.starts_with("http://") || r.starts_with("https://") {
            return Ok(Self::Remote(r.to_owned()));
        }
        if let Some(rest) = r.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(rest)));
        }
        if let Some((scheme, _)) = r.split_once("://") {
            return Err(BrandframeError::resource_load(format!(
                "unsupported asset scheme '{scheme}'"
            )));
        }
        let p = Path::new(r);
        Ok(Self::File(if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }))
    }

    /// Short human label for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Inline(b) => format!("data URL ({} bytes)", b.len()),
            Self::Remote(url) => url.clone(),
            Self::File(p) => p.display().to_string(),
        }
    }

    /// Produce the bytes. Remote sources block on the network.
    pub fn read(self) -> BrandframeResult<Vec<u8>> {
        match self {
            Self::Inline(bytes) => Ok(bytes),
            Self::Remote(url) => fetch(&url),
            Self::File(path) => std::fs::read(&path).map_err(|e| {
                BrandframeError::resource_load(format!("failed to read '{}': {e}", path.display()))
            }),
        }
    }
}

/// Decode a `data:[<mediatype>][;base64],<payload>` URL.
///
/// Payloads without `;base64` are taken verbatim.
pub fn decode_data_url(url: &str) -> BrandframeResult<Vec<u8>> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| BrandframeError::resource_load("not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| BrandframeError::resource_load("data URL has no payload separator"))?;
    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        BASE64
            .decode(compact.as_bytes())
            .map_err(|e| BrandframeError::resource_load(format!("invalid base64 in data URL: {e}")))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

#[tracing::instrument(level = "debug")]
fn fetch(url: &str) -> BrandframeResult<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| BrandframeError::resource_load(format!("http client: {e}")))?;
    let resp = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| BrandframeError::resource_load(format!("failed to fetch '{url}': {e}")))?;
    let bytes = resp
        .bytes()
        .map_err(|e| BrandframeError::resource_load(format!("failed to read '{url}': {e}")))?;
    tracing::debug!(url, len = bytes.len(), "remote asset fetched");
    Ok(bytes.to_vec())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
