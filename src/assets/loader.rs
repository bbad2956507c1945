use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;
use rayon::prelude::*;

use crate::{
    assets::{Bitmap, decode::decode_image},
    foundation::error::{CompositorError, CompositorResult},
};

/// Anything the loader knows how to turn into a [`Bitmap`].
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Encoded image file contents (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Local file path.
    Path(PathBuf),
    /// `data:` URI, `file://` / `http(s)://` URL, or a bare path string.
    Url(String),
    /// Already decoded; passed through untouched.
    Bitmap(Bitmap),
}

impl ImageSource {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Path(_) => "path",
            Self::Url(_) => "url",
            Self::Bitmap(_) => "bitmap",
        }
    }
}

impl From<&str> for ImageSource {
    fn from(s: &str) -> Self {
        Self::Url(s.to_string())
    }
}

impl From<String> for ImageSource {
    fn from(s: String) -> Self {
        Self::Url(s)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for ImageSource {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Bitmap> for ImageSource {
    fn from(b: Bitmap) -> Self {
        Self::Bitmap(b)
    }
}

/// Resolves [`ImageSource`]s into decoded bitmaps.
///
/// Owns its HTTP client (built on first remote fetch), so there is no process-wide client state.
#[derive(Debug)]
pub struct ImageLoader {
    http_timeout: Duration,
    #[cfg(feature = "remote")]
    http: std::sync::OnceLock<Result<reqwest::blocking::Client, String>>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::with_http_timeout(Duration::from_secs(30))
    }

    pub fn with_http_timeout(http_timeout: Duration) -> Self {
        Self {
            http_timeout,
            #[cfg(feature = "remote")]
            http: std::sync::OnceLock::new(),
        }
    }

    #[tracing::instrument(skip_all, fields(kind = source.kind()))]
    pub fn load(&self, source: ImageSource) -> CompositorResult<Bitmap> {
        match source {
            ImageSource::Bitmap(bmp) => Ok(bmp),
            ImageSource::Bytes(bytes) => decode_image(&bytes),
            ImageSource::Path(path) => load_path(&path),
            ImageSource::Url(url) => self.load_url(&url),
        }
    }

    /// Load every source on the rayon pool. Output order matches input order; the first failure
    /// fails the whole batch.
    pub fn load_all(&self, sources: Vec<ImageSource>) -> CompositorResult<Vec<Bitmap>> {
        sources.into_par_iter().map(|s| self.load(s)).collect()
    }

    fn load_url(&self, url: &str) -> CompositorResult<Bitmap> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CompositorError::invalid_source("image url is empty"));
        }
        if let Some(rest) = strip_scheme(url, "data:") {
            return decode_image(&parse_data_url(rest)?);
        }
        if let Some(rest) = strip_scheme(url, "file://") {
            return load_path(Path::new(rest));
        }
        if strip_scheme(url, "http://").is_some() || strip_scheme(url, "https://").is_some() {
            return decode_image(&self.fetch(url)?);
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(CompositorError::invalid_source(format!(
                "unsupported url scheme '{scheme}'"
            )));
        }
        load_path(Path::new(url))
    }

    #[cfg(feature = "remote")]
    fn fetch(&self, url: &str) -> CompositorResult<Vec<u8>> {
        let client = self
            .http
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(self.http_timeout)
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| CompositorError::image_decode(format!("http client unavailable: {e}")))?;

        let resp = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetch '{url}'"))
            .map_err(CompositorError::decode_chain)?;
        let bytes = resp
            .bytes()
            .with_context(|| format!("read body of '{url}'"))
            .map_err(CompositorError::decode_chain)?;
        tracing::debug!(url, len = bytes.len(), "fetched remote image");
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "remote"))]
    fn fetch(&self, url: &str) -> CompositorResult<Vec<u8>> {
        let _ = self.http_timeout;
        Err(CompositorError::invalid_source(format!(
            "remote image '{url}' requires the `remote` feature"
        )))
    }
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    head.eq_ignore_ascii_case(scheme).then(|| &url[scheme.len()..])
}

fn load_path(path: &Path) -> CompositorResult<Bitmap> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read image file '{}'", path.display()))
        .map_err(CompositorError::decode_chain)?;
    decode_image(&bytes)
}

/// Decode the payload of a `data:` URI (everything after the scheme).
fn parse_data_url(rest: &str) -> CompositorResult<Vec<u8>> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompositorError::invalid_source("data url is missing ','"))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !mime.is_empty() && !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(CompositorError::invalid_source(format!(
            "data url has non-image media type '{mime}'"
        )));
    }

    if params.any(|p| p.eq_ignore_ascii_case("base64")) {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .context("decode base64 data url payload")
            .map_err(CompositorError::decode_chain)
    } else {
        percent_decode(payload)
    }
}

/// Decode `%XX` escapes of a plain (non-base64) `data:` payload.
fn percent_decode(payload: &str) -> CompositorResult<Vec<u8>> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let byte = bytes
            .get(i + 1..i + 3)
            .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .ok_or_else(|| {
                CompositorError::invalid_source(format!(
                    "data url has a malformed percent escape at byte {i}"
                ))
            })?;
        out.push(byte);
        i += 3;
    }
    Ok(out)
}
