// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Resolving a URL to encoded image bytes.

* `data:` URLs are decoded inline; no request is made.
* `http:` and `https:` URLs are requested with an `Origin` header when the loader is configured
  with one, which is how a cross-origin request is tagged on the wire.
* `file:` URLs and URLs without a scheme are read from disk, the latter relative to the
  configured asset root.
*/

use std::path::PathBuf;

use base64::Engine;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::images::loader::LoaderConfig;

#[cfg(not(target_arch = "wasm32"))]
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: async_file::Error,
    },
    #[error("malformed url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0} does not name a local file")]
    NotAFilePath(Url),
    #[error("malformed data url")]
    MalformedDataUrl,
    #[error("data url payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),
    #[error("could not start a fetch thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("fetch thread exited without a result")]
    Abandoned,
}

/// Where a URL's bytes come from.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Location<'a> {
    /// Everything after `data:`.
    Inline(&'a str),
    Remote(Url),
    File(PathBuf),
}

pub(crate) fn locate<'a>(url: &'a str, config: &LoaderConfig) -> Result<Location<'a>, FetchError> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Ok(Location::File(config.asset_root.join(url)));
        }
        Err(e) => return Err(e.into()),
    };
    match parsed.scheme() {
        //a drive letter, not a scheme
        s if s.len() == 1 => Ok(Location::File(config.asset_root.join(url))),
        "data" => Ok(Location::Inline(&url["data:".len()..])),
        "http" | "https" => Ok(Location::Remote(parsed)),
        "file" => Ok(Location::File(file_path(&parsed)?)),
        s => Err(FetchError::UnsupportedScheme(s.to_string())),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn file_path(url: &Url) -> Result<PathBuf, FetchError> {
    url.to_file_path()
        .map_err(|()| FetchError::NotAFilePath(url.clone()))
}

#[cfg(target_arch = "wasm32")]
fn file_path(url: &Url) -> Result<PathBuf, FetchError> {
    Ok(PathBuf::from(
        percent_decode_str(url.path()).decode_utf8_lossy().into_owned(),
    ))
}

/// Fetches the encoded bytes behind `url`.
pub async fn fetch(url: &str, config: &LoaderConfig) -> Result<Vec<u8>, FetchError> {
    match locate(url, config)? {
        Location::Inline(payload) => decode_data_url(payload),
        Location::Remote(url) => fetch_remote(url, config).await,
        Location::File(path) => read_file(path, config).await,
    }
}

/// Decodes the part of a `data:` URL after the scheme.
pub(crate) fn decode_data_url(payload: &str) -> Result<Vec<u8>, FetchError> {
    let (meta, data) = payload
        .split_once(',')
        .ok_or(FetchError::MalformedDataUrl)?;
    let is_base64 = meta
        .rsplit(';')
        .next()
        .is_some_and(|p| p.trim().eq_ignore_ascii_case("base64"));
    let decoded = percent_decode_str(data);
    if is_base64 {
        let compact: String = decoded
            .decode_utf8_lossy()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
    } else {
        Ok(decoded.collect())
    }
}

/// reqwest's async client needs a tokio reactor on native targets, which the caller's executor
/// is not.  The blocking client runs on a thread of its own instead.
#[cfg(not(target_arch = "wasm32"))]
async fn fetch_remote(url: Url, config: &LoaderConfig) -> Result<Vec<u8>, FetchError> {
    logwise::info_sync!("fetching {url}", url = logwise::privacy::LogIt(&url));
    let origin = config.origin.clone();
    let (sender, receiver) = futures::channel::oneshot::channel();
    std::thread::Builder::new()
        .name("texture_acquire fetch".to_string())
        .spawn(move || {
            //the receiver may be gone if the acquisition was dropped
            let _ = sender.send(fetch_blocking(url, origin.as_deref()));
        })
        .map_err(FetchError::Spawn)?;
    receiver.await.map_err(|_| FetchError::Abandoned)?
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_blocking(url: Url, origin: Option<&str>) -> Result<Vec<u8>, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    let mut request = client.get(url);
    if let Some(origin) = origin {
        request = request.header(reqwest::header::ORIGIN, origin);
    }
    let response = request.send()?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

#[cfg(target_arch = "wasm32")]
async fn fetch_remote(url: Url, config: &LoaderConfig) -> Result<Vec<u8>, FetchError> {
    logwise::info_sync!("fetching {url}", url = logwise::privacy::LogIt(&url));
    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if let Some(origin) = &config.origin {
        request = request.header(reqwest::header::ORIGIN, origin.as_str());
    }
    let response = request.send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

async fn read_file(path: PathBuf, config: &LoaderConfig) -> Result<Vec<u8>, FetchError> {
    let file = match async_file::File::open(&path, config.priority).await {
        Ok(file) => file,
        Err(source) => return Err(FetchError::Io { path, source }),
    };
    match file.read_all(config.priority).await {
        Ok(data) => Ok(data.to_vec()),
        Err(source) => Err(FetchError::Io { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> LoaderConfig {
        LoaderConfig::default().with_asset_root("/srv/assets")
    }

    #[test]
    fn schemes() {
        let config = config();
        assert_eq!(
            locate("texture.png", &config).unwrap(),
            Location::File(Path::new("/srv/assets/texture.png").to_path_buf())
        );
        assert_eq!(
            locate("https://example.com/a.png", &config).unwrap(),
            Location::Remote(Url::parse("https://example.com/a.png").unwrap())
        );
        assert_eq!(
            locate("DATA:image/png;base64,AAAA", &config).unwrap(),
            Location::Inline("image/png;base64,AAAA")
        );
        assert!(matches!(
            locate("ftp://example.com/a.png", &config),
            Err(FetchError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    #[cfg(unix)]
    fn file_urls() {
        let config = config();
        assert_eq!(
            locate("file:///tmp/a%20b.png", &config).unwrap(),
            Location::File(PathBuf::from("/tmp/a b.png"))
        );
        //localhost is the local machine, not a path component
        assert_eq!(
            locate("file://localhost/tmp/a.png", &config).unwrap(),
            Location::File(PathBuf::from("/tmp/a.png"))
        );
        assert!(matches!(
            locate("file://fileserver/share/a.png", &config),
            Err(FetchError::NotAFilePath(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn missing_files_keep_their_cause() {
        let config = config().with_priority(async_file::Priority::unit_test());
        let err = test_executors::spin_on(fetch("missing.png", &config)).unwrap_err();
        assert!(matches!(
            &err,
            FetchError::Io { path, .. } if path == Path::new("/srv/assets/missing.png")
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn data_urls() {
        assert_eq!(
            decode_data_url("image/png;base64,aGVsbG8=").unwrap(),
            b"hello".to_vec()
        );
        assert_eq!(
            decode_data_url("text/plain,hi%20there").unwrap(),
            b"hi there".to_vec()
        );
        assert_eq!(decode_data_url(";base64,aGVs%0AbG8=").unwrap(), b"hello".to_vec());
        assert!(matches!(
            decode_data_url("image/png;base64"),
            Err(FetchError::MalformedDataUrl)
        ));
        assert!(matches!(
            decode_data_url("image/png;base64,!!!"),
            Err(FetchError::Base64(_))
        ));
    }

    #[test]
    fn stray_percents_are_kept() {
        assert_eq!(decode_data_url(",100%").unwrap(), b"100%".to_vec());
        assert_eq!(decode_data_url(",%41%zz").unwrap(), b"A%zz".to_vec());
    }
}
