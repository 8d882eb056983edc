//! Feed loading from a URL or a local file.  No retries: a failure goes
//! straight back to the caller, which renders its fallback.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{FeedError, FetchError};
use crate::feed::{parse_posts, parse_videos, PostRecord, VideoRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    Path(PathBuf),
}

impl FeedSource {
    /// `http://` / `https://` are URLs, anything else is a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("https://") || location.starts_with("http://") {
            FeedSource::Url(location.to_string())
        } else {
            FeedSource::Path(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedSource::Url(url) => f.write_str(url),
            FeedSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("meowtalk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    pub async fn fetch_text(&self, source: &FeedSource) -> Result<String, FetchError> {
        match source {
            FeedSource::Url(url) => self.fetch_url(url).await,
            FeedSource::Path(path) => {
                debug!("Reading feed file {:?}", path);
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.display().to_string(),
                        source,
                    })
            }
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching feed {}", url);
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self
            .http
            .get(url)
            .header("Accept", "application/atom+xml, application/rss+xml, text/xml")
            .send()
            .await
            .map_err(network)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(network)
    }

    pub async fn load_videos(&self, source: &FeedSource) -> Result<Vec<VideoRecord>, FeedError> {
        let xml = self.fetch_text(source).await?;
        let videos = parse_videos(&xml)?;
        info!("Loaded {} videos from {}", videos.len(), source);
        Ok(videos)
    }

    pub async fn load_posts(&self, source: &FeedSource) -> Result<Vec<PostRecord>, FeedError> {
        let xml = self.fetch_text(source).await?;
        let posts = parse_posts(&xml)?;
        info!("Loaded {} posts from {}", posts.len(), source);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_feed_source_parse() {
        assert_eq!(
            FeedSource::parse("https://example.com/feed.xml"),
            FeedSource::Url("https://example.com/feed.xml".to_string())
        );
        assert_eq!(
            FeedSource::parse("meowbah-videos.xml"),
            FeedSource::Path(PathBuf::from("meowbah-videos.xml"))
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FeedSource::Path(dir.path().join("nope.xml"));
        let err = FeedClient::new().load_videos(&source).await.unwrap_err();
        assert!(matches!(err, FeedError::Fetch(FetchError::Io { .. })), "{err:?}");
    }

    #[tokio::test]
    async fn test_empty_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.xml");
        std::fs::write(&path, "<rss><channel></channel></rss>").unwrap();
        let err = FeedClient::new()
            .load_posts(&FeedSource::Path(path))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::Parse(ParseError::Empty { expected: "item" })
        ));
    }
}
