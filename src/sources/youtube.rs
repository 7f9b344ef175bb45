use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::http::HttpFetcher;
use super::{CommentSource, SourceAdapter};
use crate::config::IngestConfig;
use crate::error::SourceFetchError;
use crate::model::{Platform, SourceContent};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .unwrap()
});

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high.or(self.medium).or(self.default).map(|t| t.url)
    }
}

#[derive(Deserialize)]
struct OEmbed {
    title: String,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Deserialize)]
struct CommentThreads {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
}

/// YouTube videos via the Data API, degrading to oEmbed without a key
pub struct YouTubeAdapter {
    fetcher: HttpFetcher,
    api_key: Option<String>,
    api_base_url: String,
    oembed_url: String,
}

impl YouTubeAdapter {
    pub fn new(
        fetcher: HttpFetcher,
        api_key: Option<String>,
        api_base_url: impl Into<String>,
        oembed_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            api_key,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            oembed_url: oembed_url.into(),
        }
    }

    pub fn from_config(config: &IngestConfig, fetcher: HttpFetcher) -> Self {
        Self::new(
            fetcher,
            config.youtube_api_key(),
            config.youtube.api_base_url.clone(),
            config.youtube.oembed_url.clone(),
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn video_id(url: &str) -> Option<String> {
        VIDEO_ID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    async fn fetch_snippet(
        &self,
        video_id: &str,
        api_key: &str,
    ) -> Result<SourceContent, SourceFetchError> {
        let endpoint = format!("{}/youtube/v3/videos", self.api_base_url);
        let list: VideoList = self
            .fetcher
            .get_json(
                &endpoint,
                &[("part", "snippet"), ("id", video_id), ("key", api_key)],
            )
            .await?;

        let item = list.items.into_iter().next().ok_or_else(|| {
            SourceFetchError::not_found(format!("YouTube video {video_id} not found or private"))
        })?;
        let snippet = item.snippet;

        Ok(SourceContent {
            raw_text: snippet.description,
            title: snippet.title,
            channel: snippet.channel_title,
            thumbnail: snippet.thumbnails.best(),
        })
    }

    async fn fetch_oembed(&self, video_id: &str) -> Result<SourceContent, SourceFetchError> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let embed: OEmbed = self
            .fetcher
            .get_json(&self.oembed_url, &[("url", watch_url.as_str()), ("format", "json")])
            .await?;

        Ok(SourceContent {
            raw_text: embed.title.clone(),
            title: embed.title,
            channel: embed.author_name,
            thumbnail: embed.thumbnail_url,
        })
    }
}

#[async_trait]
impl SourceAdapter for YouTubeAdapter {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        Self::video_id(url)
    }

    async fn fetch(&self, url: &str) -> Result<SourceContent, SourceFetchError> {
        let video_id = Self::video_id(url).ok_or_else(|| {
            SourceFetchError::not_found(format!("No YouTube video id in {url}"))
        })?;

        match &self.api_key {
            Some(api_key) => {
                info!("Fetching YouTube video {video_id} from the Data API");
                self.fetch_snippet(&video_id, api_key).await
            }
            None => {
                warn!("No YouTube API key configured, falling back to oEmbed for {video_id}");
                self.fetch_oembed(&video_id).await
            }
        }
    }
}

#[async_trait]
impl CommentSource for YouTubeAdapter {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<String>, SourceFetchError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SourceFetchError::blocked("Reading YouTube comments requires an API key")
        })?;

        let endpoint = format!("{}/youtube/v3/commentThreads", self.api_base_url);
        let max_results = max_results.clamp(1, 100).to_string();
        let threads: CommentThreads = self
            .fetcher
            .get_json(
                &endpoint,
                &[
                    ("part", "snippet"),
                    ("videoId", video_id),
                    ("maxResults", max_results.as_str()),
                    ("order", "relevance"),
                    ("textFormat", "plainText"),
                    ("key", api_key),
                ],
            )
            .await?;

        debug!("Fetched {} comment threads for {video_id}", threads.items.len());
        Ok(threads
            .items
            .into_iter()
            .map(|thread| thread.snippet.top_level_comment.snippet.text_display)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailureReason;
    use mockito::{Matcher, Server};

    fn adapter(server_url: &str, api_key: Option<&str>) -> YouTubeAdapter {
        YouTubeAdapter::new(
            HttpFetcher::default(),
            api_key.map(String::from),
            server_url,
            format!("{server_url}/oembed"),
        )
    }

    #[test]
    fn test_video_id_patterns() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "https://m.youtube.com/v/dQw4w9WgXcQ",
        ];
        for url in cases {
            assert_eq!(
                YouTubeAdapter::video_id(url).as_deref(),
                Some("dQw4w9WgXcQ"),
                "{url}"
            );
        }

        assert_eq!(YouTubeAdapter::video_id("https://www.youtube.com/feed/trending"), None);
        assert_eq!(YouTubeAdapter::video_id("https://youtu.be/short"), None);
    }

    #[tokio::test]
    async fn test_fetch_with_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/youtube/v3/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "dQw4w9WgXcQ".into()),
                Matcher::UrlEncoded("key".into(), "yt-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items":[{"snippet":{
                    "title":"Best Pancakes",
                    "description":"2 cups flour\n2 eggs\n1 cup milk",
                    "channelTitle":"Brunch Club",
                    "thumbnails":{"high":{"url":"https://i.ytimg.com/hq.jpg"}}
                }}]}"#,
            )
            .create_async()
            .await;

        let content = adapter(&server.url(), Some("yt-key"))
            .fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(content.title, "Best Pancakes");
        assert!(content.raw_text.contains("2 eggs"));
        assert_eq!(content.channel.as_deref(), Some("Brunch Club"));
        assert_eq!(content.thumbnail.as_deref(), Some("https://i.ytimg.com/hq.jpg"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_private_video_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/youtube/v3/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let err = adapter(&server.url(), Some("yt-key"))
            .fetch("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert_eq!(err.reason, FetchFailureReason::NotFound);
    }

    #[tokio::test]
    async fn test_oembed_fallback_without_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/oembed")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Quick Ramen","author_name":"Noodle Lab"}"#)
            .create_async()
            .await;

        let content = adapter(&server.url(), None)
            .fetch("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(content.title, "Quick Ramen");
        assert_eq!(content.channel.as_deref(), Some("Noodle Lab"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_comments() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/youtube/v3/commentThreads")
            .match_query(Matcher::UrlEncoded("videoId".into(), "dQw4w9WgXcQ".into()))
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"snippet":{"topLevelComment":{"snippet":{"textDisplay":"Looks great!"}}}},
                    {"snippet":{"topLevelComment":{"snippet":{"textDisplay":"I used 2 cups sugar"}}}}
                ]}"#,
            )
            .create_async()
            .await;

        let comments = adapter(&server.url(), Some("yt-key"))
            .fetch_comments("dQw4w9WgXcQ", 50)
            .await
            .unwrap();
        assert_eq!(comments, vec!["Looks great!", "I used 2 cups sugar"]);
    }

    #[tokio::test]
    async fn test_comments_need_api_key() {
        let err = adapter("http://127.0.0.1:9", None)
            .fetch_comments("dQw4w9WgXcQ", 10)
            .await
            .unwrap_err();
        assert_eq!(err.reason, FetchFailureReason::Blocked);
    }
}
