use async_trait::async_trait;
use log::info;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::http::HttpFetcher;
use super::SourceAdapter;
use crate::error::SourceFetchError;
use crate::model::{Platform, SourceContent};

const MAX_TITLE_CHARS: usize = 100;

static VIDEO_ID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"tiktok\.com/@[^/?#]+/video/(\d+)",
        r"tiktok\.com/v/(\d+)",
        r"vm\.tiktok\.com/([A-Za-z0-9]+)",
        r"tiktok\.com/t/([A-Za-z0-9]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

#[derive(Deserialize)]
struct OEmbed {
    #[serde(default)]
    title: String,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

/// TikTok videos through the public oEmbed endpoint.
///
/// The caption comes back as the oEmbed `title`; it is the only text TikTok
/// exposes without authentication, so it doubles as the raw text.
pub struct TikTokAdapter {
    fetcher: HttpFetcher,
    oembed_url: String,
}

impl TikTokAdapter {
    pub fn new(fetcher: HttpFetcher, oembed_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            oembed_url: oembed_url.into(),
        }
    }

    pub fn video_id(url: &str) -> Option<String> {
        VIDEO_ID.iter().find_map(|pattern| {
            pattern
                .captures(url)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }
}

fn caption_title(caption: &str) -> String {
    let first_line = caption.lines().map(str::trim).find(|l| !l.is_empty());
    first_line
        .unwrap_or_default()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl SourceAdapter for TikTokAdapter {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        Self::video_id(url)
    }

    async fn fetch(&self, url: &str) -> Result<SourceContent, SourceFetchError> {
        let video_id = Self::video_id(url)
            .ok_or_else(|| SourceFetchError::not_found(format!("No TikTok video id in {url}")))?;
        info!("Fetching TikTok video {video_id} via oEmbed");

        let embed: OEmbed = self.fetcher.get_json(&self.oembed_url, &[("url", url)]).await?;
        if embed.title.trim().is_empty() {
            return Err(SourceFetchError::parse_failure(format!(
                "TikTok video {video_id} has no caption"
            )));
        }

        Ok(SourceContent {
            title: caption_title(&embed.title),
            raw_text: embed.title,
            channel: embed.author_name,
            thumbnail: embed.thumbnail_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailureReason;
    use mockito::{Matcher, Server};

    #[test]
    fn test_video_id_patterns() {
        assert_eq!(
            TikTokAdapter::video_id("https://www.tiktok.com/@chef.anna/video/7212345678901234567?lang=en")
                .as_deref(),
            Some("7212345678901234567")
        );
        assert_eq!(
            TikTokAdapter::video_id("https://m.tiktok.com/v/7212345678901234567.html").as_deref(),
            Some("7212345678901234567")
        );
        assert_eq!(
            TikTokAdapter::video_id("https://vm.tiktok.com/ZMabc123/").as_deref(),
            Some("ZMabc123")
        );
        assert_eq!(
            TikTokAdapter::video_id("https://www.tiktok.com/t/ZTRxyz9/").as_deref(),
            Some("ZTRxyz9")
        );
        assert_eq!(TikTokAdapter::video_id("https://www.tiktok.com/@chef.anna"), None);
    }

    #[tokio::test]
    async fn test_fetch_caption() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/oembed")
            .match_query(Matcher::UrlEncoded(
                "url".into(),
                "https://www.tiktok.com/@chef/video/7212345678901234567".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"title":"Garlic butter noodles 🍜\n200g noodles\n3 cloves garlic #easyrecipe",
                    "author_name":"chef","thumbnail_url":"https://p16.tiktokcdn.com/x.jpg"}"#,
            )
            .create_async()
            .await;

        let adapter = TikTokAdapter::new(HttpFetcher::default(), format!("{}/oembed", server.url()));
        let content = adapter
            .fetch("https://www.tiktok.com/@chef/video/7212345678901234567")
            .await
            .unwrap();

        assert_eq!(content.title, "Garlic butter noodles 🍜");
        assert!(content.raw_text.contains("3 cloves garlic"));
        assert_eq!(content.channel.as_deref(), Some("chef"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_video() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/oembed")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let adapter = TikTokAdapter::new(HttpFetcher::default(), format!("{}/oembed", server.url()));
        let err = adapter
            .fetch("https://vm.tiktok.com/ZMabc123/")
            .await
            .unwrap_err();
        assert_eq!(err.reason, FetchFailureReason::NotFound);
    }
}
