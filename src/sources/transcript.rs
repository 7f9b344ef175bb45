use async_trait::async_trait;
use log::info;
use regex::Regex;
use std::sync::LazyLock;

use super::http::HttpFetcher;
use super::SourceAdapter;
use crate::error::{SourceFetchError, ValidationError};
use crate::model::{Platform, SourceContent};

/// Anything shorter cannot hold an ingredient list and a method
pub const MIN_TRANSCRIPT_CHARS: usize = 20;

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}\s*-->\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}")
        .unwrap()
});

static CUE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\s*$").unwrap());

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Strip subtitle scaffolding from `.vtt` / `.srt` text.
///
/// Drops the WEBVTT header block, NOTE/STYLE blocks, cue numbers, timing lines
/// and inline voice/timestamp tags. Auto-generated captions repeat each line
/// across consecutive cues; consecutive duplicates are collapsed.
pub fn clean_transcript(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut skipping_block = false;

    for line in raw.lines() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');
        if trimmed.is_empty() {
            skipping_block = false;
            continue;
        }
        if skipping_block {
            continue;
        }
        if trimmed.starts_with("WEBVTT")
            || trimmed.starts_with("NOTE")
            || trimmed == "STYLE"
            || trimmed == "REGION"
        {
            skipping_block = true;
            continue;
        }
        if CUE_TIMING.is_match(trimmed) || CUE_NUMBER.is_match(trimmed) {
            continue;
        }

        let text = INLINE_TAG.replace_all(trimmed, "");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() || lines.last() == Some(&text) {
            continue;
        }
        lines.push(text);
    }

    lines.join("\n")
}

/// Pasted transcripts and downloadable subtitle files
pub struct TranscriptAdapter {
    fetcher: HttpFetcher,
}

impl TranscriptAdapter {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Wrap text the caller supplied directly
    pub fn from_text(text: &str, title: Option<&str>) -> Result<SourceContent, ValidationError> {
        let raw_text = clean_transcript(text);
        let length = raw_text.chars().count();
        if length < MIN_TRANSCRIPT_CHARS {
            return Err(ValidationError::TranscriptTooShort(length));
        }
        Ok(SourceContent {
            title: title.map(str::trim).unwrap_or_default().to_string(),
            raw_text,
            channel: None,
            thumbnail: None,
        })
    }
}

#[async_trait]
impl SourceAdapter for TranscriptAdapter {
    fn platform(&self) -> Platform {
        Platform::Transcript
    }

    async fn fetch(&self, url: &str) -> Result<SourceContent, SourceFetchError> {
        info!("Downloading transcript {url}");
        let body = self.fetcher.get_text(url).await?;
        let raw_text = clean_transcript(&body);
        if raw_text.chars().count() < MIN_TRANSCRIPT_CHARS {
            return Err(SourceFetchError::parse_failure(format!(
                "Transcript at {url} is empty"
            )));
        }

        let title = url
            .rsplit('/')
            .next()
            .and_then(|file| file.split(['?', '#']).next())
            .and_then(|file| file.rsplit_once('.').map(|(stem, _)| stem))
            .unwrap_or_default()
            .replace(['-', '_'], " ");

        Ok(SourceContent {
            title,
            raw_text,
            channel: None,
            thumbnail: None,
        })
    }
}
