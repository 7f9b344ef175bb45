use async_trait::async_trait;
use html_escape::decode_html_entities;
use log::{debug, info};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use super::http::HttpFetcher;
use super::SourceAdapter;
use crate::error::SourceFetchError;
use crate::extract::vocabulary::COMPONENT_HEADINGS;
use crate::model::{Platform, SourceContent};

const MAX_HEADING_WORDS: usize = 6;

/// Element siblings inspected after a heading when looking for its list
const SIBLING_LOOKAHEAD: usize = 3;

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, strong, b").unwrap());
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static LISTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul, ol").unwrap());
static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type='application/ld+json']").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).unwrap());

const SOCIAL_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "tiktok.com",
    "instagram.com",
    "facebook.com",
    "fb.com",
    "twitter.com",
    "x.com",
    "pinterest.com",
    "threads.net",
    "snapchat.com",
    "twitch.tv",
    "discord.gg",
    "patreon.com",
    "linktr.ee",
    "amazon.com",
    "amzn.to",
];

/// Generic recipe pages
pub struct WebpageAdapter {
    fetcher: HttpFetcher,
    max_page_chars: usize,
}

impl WebpageAdapter {
    pub fn new(fetcher: HttpFetcher, max_page_chars: usize) -> Self {
        Self {
            fetcher,
            max_page_chars,
        }
    }
}

#[async_trait]
impl SourceAdapter for WebpageAdapter {
    fn platform(&self) -> Platform {
        Platform::Webpage
    }

    async fn fetch(&self, url: &str) -> Result<SourceContent, SourceFetchError> {
        info!("Fetching web page {url}");
        let html = self.fetcher.get_text(url).await?;
        let content = parse_page(&html, self.max_page_chars);
        if content.raw_text.trim().is_empty() {
            return Err(SourceFetchError::parse_failure(format!(
                "No readable text found at {url}"
            )));
        }
        Ok(content)
    }
}

/// First link in `text` that does not point at a social or shopping site
pub fn find_external_link(text: &str) -> Option<String> {
    LINK.find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', '!', '?', ';', ':']))
        .find(|candidate| {
            let Ok(url) = Url::parse(candidate) else {
                return false;
            };
            let host = url
                .host_str()
                .unwrap_or_default()
                .trim_start_matches("www.")
                .to_lowercase();
            !host.is_empty()
                && !SOCIAL_HOSTS
                    .iter()
                    .any(|social| host == *social || host.ends_with(&format!(".{social}")))
        })
        .map(String::from)
}

/// Turn an HTML document into raw text plus metadata.
///
/// Ingredient lists that sit under recipe-component headings are emitted as
/// named sections. Pages without such headings fall back to their visible
/// block text, truncated to `max_chars`. JSON-LD recipe data, when present,
/// is appended as an "Ingredients" / "Instructions" block.
pub fn parse_page(html: &str, max_chars: usize) -> SourceContent {
    let document = Html::parse_document(html);

    let sections = component_sections(&document);
    let mut raw_text = if sections.is_empty() {
        debug!("No component headings found, using full page text");
        truncate_chars(&extract_inner_texts(&document).join("\n"), max_chars)
    } else {
        debug!("Found {} ingredient section(s)", sections.len());
        sections.join("\n\n")
    };

    if let Some(block) = json_ld_block(&document) {
        raw_text.push_str("\n\n");
        raw_text.push_str(&block);
    }

    SourceContent {
        title: page_title(&document).unwrap_or_default(),
        raw_text: raw_text.trim().to_string(),
        channel: meta_content(&document, "og:site_name"),
        thumbnail: meta_content(&document, "og:image"),
    }
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let css = format!("meta[property=\"{property}\"], meta[name=\"{property}\"]");
    let meta = Selector::parse(&css).ok()?;
    document
        .select(&meta)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| decode_html_symbols(content.trim()))
        .find(|content| !content.is_empty())
}

fn page_title(document: &Html) -> Option<String> {
    meta_content(document, "og:title").or_else(|| {
        [&*TITLE, &*H1].into_iter().find_map(|css| {
            document
                .select(css)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
        })
    })
}

fn is_component_heading(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() || words.len() > MAX_HEADING_WORDS {
        return false;
    }
    COMPONENT_HEADINGS.iter().any(|heading| {
        let heading_words: Vec<&str> = heading.split_whitespace().collect();
        words
            .windows(heading_words.len())
            .any(|window| window == heading_words.as_slice())
    })
}

/// Headings like "For the frosting" followed by a list become
/// "For the frosting:\n- item\n- item".
fn component_sections(document: &Html) -> Vec<String> {
    let mut used_lists = HashSet::new();
    let mut sections = Vec::new();

    for heading in document.select(&HEADINGS) {
        let title = element_text(&heading);
        if !is_component_heading(&title) {
            continue;
        }

        // Inline emphasis usually lives inside a paragraph; the list follows that
        let anchor = match heading.value().name() {
            "strong" | "b" => heading
                .parent()
                .and_then(ElementRef::wrap)
                .filter(|p| matches!(p.value().name(), "p" | "span" | "div"))
                .unwrap_or(heading),
            _ => heading,
        };

        let Some(list) = following_list(&anchor) else {
            continue;
        };
        if !used_lists.insert(list.id()) {
            continue;
        }

        let lines: Vec<String> = list
            .select(&LIST_ITEMS)
            .map(|li| element_text(&li))
            .filter(|text| !text.is_empty())
            .map(|text| format!("- {text}"))
            .collect();
        if lines.is_empty() {
            continue;
        }

        let header = title.trim_end_matches(':').trim();
        sections.push(format!("{header}:\n{}", lines.join("\n")));
    }

    sections
}

fn following_list<'a>(anchor: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    for sibling in anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take(SIBLING_LOOKAHEAD)
    {
        match sibling.value().name() {
            "ul" | "ol" => return Some(sibling),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => return None,
            _ => {
                if let Some(nested) = sibling.select(&LISTS).next() {
                    return Some(nested);
                }
            }
        }
    }
    None
}

fn decode_html_symbols(text: &str) -> String {
    // Some sites double-encode entities inside attributes and JSON-LD
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn sanitize_json(json_str: &str) -> String {
    let mut cleaned = json_str.trim().to_string();
    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        if let Some(start) = cleaned.find('{') {
            cleaned = cleaned[start..].to_string();
        }
    }
    cleaned
        .replace(",]", "]")
        .replace(",}", "}")
        .replace("<!--", "")
        .replace("-->", "")
}

fn is_recipe(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe),
        Value::Object(_) if is_recipe(value) => Some(value),
        Value::Object(_) => value.get("@graph").and_then(find_recipe),
        _ => None,
    }
}

fn instruction_texts(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| instruction_texts(item, out)),
        Value::Object(_) => {
            if let Some(children) = value.get("itemListElement") {
                instruction_texts(children, out);
            } else if let Some(text) = value.get("text").or_else(|| value.get("description")) {
                instruction_texts(text, out);
            }
        }
        _ => {}
    }
}

fn json_ld_block(document: &Html) -> Option<String> {
    let recipe = document.select(&JSON_LD).find_map(|script| {
        let cleaned = sanitize_json(&script.inner_html());
        let value: Value = serde_json::from_str(&cleaned).ok()?;
        find_recipe(&value).cloned()
    })?;

    let ingredients: Vec<String> = recipe
        .get("recipeIngredient")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|item| normalize_whitespace(&decode_html_symbols(item)))
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut steps = Vec::new();
    if let Some(instructions) = recipe.get("recipeInstructions") {
        instruction_texts(instructions, &mut steps);
    }

    if ingredients.is_empty() && steps.is_empty() {
        return None;
    }

    let mut block = String::new();
    if !ingredients.is_empty() {
        block.push_str("Ingredients:\n");
        for item in &ingredients {
            block.push_str(&format!("- {item}\n"));
        }
    }
    if !steps.is_empty() {
        block.push_str("\nInstructions:\n");
        for (i, step) in steps.iter().enumerate() {
            let step = normalize_whitespace(&decode_html_symbols(step));
            block.push_str(&format!("{}. {step}\n", i + 1));
        }
    }
    Some(block.trim().to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

fn extract_inner_texts(document: &Html) -> Vec<String> {
    let mut tokens = Vec::new();
    extract_text_from_element(&document.root_element(), &mut tokens);

    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        match token {
            TextToken::Break => {
                let merged = current.join(" ").trim().to_string();
                if !merged.is_empty() {
                    blocks.push(merged);
                }
                current.clear();
            }
            TextToken::Text(text) => current.push(text),
        }
    }
    let merged = current.join(" ").trim().to_string();
    if !merged.is_empty() {
        blocks.push(merged);
    }
    blocks
}

enum TextToken {
    Text(String),
    Break,
}

fn extract_text_from_element(element: &ElementRef, out: &mut Vec<TextToken>) {
    if is_hidden(element) || should_skip_element(element) {
        return;
    }

    let tag_name = element.value().name().to_lowercase();
    if tag_name == "br" {
        out.push(TextToken::Break);
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = normalize_whitespace(text);
                if !trimmed.is_empty() {
                    out.push(TextToken::Text(trimmed));
                }
            }
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    extract_text_from_element(&child_ref, out);
                }
            }
            _ => {}
        }
    }

    if is_block_element(&tag_name) {
        out.push(TextToken::Break);
    }
}

fn is_hidden(element: &ElementRef) -> bool {
    element.value().attr("hidden").is_some()
        || element
            .value()
            .attr("style")
            .is_some_and(|s| s.contains("display: none") || s.contains("visibility: hidden"))
}

fn is_block_element(tag: &str) -> bool {
    matches!(
        tag,
        "article"
            | "aside"
            | "blockquote"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "figcaption"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "tr"
            | "ul"
    )
}

fn should_skip_element(element: &ElementRef) -> bool {
    matches!(
        element.value().name(),
        "head" | "script" | "style" | "noscript" | "iframe" | "canvas" | "svg" | "nav" | "form"
    )
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
