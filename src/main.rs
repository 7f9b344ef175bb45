use std::env;
use std::sync::Arc;

use recipe_ingest::{IngestConfig, IngestRequest, MemoryStore, Pipeline};

const USAGE: &str = "Usage: recipe-ingest <url>\n       recipe-ingest --transcript <file> [--title <title>]";

async fn parse_args(args: &[String]) -> Result<IngestRequest, String> {
    let mut transcript_path = None;
    let mut title = None;
    let mut url = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--transcript" => {
                transcript_path = Some(iter.next().ok_or("--transcript needs a file path")?);
            }
            "--title" => title = Some(iter.next().ok_or("--title needs a value")?),
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if url.is_none() && !other.starts_with("--") => url = Some(other),
            other => return Err(format!("Unexpected argument '{other}'\n{USAGE}")),
        }
    }

    let mut request = match (url, transcript_path) {
        (Some(url), None) => IngestRequest::from_url(url),
        (None, Some(path)) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Could not read transcript {path}: {e}"))?;
            IngestRequest::from_transcript(text)
        }
        _ => return Err(USAGE.to_string()),
    };
    if let Some(title) = title {
        request = request.with_title(title);
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let request = match parse_args(&args).await {
        Ok(request) => request,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let pipeline = Pipeline::builder()
        .config(IngestConfig::load()?)
        .store(Arc::new(MemoryStore::new()))
        .build()?;

    let response = pipeline.ingest(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
