//! `protome rewrite`: run the interception contract on a request stored as
//! JSON, and print what would go over the wire.

use anyhow::{Context, Result};
use bytes::Bytes;
use colored::Colorize;
use hyper::Request;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use protome_core::{rewrite_request, InterceptOutcome};

use crate::{print_report, SchemaArgs};

#[derive(Debug, Deserialize)]
pub(crate) struct RequestSpec {
    #[serde(default = "default_method")]
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
}

fn default_method() -> String {
    "POST".to_string()
}

impl RequestSpec {
    pub(crate) fn into_request(self) -> Result<Request<Bytes>> {
        let mut builder = Request::builder()
            .method(self.method.as_str())
            .uri(self.uri.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Bytes::from(self.body))
            .context("invalid request description")
    }
}

pub(crate) fn cmd_rewrite(schema: &SchemaArgs, request_path: &Path) -> Result<()> {
    let (translator, report) = schema.load()?;
    print_report(&report);

    let text = fs::read_to_string(request_path)
        .with_context(|| format!("failed to read {}", request_path.display()))?;
    let described: RequestSpec = serde_json::from_str(&text)
        .with_context(|| format!("invalid request JSON: {}", request_path.display()))?;

    tracing::debug!(
        method = %described.method,
        uri = %described.uri,
        headers = described.headers.len(),
        "request description loaded"
    );
    let (request, outcome) = rewrite_request(&translator, described.into_request()?);

    match &outcome {
        InterceptOutcome::NotEligible => {
            eprintln!("{} trigger header absent; forwarded unchanged", "→".cyan());
        }
        InterceptOutcome::MissingType => {
            eprintln!(
                "{} message type header missing; forwarded unchanged",
                "WARNING:".yellow().bold()
            );
        }
        InterceptOutcome::Translated {
            type_name,
            translation,
        } => {
            if translation.is_empty_message() {
                eprintln!(
                    "{} resulting message is empty (0 bytes); check JSON key spelling",
                    "WARNING:".yellow().bold()
                );
            }
            eprintln!(
                "{} converted '{}' ({} bytes)",
                "→".cyan(),
                type_name,
                translation.payload.len()
            );
        }
        InterceptOutcome::Failed { type_name, error } => {
            eprintln!(
                "{} conversion of '{}' failed, forwarded unchanged: {error}",
                "ERROR:".red().bold(),
                type_name
            );
        }
    }

    println!("{} {}", request.method(), request.uri());
    for (name, value) in request.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    match std::str::from_utf8(request.body()) {
        Ok(text) if !outcome.is_translated() => println!("{text}"),
        _ => println!("{}", hex::encode(request.body())),
    }
    Ok(())
}
