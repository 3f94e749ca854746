//! Interception boundary: decides whether an outgoing request should be
//! translated, and rewrites it if so.
//!
//! A request opts in with three sentinel headers (names configurable, matched
//! case-insensitively):
//!
//! | header         | meaning                                   |
//! |----------------|-------------------------------------------|
//! | `protome`      | `true` to translate the body              |
//! | `protome-type` | message type to encode the JSON body as   |
//! | `protome-grpc` | `true` to wrap the message in a gRPC frame |
//!
//! Failures never reach the remote peer: the request goes out exactly as it
//! came in and the error is logged for the operator.

use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::Request;

use crate::config::SentinelHeaders;
use crate::engine::{Translation, Translator};
use crate::error::{ProtomeError, Result};

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
pub const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// What happened to one request.
#[derive(Debug)]
pub enum InterceptOutcome {
    /// No trigger header (or not `true`); untouched.
    NotEligible,
    /// Triggered but no type header; untouched.
    MissingType,
    Translated {
        type_name: String,
        translation: Translation,
    },
    /// Translation failed; the original request was forwarded.
    Failed {
        type_name: String,
        error: ProtomeError,
    },
}

impl InterceptOutcome {
    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated { .. })
    }
}

/// Apply the sentinel-header contract to `request`.
///
/// Returns the request to forward (rewritten only on success) and what
/// happened, for the caller's own audit trail.
pub fn rewrite_request(
    translator: &Translator,
    request: Request<Bytes>,
) -> (Request<Bytes>, InterceptOutcome) {
    let headers = &translator.config().headers;

    if !header_is_true(&request, &headers.trigger) {
        return (request, InterceptOutcome::NotEligible);
    }

    let Some(type_name) = header_str(&request, &headers.message_type) else {
        tracing::warn!(header = %headers.message_type, "translation requested without a message type header");
        return (request, InterceptOutcome::MissingType);
    };
    let want_frame = header_is_true(&request, &headers.grpc);

    match translate_body(translator, request.body(), &type_name, want_frame) {
        Ok(translation) => {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                type_name = %type_name,
                bytes = translation.payload.len(),
                framed = translation.framed,
                "rewrote request body"
            );
            let rewritten = apply(request, headers, &translation);
            (
                rewritten,
                InterceptOutcome::Translated {
                    type_name,
                    translation,
                },
            )
        }
        Err(error) => {
            tracing::error!(
                method = %request.method(),
                uri = %request.uri(),
                type_name = %type_name,
                kind = error.kind(),
                error = %error,
                "translation failed; forwarding original request"
            );
            (request, InterceptOutcome::Failed { type_name, error })
        }
    }
}

fn translate_body(
    translator: &Translator,
    body: &Bytes,
    type_name: &str,
    want_frame: bool,
) -> Result<Translation> {
    let json = std::str::from_utf8(body).map_err(|e| ProtomeError::MalformedJson {
        message: format!("body is not UTF-8: {e}"),
    })?;
    translator.translate(json, type_name, want_frame)
}

fn apply(request: Request<Bytes>, headers: &SentinelHeaders, translation: &Translation) -> Request<Bytes> {
    let (mut parts, _body) = request.into_parts();
    for name in [&headers.trigger, &headers.message_type, &headers.grpc] {
        parts.headers.remove(name.to_ascii_lowercase().as_str());
    }
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(translation.content_type()));
    if parts.headers.contains_key(CONTENT_LENGTH) {
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(translation.payload.len()));
    }
    Request::from_parts(parts, translation.payload.clone())
}

fn header_str<B>(request: &Request<B>, name: &str) -> Option<String> {
    request
        .headers()
        .get(name.to_ascii_lowercase().as_str())
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn header_is_true<B>(request: &Request<B>, name: &str) -> bool {
    header_str(request, name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}
