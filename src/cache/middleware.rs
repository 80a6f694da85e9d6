//! Axum glue for the response cache.
//!
//! Install per route with
//! `axum::middleware::from_fn_with_state(cache, cache_response)`.

use axum::{
    body::{Body, Bytes},
    extract::{Query, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::{stream, StreamExt};
use serde_json::{Map, Value};
use tracing::debug;

use super::response::{CapturedResponse, RequestShape, ResponseCache};

/// Largest request body considered when deriving a cache key. Larger
/// requests go to the handler uncached.
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Middleware running the downstream handler through [`ResponseCache::intercept`].
///
/// Never answers on its own: whenever the request cannot be keyed it is
/// handed to `next` unchanged.
pub async fn cache_response(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    if !cache.is_connected() {
        cache.note_bypass();
        return next.run(request).await;
    }
    if declared_length(request.headers()).is_some_and(|len| len > MAX_REQUEST_BODY) {
        debug!("request body over the keying limit, bypassing cache");
        cache.note_bypass();
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match buffer_body(body).await {
        Ok(bytes) => bytes,
        Err(body) => {
            debug!("request body not bufferable, bypassing cache");
            cache.note_bypass();
            return next.run(Request::from_parts(parts, body)).await;
        }
    };

    let shape = RequestShape {
        path: parts.uri.path().to_string(),
        query: query_value(&parts.uri),
        body: body_value(&bytes),
    };

    cache
        .intercept(&shape, || async move {
            let request = Request::from_parts(parts, Body::from(bytes));
            CapturedResponse::capture(next.run(request).await).await
        })
        .await
        .into_response()
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Collects at most [`MAX_REQUEST_BODY`] bytes. On overflow or a read error
/// the chunks already taken are stitched back in front of the rest, so the
/// handler sees the same body it would have seen without the cache.
async fn buffer_body(body: Body) -> Result<Bytes, Body> {
    let mut data = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0;

    while let Some(frame) = data.next().await {
        match frame {
            Ok(chunk) => {
                total += chunk.len();
                chunks.push(chunk);
                if total > MAX_REQUEST_BODY {
                    let taken = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
                    return Err(Body::from_stream(taken.chain(data)));
                }
            }
            Err(e) => {
                let taken = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
                return Err(Body::from_stream(taken.chain(stream::once(async move { Err(e) }))));
            }
        }
    }

    Ok(match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.swap_remove(0),
        _ => Bytes::from(chunks.concat()),
    })
}

/// Query parameters as a JSON object; `{}` when absent. A repeated name
/// becomes an array of its values in order.
fn query_value(uri: &Uri) -> Value {
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => {
            let mut params = Map::new();
            for (name, value) in pairs {
                match params.get_mut(&name) {
                    None => {
                        params.insert(name, Value::String(value));
                    }
                    Some(Value::Array(values)) => values.push(Value::String(value)),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, Value::String(value)]);
                    }
                }
            }
            Value::Object(params)
        }
        Err(_) => Value::String(uri.query().unwrap_or_default().to_string()),
    }
}

/// Request body as JSON; `{}` when empty, raw text when not JSON.
fn body_value(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
