// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request id middleware for the Bench API.
//!
//! Takes the caller's `x-request-id` (or generates one), runs the request
//! inside a tracing span carrying it, injects [`RequestId`] into request
//! extensions and echoes the id on the response.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Identifier of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl std::ops::Deref for RequestId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn incoming_id(req: &Request) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
}

/// Middleware function attaching a request id and a request span.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = incoming_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = async move {
        let response = next.run(req).await;
        info!(status = response.status().as_u16(), "Request handled");
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string())))
    }
}
