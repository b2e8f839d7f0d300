//! Resolved caller identity, attached to the request once per request.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::{StatusCode, request::Parts};

use crate::types::Subject;

/// The verified identity of a request, produced by exactly one credential
/// scheme and immutable afterwards.
///
/// Attached to the request extensions by the authentication gate and
/// discarded at request end; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: Subject,
    numeric_id: Option<i64>,
}

impl Principal {
    /// Build a principal from a verified subject.
    ///
    /// The numeric form is a best-effort parse: external identity fields
    /// are usually numeric but the string subject stays authoritative.
    pub fn new(subject: Subject) -> Self {
        let numeric_id = subject.as_str().parse::<i64>().ok();
        Self {
            subject,
            numeric_id,
        }
    }

    /// The authoritative textual identity.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Numeric form of the subject, when it has one.
    pub fn numeric_id(&self) -> Option<i64> {
        self.numeric_id
    }
}

/// Rejects with 401 when no principal was attached by the gate.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Yields `None` instead of rejecting when the request is unauthenticated.
impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Principal>().cloned())
    }
}
