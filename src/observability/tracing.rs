//! Distributed trace context.
//!
//! # Responsibilities
//! - Extract W3C `traceparent` context from incoming requests
//! - Decide sampling for new traces by trace-id ratio
//! - Create one span per request carrying trace and service identity
//!
//! Export to a collector is left to whatever layer the host attaches to the
//! subscriber; this module only resolves and validates the endpoint.

use axum::http::{HeaderMap, Request};
use tracing::Span;
use url::Url;

use crate::config::{ServiceConfig, TracerConfig};

pub const TRACEPARENT: &str = "traceparent";

/// Error type for tracer setup.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("invalid collector endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },

    #[error("collector endpoint {0:?} has no host")]
    MissingHost(String),
}

/// Trace context propagated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub parent_span_id: u64,
    pub sampled: bool,
}

impl TraceContext {
    /// Parse a `traceparent` header value (`00-<trace>-<span>-<flags>`).
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
            return None;
        }
        u8::from_str_radix(version, 16).ok()?;
        // Only version 00 has a fixed field count.
        if version == "00" && parts.next().is_some() {
            return None;
        }
        if trace_id.len() != 32 || span_id.len() != 16 || flags.len() != 2 {
            return None;
        }

        let trace_id = u128::from_str_radix(trace_id, 16).ok()?;
        let parent_span_id = u64::from_str_radix(span_id, 16).ok()?;
        let flags = u8::from_str_radix(flags, 16).ok()?;
        if trace_id == 0 || parent_span_id == 0 {
            return None;
        }

        Some(Self {
            trace_id,
            parent_span_id,
            sampled: flags & 0x01 == 0x01,
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(TRACEPARENT)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
    }
}

/// Deterministic sampler keyed on the low 64 bits of the trace id, so every
/// service using the same ratio makes the same decision for a trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceIdRatioSampler {
    ratio: f64,
    upper_bound: u64,
}

impl TraceIdRatioSampler {
    pub fn new(ratio: f64) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        Self {
            ratio,
            upper_bound: (ratio * (1u64 << 63) as f64) as u64,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn should_sample(&self, trace_id: u128) -> bool {
        if self.ratio >= 1.0 {
            return true;
        }
        let low = trace_id as u64;
        (low >> 1) < self.upper_bound
    }
}

/// Trace identity for one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTrace {
    pub trace_id: u128,
    /// Caller's span, when a `traceparent` was propagated.
    pub parent_span_id: Option<u64>,
    pub sampled: bool,
}

/// Resolved tracer settings shared by the request span factory.
#[derive(Debug, Clone)]
pub struct TraceSettings {
    pub service_name: String,
    pub command: String,
    pub collector: Url,
    pub sampler: TraceIdRatioSampler,
}

impl TraceSettings {
    pub fn new(
        service: &ServiceConfig,
        tracer: &TracerConfig,
        command: impl Into<String>,
    ) -> Result<Self, TracerError> {
        let settings = Self {
            service_name: service.name.clone(),
            command: command.into(),
            collector: parse_endpoint(&tracer.host)?,
            sampler: TraceIdRatioSampler::new(tracer.ratio),
        };

        tracing::info!(
            service = %settings.service_name,
            command = %settings.command,
            collector = %settings.collector,
            ratio = settings.sampler.ratio(),
            "Tracer configured"
        );
        Ok(settings)
    }

    /// Continue the caller's trace or start a new one.
    ///
    /// A propagated context keeps its own sampling decision; new traces are
    /// sampled by ratio.
    pub fn resolve(&self, headers: &HeaderMap) -> ResolvedTrace {
        match TraceContext::from_headers(headers) {
            Some(parent) => ResolvedTrace {
                trace_id: parent.trace_id,
                parent_span_id: Some(parent.parent_span_id),
                sampled: parent.sampled,
            },
            None => {
                let trace_id = new_trace_id();
                ResolvedTrace {
                    trace_id,
                    parent_span_id: None,
                    sampled: self.sampler.should_sample(trace_id),
                }
            }
        }
    }

    /// Span for one inbound request.
    pub fn make_span<B>(&self, request: &Request<B>) -> Span {
        let trace = self.resolve(request.headers());
        let span_id = new_span_id();
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        let span = tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
            trace_id = %format!("{:032x}", trace.trace_id),
            span_id = %format!("{:016x}", span_id),
            parent_span_id = tracing::field::Empty,
            sampled = trace.sampled,
            service = %self.service_name,
            command = %self.command,
        );
        if let Some(parent) = trace.parent_span_id {
            span.record("parent_span_id", format!("{:016x}", parent).as_str());
        }
        span
    }
}

fn parse_endpoint(host: &str) -> Result<Url, TracerError> {
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    let url = Url::parse(&candidate).map_err(|source| TracerError::InvalidEndpoint {
        endpoint: host.to_string(),
        source,
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TracerError::MissingHost(host.to_string()));
    }
    Ok(url)
}

fn new_trace_id() -> u128 {
    loop {
        let id: u128 = rand::random();
        if id != 0 {
            return id;
        }
    }
}

fn new_span_id() -> u64 {
    loop {
        let id: u64 = rand::random();
        if id != 0 {
            return id;
        }
    }
}
