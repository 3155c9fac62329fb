use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde_json::json;
use tracing::{debug, error};

use crate::metrics::RefreshMetrics;
use crate::rates::RatesCache;

pub const CURRENCIES_PATHS: [&str; 2] = ["/currencies", "/currencies.json"];
pub const METRICS_PATH: &str = "/metrics";

/// Header carrying the capture time of the served snapshot
pub const RATES_UPDATED_AT: HeaderName = HeaderName::from_static("x-rates-updated-at");

const JSON: &str = "application/json";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Routes one request against the current cache contents
pub async fn handle(method: &Method, path: &str, cache: &RatesCache, metrics: &RefreshMetrics) -> Response<Full<Bytes>> {
    debug!("{} {}", method, path);

    let known = CURRENCIES_PATHS.contains(&path) || path == METRICS_PATH;
    if !known {
        return error_response(StatusCode::NOT_FOUND, "not found");
    }

    if method != Method::GET {
        let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    if path == METRICS_PATH {
        return text_response(StatusCode::OK, PROMETHEUS_TEXT, metrics.render());
    }

    currencies(cache).await
}

async fn currencies(cache: &RatesCache) -> Response<Full<Bytes>> {
    let Some(view) = cache.get().await else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "currency rates are not available yet",
        );
    };

    let body = match serde_json::to_vec(view.calculated()) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize currencies: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    let mut response = text_response(StatusCode::OK, JSON, body);
    if let Ok(updated_at) = HeaderValue::from_str(&view.update_datetime().update_datetime) {
        response.headers_mut().insert(RATES_UPDATED_AT, updated_at);
    }

    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = json!({ "error": message }).to_string();
    text_response(status, JSON, body)
}

fn text_response(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    response
}
