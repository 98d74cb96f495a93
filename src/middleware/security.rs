use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::{env, sync::OnceLock};

/// Media under `/uploads` is embedded by a frontend on another origin.
const DEFAULT_CORP_POLICY: &str = "cross-origin";

#[derive(Debug, Clone)]
struct SecurityHeadersConfig {
    corp: HeaderValue,
}

impl SecurityHeadersConfig {
    fn from_env() -> Self {
        let raw = env::var("CORP_POLICY").unwrap_or_else(|_| DEFAULT_CORP_POLICY.to_string());
        let corp = match raw.trim() {
            "same-origin" => "same-origin",
            "same-site" => "same-site",
            "cross-origin" => "cross-origin",
            other => {
                tracing::warn!(
                    "Invalid CORP_POLICY value '{}', falling back to {}",
                    other,
                    DEFAULT_CORP_POLICY
                );
                DEFAULT_CORP_POLICY
            }
        };

        Self {
            corp: HeaderValue::from_static(corp),
        }
    }
}

fn security_headers_config() -> &'static SecurityHeadersConfig {
    static CONFIG: OnceLock<SecurityHeadersConfig> = OnceLock::new();
    CONFIG.get_or_init(SecurityHeadersConfig::from_env)
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let config = security_headers_config();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("cross-origin-resource-policy", config.corp.clone());

    response
}
