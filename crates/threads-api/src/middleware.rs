//! Request logging and CORS for the JSON API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// remote-ip "request-line" status-code response-size "referrer" "user-agent" plus
/// the caller id, when present.
pub fn standard_middleware() -> Logger {
    Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" user=%{X-User-Id}i %Dms"#)
}

pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}
