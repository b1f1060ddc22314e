//! Route keys and metrics-endpoint matching.

/// Build the aggregation key for a request: `"METHOD /path"`, method
/// uppercased, query string stripped. Missing pieces default to
/// `GET` and `/`.
pub fn route_key(method: Option<&str>, target: Option<&str>) -> String {
    let method = method.unwrap_or("GET").to_uppercase();
    let target = target.filter(|t| !t.is_empty()).unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/");
    let path = if path.is_empty() { "/" } else { path };
    format!("{method} {path}")
}

/// True when the request is a GET whose path matches the metrics route,
/// trailing slashes ignored.
pub fn is_metrics_request(method: Option<&str>, target: Option<&str>, metrics_route: &str) -> bool {
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return false;
    };
    if !method.unwrap_or("GET").eq_ignore_ascii_case("GET") {
        return false;
    }
    let path = target.split('?').next().unwrap_or("/");
    normalize(path) == normalize(metrics_route)
}

/// Strip trailing slashes, keeping "/" for the root (and for paths that
/// were nothing but slashes).
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
