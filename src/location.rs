use std::fmt;

use reqwest::Url;
use serde::Serialize;

/// The view a related-events listing is shown from. Decides how rows link out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationContext {
    Discover,
    Issues,
    Performance,
}

impl LocationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationContext::Discover => "discover",
            LocationContext::Issues => "issues",
            LocationContext::Performance => "performance",
        }
    }
}

impl fmt::Display for LocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map `/organizations/<slug>/<segment>/...` to a context. Every input maps
/// to something; Performance is the fallback.
pub fn resolve_location(path: &str) -> LocationContext {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());

    let context = match (segments.next(), segments.next(), segments.next()) {
        (Some("organizations"), Some(_), Some("discover")) => LocationContext::Discover,
        (Some("organizations"), Some(_), Some("issues")) => LocationContext::Issues,
        _ => LocationContext::Performance,
    };
    tracing::debug!(path, %context, "resolved location");
    context
}

/// Accept either a bare path or a full app URL and return the path part.
pub fn location_path(input: &str) -> String {
    let input = input.trim();
    if input.contains("://") {
        if let Ok(url) = Url::parse(input) {
            return url.path().to_string();
        }
    }
    input.to_string()
}
