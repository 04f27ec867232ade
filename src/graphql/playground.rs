//! Embedded GraphQL playground page.

/// The playground HTML with its `{{apiURL}}` placeholder filled from the
/// request's own URL.
pub fn playground_html(api_url: &str) -> String {
    include_str!("playground.html").replace("{{apiURL}}", api_url)
}
