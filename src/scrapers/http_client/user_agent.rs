//! User agent and the client-hint headers that must agree with it.
//!
//! Clearance cookies are bound to the browser that earned them, so the
//! header set we send is derived from whatever user agent is configured.

/// Desktop Edge on Windows.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36 Edg/140.0.0.0";

/// Resolve the configured user agent, falling back to the default.
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config.map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => DEFAULT_USER_AGENT.to_string(),
    }
}

/// Browser family as far as client hints care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    Edge,
    Chrome,
    Other,
}

impl BrowserFamily {
    pub fn detect(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("edg/") || ua.contains("edge/") {
            Self::Edge
        } else if ua.contains("chrome/") {
            Self::Chrome
        } else {
            Self::Other
        }
    }

    /// `Sec-CH-UA` brand list.
    pub fn client_hint_brands(self) -> &'static str {
        match self {
            Self::Edge => r#""Chromium";v="140", "Microsoft Edge";v="140", "Not=A?Brand";v="24""#,
            Self::Chrome => r#""Chromium";v="140", "Google Chrome";v="140", "Not=A?Brand";v="24""#,
            Self::Other => r#""Not.A/Brand";v="99", "Chromium";v="140""#,
        }
    }
}

/// `Sec-CH-UA-Platform` value for a user agent.
pub fn client_hint_platform(user_agent: &str) -> &'static str {
    if user_agent.contains("Macintosh") || user_agent.contains("Mac OS X") {
        r#""macOS""#
    } else if user_agent.contains("Linux") && !user_agent.contains("Android") {
        r#""Linux""#
    } else {
        r#""Windows""#
    }
}

/// Navigation headers a desktop browser sends for a same-origin page load.
///
/// `Accept-Encoding` deliberately omits `br` and `zstd`; the client only
/// decodes gzip and deflate.
pub fn browser_headers(user_agent: &str) -> Vec<(&'static str, String)> {
    let family = BrowserFamily::detect(user_agent);
    vec![
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language", "en-US,en;q=0.9".to_string()),
        ("Accept-Encoding", "gzip, deflate".to_string()),
        ("Upgrade-Insecure-Requests", "1".to_string()),
        ("DNT", "1".to_string()),
        ("Sec-Fetch-Site", "same-origin".to_string()),
        ("Sec-Fetch-Mode", "navigate".to_string()),
        ("Sec-Fetch-Dest", "document".to_string()),
        ("Sec-CH-UA", family.client_hint_brands().to_string()),
        ("Sec-CH-UA-Mobile", "?0".to_string()),
        ("Sec-CH-UA-Platform", client_hint_platform(user_agent).to_string()),
    ]
}
