//! Anti-bot interstitial detection.
//!
//! We never try to get past a challenge; we only recognize one so it is not
//! mistaken for an empty listing.

/// Lowercase phrases that mark a bot-verification page.
const CHALLENGE_MARKERS: &[&str] = &[
    "verifying you are human",
    "please enable javascript",
    "checking your browser",
    "captcha",
    "access denied",
    "cloudflare",
    "just a moment",
];

/// Return true if the body looks like an anti-bot challenge.
pub fn is_challenge(body: &str) -> bool {
    let lower = body.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
}
