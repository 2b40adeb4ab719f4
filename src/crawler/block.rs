//! Anti-bot challenge detection
//!
//! Challenge pages come back as HTTP 200, so they are recognized by content.

/// Case-insensitive markers counted in the page body
pub const BLOCK_MARKERS: &[&str] = &[
    "attention required!",
    "cf-challenge",
    "verify you are a human",
    "captcha",
    "access denied",
    "temporarily unavailable",
];

/// Number of distinct markers that flags a page as blocked
pub const BLOCK_MARKER_THRESHOLD: usize = 2;

/// Marker that flags a page as blocked on its own
pub const DECISIVE_MARKER: &str = "cf-challenge";

/// Returns true if the page looks like an anti-bot challenge
///
/// Heuristic: at least `BLOCK_MARKER_THRESHOLD` distinct markers, or the
/// decisive Cloudflare marker alone. Product pages that mention "captcha"
/// once in a form are not blocked.
pub fn detect_block_page(html: &str) -> bool {
    let lowered = html.to_lowercase();
    if lowered.contains(DECISIVE_MARKER) {
        return true;
    }

    let score = BLOCK_MARKERS
        .iter()
        .filter(|marker| lowered.contains(*marker))
        .count();
    score >= BLOCK_MARKER_THRESHOLD
}
