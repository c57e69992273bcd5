//! services/client/src/stores/fallback.rs
//!
//! Locally generated stand-ins used when the remote service is unreachable.

const ANALYSIS_POINTS: [&str; 4] = [
    "This appears to be a processed food item",
    "The sodium content seems high (over 20% daily value)",
    "Consider looking for alternatives with less added sugar",
    "The protein content is moderate",
];

/// Trailing note on every demo reply.
pub const BACKEND_UNAVAILABLE_NOTE: &str =
    "*Note: Backend server is not available. This is a demo response.*";

/// The canned nutrition analysis shown while the backend is down.
pub fn demo_reply(has_image: bool) -> String {
    let (subject, basis) = if has_image {
        ("the nutrition label you uploaded", "label information")
    } else {
        ("your question about nutrition", "details provided")
    };

    let points = ANALYSIS_POINTS
        .iter()
        .map(|point| format!("• {}", point))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "I can see {}. Based on the {}, here's my analysis:\n\n{}\n\n\
         Would you like me to suggest healthier alternatives or explain any specific nutritional aspects?\n\n{}",
        subject, basis, points, BACKEND_UNAVAILABLE_NOTE
    )
}
