const QUERY_MARKERS: [&str; 2] = ["?v=", "&v="];
const SHORT_LINK_MARKER: &str = "youtu.be/";

/// Derive the video identifier from a watch URL (`...?v=<id>[&...]`) or a short
/// link (`.../youtu.be/<id>[?...]`). Returns `None` for anything else.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    let from_query = QUERY_MARKERS.iter().find_map(|marker| {
        trimmed
            .find(marker)
            .map(|idx| cut_at(&trimmed[idx + marker.len()..], &['&', '#']))
    });
    let from_short_link = || {
        trimmed
            .find(SHORT_LINK_MARKER)
            .map(|idx| cut_at(&trimmed[idx + SHORT_LINK_MARKER.len()..], &['?', '&', '/', '#']))
    };

    from_query
        .or_else(from_short_link)
        .filter(|id| is_plausible_id(id))
        .map(ToOwned::to_owned)
}

fn cut_at<'a>(rest: &'a str, terminators: &[char]) -> &'a str {
    match rest.find(terminators) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn is_plausible_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}
