use unicode_segmentation::UnicodeSegmentation;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Grapheme-safe truncation for card excerpts. Counting graphemes rather
/// than bytes or chars keeps combined Arabic forms and emoji intact.
pub fn excerpt(input: &str, max_graphemes: usize) -> String {
    let normalized = normalize_text(input);
    let graphemes: Vec<&str> = normalized.graphemes(true).collect();

    if graphemes.len() <= max_graphemes {
        return normalized;
    }

    let mut truncated: String = graphemes[..max_graphemes].concat();
    truncated.push('…');
    truncated
}
