//! Text normalization used before keyword matching

/// Markdown markers, longest first so `**` goes before `*`
const FORMATTING: [&str; 6] = ["```", "**", "__", "`", "*", "_"];

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'ä' | 'â' | 'á' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ö' | 'ô' | 'ó' => 'o',
        'ù' | 'ü' | 'û' | 'ú' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Lowercase, fold accents and drop formatting markers anywhere in the text
pub fn sanitize(text: &str) -> String {
    let mut out: String = text.to_lowercase().chars().map(fold_accent).collect();
    for marker in FORMATTING {
        out = out.replace(marker, "");
    }
    out
}

/// Lowercase and trim formatting markers from both ends only.
///
/// Keeps inner underscores, so `*reply_in_thread*` becomes `reply_in_thread`.
pub fn strip_formatting(text: &str) -> String {
    let mut out = text.trim().to_lowercase();
    loop {
        let before = out.len();
        for marker in FORMATTING {
            if let Some(rest) = out.strip_prefix(marker) {
                out = rest.to_string();
            }
            if let Some(rest) = out.strip_suffix(marker) {
                out = rest.to_string();
            }
        }
        if out.len() == before {
            return out;
        }
    }
}

/// Sanitized words of a text, split on whitespace
pub fn words(text: &str) -> Vec<String> {
    sanitize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Sentence punctuation that may stick to a word
const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '"', '\''];

/// Words used for keyword matching: sanitized, with punctuation trimmed from each end
pub fn match_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .map(|w| w.trim_matches(PUNCTUATION).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Canonical form of a trigger phrase; empty when nothing matchable is left
pub fn normalize_trigger(trigger: &str) -> String {
    match_words(trigger).join(" ")
}
