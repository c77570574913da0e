use once_cell::sync::Lazy;
use regex::Regex;

// Bookmaker deep links come back with templated host labels, e.g.
// `https://sportsbook.{state}.betmgm.com/...`
static STATE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}\.").expect("valid regex"));
static PREFIXED_STATE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+\.\{[^}]*\}\.").expect("valid regex"));

/// Strip templated `{...}.` host labels from a bookmaker link
pub fn clean_sports_link(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let without_labels = STATE_LABEL.replace_all(url, "");
    PREFIXED_STATE_LABEL
        .replace_all(&without_labels, "")
        .into_owned()
}
