use once_cell::sync::Lazy;
use regex::Regex;

/// `word:token`. Matches any such pair, including times like `12:30` inside labels.
static RE_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w):\w+").expect("port pattern is valid"));

/// `-->|label|>` with exactly that closing `|>`.
static RE_EDGE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-->\|[^|\n]*\|>").expect("edge label pattern is valid"));

/// Remove `:port` suffixes such as `SW1:ge0` -> `SW1`.
pub fn strip_ports(input: &str) -> String {
    RE_PORT.replace_all(input, "${1}").into_owned()
}

/// Replace `-->|label|>` with a bare `-->`. Other arrow forms are left alone.
pub fn strip_edge_labels(input: &str) -> String {
    RE_EDGE_LABEL.replace_all(input, "-->").into_owned()
}
