use regex::Regex;
use std::sync::OnceLock;

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Normalizes a title or path segment into a problem slug.
///
/// Lower-cases, collapses each run of non-alphanumeric characters into a single
/// `-` and trims separators from both ends. Lossy by nature: "Two Sum" and
/// "two-sum" map to the same slug.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    separator_runs()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Turns a slug back into a display title ("two-sum" -> "Two Sum").
pub fn title_from_slug(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
