//! Relocation of qualified names inside text resources.

use super::rules::RuleSet;

/// Extensions of resources scanned for qualified names.
const TEXT_EXTENSIONS: &[&str] = &[
    "properties",
    "xml",
    "json",
    "conf",
    "txt",
    "MF",
    "handlers",
    "schemas",
    "yaml",
    "yml",
];

/// Returns `true` when `path` names a text resource worth scanning.
pub(crate) fn is_text_resource(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, extension)| !stem.is_empty() && TEXT_EXTENSIONS.contains(&extension))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '/')
}

/// Relocate one maximal run of name characters.
///
/// Leading slashes (absolute resource paths) and trailing separators
/// (sentence full stops, directory slashes) are not part of the name.
fn relocate_token(token: &str, rules: &RuleSet) -> Option<String> {
    let unrooted = token.trim_start_matches('/');
    let leader = token.get(..token.len() - unrooted.len()).unwrap_or_default();
    let name = unrooted.trim_end_matches(['.', '/']);
    let trailer = unrooted.get(name.len()..).unwrap_or_default();
    let relocated = rules
        .relocate_name(name, '.')
        .or_else(|| rules.relocate_name(name, '/'))?;
    Some(format!("{leader}{relocated}{trailer}"))
}

/// Rewrite dotted and slashed qualified names in `text`.
///
/// A name only matches where it starts a token, so `xcom.google.Foo` is left
/// alone. Returns `None` when nothing changed.
pub(crate) fn relocate_text(text: &str, rules: &RuleSet) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut rest = text;
    while !rest.is_empty() {
        let start = rest.find(is_name_char).unwrap_or(rest.len());
        let (gap, tail) = rest.split_at(start);
        out.push_str(gap);
        let end = tail.find(|c| !is_name_char(c)).unwrap_or(tail.len());
        let (token, remainder) = tail.split_at(end);
        match relocate_token(token, rules) {
            Some(relocated) => {
                out.push_str(&relocated);
                changed = true;
            }
            None => out.push_str(token),
        }
        rest = remainder;
    }
    changed.then_some(out)
}
