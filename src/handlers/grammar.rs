//! Small `verb:params` grammar shared by the translating handlers.

use crate::error::DirectiveError;

/// A named preset: the request word and the fixed shell command it runs.
pub type Preset = (&'static str, &'static str);

/// Split `verb:params` at the first colon. Content without a colon is a bare
/// verb.
pub fn split_verb(content: &str) -> (&str, Option<&str>) {
    match content.split_once(':') {
        Some((verb, params)) => (verb.trim(), Some(params.trim())),
        None => (content.trim(), None),
    }
}

pub fn find_preset(table: &[Preset], name: &str) -> Option<Preset> {
    table.iter().copied().find(|(key, _)| *key == name)
}

/// Preset names, sorted and comma-separated.
pub fn preset_names(table: &[Preset]) -> String {
    let mut names: Vec<&str> = table.iter().map(|(key, _)| *key).collect();
    names.sort_unstable();
    names.join(", ")
}

/// A non-empty parameter, or a usage error naming `usage`.
pub fn required<'a>(params: &'a str, usage: &str) -> Result<&'a str, DirectiveError> {
    if params.is_empty() {
        return Err(DirectiveError::MalformedSubcommand(format!(
            "Missing parameter. Use {usage}"
        )));
    }
    Ok(params)
}

/// Like [`required`], but also rejects a value that a tool would read as
/// an option.
pub fn operand<'a>(params: &'a str, usage: &str) -> Result<&'a str, DirectiveError> {
    let value = required(params, usage)?;
    if value.starts_with('-') {
        return Err(DirectiveError::MalformedSubcommand(format!(
            "Parameter must not start with '-'. Use {usage}"
        )));
    }
    Ok(value)
}

/// Make a path operand safe to place where options are still parsed.
pub fn path_operand(path: &str) -> std::borrow::Cow<'_, str> {
    if path.starts_with('-') {
        format!("./{path}").into()
    } else {
        path.into()
    }
}

/// Split `params` on single spaces into exactly `n` fields; the last field
/// keeps any remaining spaces.
pub fn fields(params: &str, n: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = params.splitn(n, ' ').collect();
    (parts.len() == n && parts.iter().all(|p| !p.is_empty())).then_some(parts)
}
