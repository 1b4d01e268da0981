//! Tag extraction from model output.
//!
//! Canonical tags are `<name>content</name>` or `<mcp:name>content</mcp:name>`.
//! A span closes at the first matching closing tag, so a nested span with the
//! same name ends early. An opening tag with no closing tag yields nothing.
//!
//! The legacy aliases `<system>` and `<s>` are routed to `terminal`. They are
//! collected in a second pass and appended after every canonical tag. Alias
//! names match in any case, like canonical names.

use super::Command;
use regex::Regex;
use std::sync::LazyLock;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:mcp:)?[A-Za-z_][A-Za-z0-9_]*>").expect("open tag regex is valid")
});

const NAMESPACE: &str = "mcp:";

/// Legacy tag names, in the order their matches are appended.
pub const LEGACY_ALIASES: &[&str] = &["system", "s"];

/// Protocol every legacy alias maps to.
pub const LEGACY_PROTOCOL: &str = "terminal";

/// Stateless tag parser. Parsing the same text twice yields the same
/// sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagParser;

impl TagParser {
    pub fn new() -> Self {
        Self
    }

    /// Lazily scan `text` for directives.
    pub fn parse<'a>(&self, text: &'a str) -> Directives<'a> {
        Directives {
            text,
            phase: Phase::Canonical { pos: 0 },
        }
    }

    pub fn parse_all(&self, text: &str) -> Vec<Command> {
        self.parse(text).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Canonical { pos: usize },
    Legacy { alias: usize, pos: usize },
    Done,
}

/// Iterator over the directives in one text. A clone continues
/// independently from the current position.
#[derive(Debug, Clone)]
pub struct Directives<'a> {
    text: &'a str,
    phase: Phase,
}

impl Directives<'_> {
    fn next_canonical(&mut self, mut pos: usize) -> Option<Command> {
        while let Some(open) = OPEN_TAG.find_at(self.text, pos) {
            let inner = &open.as_str()[1..open.as_str().len() - 1];
            let (namespaced, name) = match inner.strip_prefix(NAMESPACE) {
                Some(name) => (true, name),
                None => (false, inner),
            };
            if !namespaced && is_alias(name) {
                pos = open.end();
                continue;
            }
            let close = format!("</{inner}>");
            match self.text[open.end()..].find(&close) {
                Some(offset) => {
                    let body_end = open.end() + offset;
                    self.phase = Phase::Canonical {
                        pos: body_end + close.len(),
                    };
                    return Some(Command::new(
                        name.to_ascii_lowercase(),
                        self.text[open.end()..body_end].trim(),
                    ));
                }
                None => pos = open.end(),
            }
        }
        self.phase = Phase::Legacy { alias: 0, pos: 0 };
        None
    }

    fn next_legacy(&mut self, alias: usize, pos: usize) -> Option<Command> {
        let name = LEGACY_ALIASES.get(alias)?;
        let open = format!("<{name}>");
        // ASCII lowercasing keeps byte offsets, so matches map back 1:1.
        let folded = self.text.to_ascii_lowercase();
        let mut cursor = pos;
        while let Some(offset) = folded[cursor..].find(&open) {
            let open_start = cursor + offset;
            let body_start = open_start + open.len();
            // Closed by the same spelling it was opened with, as canonical tags are.
            let close = format!("</{}", &self.text[open_start + 1..body_start]);
            match self.text[body_start..].find(&close) {
                Some(len) => {
                    self.phase = Phase::Legacy {
                        alias,
                        pos: body_start + len + close.len(),
                    };
                    return Some(Command::new(
                        LEGACY_PROTOCOL,
                        self.text[body_start..body_start + len].trim(),
                    ));
                }
                None => cursor = body_start,
            }
        }
        self.phase = Phase::Legacy {
            alias: alias + 1,
            pos: 0,
        };
        None
    }
}

impl Iterator for Directives<'_> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        loop {
            match self.phase {
                Phase::Canonical { pos } => {
                    if let Some(command) = self.next_canonical(pos) {
                        return Some(command);
                    }
                }
                Phase::Legacy { alias, .. } if alias >= LEGACY_ALIASES.len() => {
                    self.phase = Phase::Done;
                }
                Phase::Legacy { alias, pos } => {
                    if let Some(command) = self.next_legacy(alias, pos) {
                        return Some(command);
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

impl std::iter::FusedIterator for Directives<'_> {}

fn is_alias(name: &str) -> bool {
    LEGACY_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<(String, String)> {
        TagParser::new()
            .parse(text)
            .map(|c| (c.protocol, c.content))
            .collect()
    }

    fn pair(protocol: &str, content: &str) -> (String, String) {
        (protocol.to_string(), content.to_string())
    }

    #[test]
    fn extracts_tags_in_order() {
        let text = "First <terminal> ls -la /tmp </terminal> then\n<memory>save:a=1</memory>.";
        assert_eq!(
            parse(text),
            vec![pair("terminal", "ls -la /tmp"), pair("memory", "save:a=1")]
        );
    }

    #[test]
    fn namespaced_tags_are_accepted_and_lowercased() {
        assert_eq!(
            parse("<mcp:Terminal>pwd</mcp:Terminal>"),
            vec![pair("terminal", "pwd")]
        );
    }

    #[test]
    fn mismatched_namespace_does_not_close() {
        assert!(parse("<mcp:files>list:.</files>").is_empty());
    }

    #[test]
    fn multiline_content_is_kept() {
        assert_eq!(
            parse("<terminal>\necho a\necho b\n</terminal>"),
            vec![pair("terminal", "echo a\necho b")]
        );
    }

    #[test]
    fn unterminated_tag_yields_nothing_but_later_tags_parse() {
        assert!(parse("<terminal>ls").is_empty());
        assert_eq!(
            parse("<terminal>ls <memory>list</memory>"),
            vec![pair("memory", "list")]
        );
    }

    #[test]
    fn nested_same_name_closes_at_first_close() {
        assert_eq!(
            parse("<terminal>a <terminal>b</terminal> c</terminal>"),
            vec![pair("terminal", "a <terminal>b")]
        );
    }

    #[test]
    fn legacy_aliases_route_to_terminal_after_canonical_tags() {
        let text = "<s>whoami</s> <system>uname</system> <state>uptime</state> <s>id</s>";
        assert_eq!(
            parse(text),
            vec![
                pair("state", "uptime"),
                pair("terminal", "uname"),
                pair("terminal", "whoami"),
                pair("terminal", "id"),
            ]
        );
    }

    #[test]
    fn legacy_aliases_match_in_any_case() {
        assert_eq!(
            parse("<S>ls</S> <System>id</System> <SYSTEM>pwd</system>"),
            vec![pair("terminal", "id"), pair("terminal", "ls")]
        );
    }

    #[test]
    fn namespaced_alias_is_a_canonical_protocol() {
        assert_eq!(
            parse("<mcp:system>x</mcp:system>"),
            vec![pair("system", "x")]
        );
    }

    #[test]
    fn non_identifier_tags_are_ignored() {
        assert!(parse("<1abc>x</1abc> <a-b>y</a-b> <>z</>").is_empty());
        assert!(parse("plain text, a < b > c").is_empty());
    }

    #[test]
    fn parsing_is_idempotent_and_clone_forks() {
        let text = "<network>dns</network><terminal>pwd</terminal><s>ls</s>";
        let parser = TagParser::new();
        assert_eq!(parser.parse_all(text), parser.parse_all(text));

        let mut iter = parser.parse(text);
        iter.next();
        let rest: Vec<_> = iter.clone().collect();
        assert_eq!(rest, iter.collect::<Vec<_>>());
        assert_eq!(rest.len(), 2);
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn well_formed_tags_come_back_in_order(
                tags in proptest::collection::vec(
                    (
                        proptest::string::string_regex("[a-r][a-z]{1,8}").expect("regex"),
                        proptest::string::string_regex("[a-z0-9 ./:=-]{0,24}").expect("regex"),
                    ),
                    0..8
                ),
                filler in proptest::string::string_regex("[A-Za-z ,.]{0,12}").expect("regex"),
            ) {
                let mut text = String::new();
                for (name, body) in &tags {
                    text.push_str(&filler);
                    text.push_str(&format!("<{name}>{body}</{name}>"));
                }
                let parsed = TagParser::new().parse_all(&text);
                let expected: Vec<Command> = tags
                    .iter()
                    .map(|(name, body)| Command::new(name.clone(), body.trim()))
                    .collect();
                prop_assert_eq!(&parsed, &expected);
                prop_assert_eq!(parsed, TagParser::new().parse_all(&text));
            }
        }
    }
}
