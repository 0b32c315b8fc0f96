use alidisk::help::COMMANDS;
use alidisk::NameCache;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

pub struct AlidiskHelper {
    pub names: NameCache,
}

impl AlidiskHelper {
    pub fn new(names: NameCache) -> Self {
        Self { names }
    }
}

impl Completer for AlidiskHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(complete_line(&line[..pos], &self.names))
    }
}

/// Completes the last word of `line`: a verb when it is the first word,
/// otherwise a cached entry name. A word opened with `"` is completed and
/// closed; a bare name containing spaces gets quoted.
fn complete_line(line: &str, names: &NameCache) -> (usize, Vec<Pair>) {
    let (start, word, quoted) = find_word_start(line);
    let is_first_word = !quoted && !line[..start].contains(|c: char| !c.is_whitespace());

    if is_first_word {
        if word.is_empty() {
            return (start, Vec::new());
        }
        let verbs = COMMANDS
            .iter()
            .map(|c| c.name)
            .chain(["quit", "q"])
            .filter(|verb| verb.starts_with(word))
            .map(|verb| Pair {
                display: verb.to_string(),
                replacement: verb.to_string(),
            })
            .collect();
        return (start, verbs);
    }

    let completions = names
        .complete(word)
        .into_iter()
        .map(|name| {
            let replacement = if quoted {
                format!("{name}\"")
            } else if name.contains(char::is_whitespace) {
                format!("\"{name}\"")
            } else {
                name.clone()
            };
            Pair {
                display: name,
                replacement,
            }
        })
        .collect();
    (start, completions)
}

fn find_word_start(line: &str) -> (usize, &str, bool) {
    if line.matches('"').count() % 2 == 1 {
        if let Some(quote) = line.rfind('"') {
            return (quote + 1, &line[quote + 1..], true);
        }
    }
    let mut start = line.len();
    for (i, c) in line.char_indices().rev() {
        if c.is_whitespace() || c == '"' {
            break;
        }
        start = i;
    }
    (start, &line[start..], false)
}

impl Hinter for AlidiskHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for AlidiskHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for AlidiskHelper {}

impl Helper for AlidiskHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> NameCache {
        let names = NameCache::default();
        names.extend(["foo1", "foo2", "my file.txt", "bar"]);
        names
    }

    fn replacements(line: &str) -> (usize, Vec<String>) {
        let (start, pairs) = complete_line(line, &cache());
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn completes_verbs_then_names() {
        assert_eq!(replacements("up"), (0, vec!["upload".to_string()]));
        assert_eq!(replacements("rm fo"), (3, vec!["foo1".into(), "foo2".into()]));
        assert_eq!(replacements("mv foo1 b"), (8, vec!["bar".into()]));
    }

    #[test]
    fn quoted_words_are_closed() {
        assert_eq!(replacements("rm \"my f"), (4, vec!["my file.txt\"".into()]));
        assert_eq!(replacements("rm my"), (3, vec!["\"my file.txt\"".into()]));
    }
}
