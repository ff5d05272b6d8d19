use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{closes_block, opens_subgraph};

/// Maximal runs of identifier characters. Whole-word matching falls out of working on
/// these runs: `FW` never matches inside `FW_EDGE`.
static WORD_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("word-run pattern is valid"));

/// Rename node identifiers that are defined more than once.
///
/// The first definition of an identifier keeps its name; later ones become
/// `ID_2`, `ID_3`, ... (first name not used anywhere yet). Inside a subgraph the rename
/// is remembered until the block ends, so later edges in the same block follow it.
/// Line count and all non-identifier text are preserved.
pub fn dedupe_node_ids(input: &str) -> String {
    let mut scope = Scope::default();
    input
        .split('\n')
        .map(|line| scope.process_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-call state threaded through the line pass.
#[derive(Default)]
struct Scope {
    /// Every identifier handed out so far, original or renamed.
    seen: HashSet<String>,
    /// Renames made in the current subgraph block.
    remap: HashMap<String, String>,
    in_subgraph: bool,
}

#[derive(Debug)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    is_definition: bool,
}

#[derive(Debug)]
struct Definition<'a> {
    token: usize,
    original: &'a str,
    name: String,
}

impl Scope {
    fn process_line(&mut self, line: &str) -> String {
        let trimmed = line.trim();
        if opens_subgraph(trimmed) {
            self.remap.clear();
            self.in_subgraph = true;
        } else if closes_block(trimmed) {
            self.remap.clear();
            self.in_subgraph = false;
        }

        let line: Cow<'_, str> = if self.in_subgraph && !self.remap.is_empty() {
            let tokens = tokenize(line);
            Cow::Owned(splice(line, &tokens, |_, tok| {
                self.remap.get(tok.text).map(String::as_str)
            }))
        } else {
            Cow::Borrowed(line)
        };

        let tokens = tokenize(&line);
        let mut defs = Vec::new();
        for (idx, tok) in tokens.iter().enumerate().filter(|(_, t)| t.is_definition) {
            let name = self.claim(tok.text);
            defs.push(Definition {
                token: idx,
                original: tok.text,
                name,
            });
        }

        if defs.iter().all(|d| d.name == d.original) {
            return line.into_owned();
        }

        splice(&line, &tokens, |idx, tok| {
            if tok.is_definition {
                defs.iter()
                    .find(|d| d.token == idx)
                    .map(|d| d.name.as_str())
            } else {
                resolve_reference(&defs, idx, tok.text)
            }
        })
    }

    /// Reserve a name for a definition of `ident`, renaming it if it is taken.
    fn claim(&mut self, ident: &str) -> String {
        if self.seen.insert(ident.to_string()) {
            return ident.to_string();
        }

        let renamed = self.next_free(ident);
        self.seen.insert(renamed.clone());
        if self.in_subgraph {
            self.remap.insert(ident.to_string(), renamed.clone());
        }
        renamed
    }

    fn next_free(&self, ident: &str) -> String {
        let mut n = 2u64;
        loop {
            let candidate = format!("{ident}_{n}");
            if !self.seen.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Identifier tokens on a line, flagging the ones directly followed by a shape opener.
fn tokenize(line: &str) -> Vec<Token<'_>> {
    WORD_RUN
        .find_iter(line)
        .filter(|m| !m.as_str().starts_with(|c: char| c.is_ascii_digit()))
        .map(|m| Token {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
            is_definition: matches!(line[m.end()..].chars().next(), Some('(' | '[' | '{')),
        })
        .collect()
}

/// A plain reference follows the nearest definition of the same identifier to its left,
/// or the first one on the line when it comes before all of them.
fn resolve_reference<'d>(defs: &'d [Definition<'_>], idx: usize, text: &str) -> Option<&'d str> {
    let mut same = defs.iter().filter(|d| d.original == text);
    let first = same.clone().next()?;
    let def = same.rfind(|d| d.token < idx).unwrap_or(first);
    Some(def.name.as_str())
}

/// Rebuild `line`, replacing each token for which `rename` yields a new name.
fn splice<'r, F>(line: &str, tokens: &[Token<'_>], rename: F) -> String
where
    F: Fn(usize, &Token<'_>) -> Option<&'r str>,
{
    let mut out = String::with_capacity(line.len() + 8);
    let mut last = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        if let Some(name) = rename(idx, tok).filter(|name| *name != tok.text) {
            out.push_str(&line[last..tok.start]);
            out.push_str(name);
            last = tok.end;
        }
    }
    out.push_str(&line[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_second_definition() {
        assert_eq!(dedupe_node_ids("A[x]\nA[y]"), "A[x]\nA_2[y]");
    }

    #[test]
    fn skips_suffixes_already_taken() {
        assert_eq!(
            dedupe_node_ids("A[x]\nA_2[y]\nA[z]"),
            "A[x]\nA_2[y]\nA_3[z]"
        );
    }

    #[test]
    fn generated_name_can_collide_with_later_definition() {
        assert_eq!(
            dedupe_node_ids("A[x]\nA[y]\nA_2[z]"),
            "A[x]\nA_2[y]\nA_2_2[z]"
        );
    }

    #[test]
    fn subgraph_rename_follows_later_references() {
        let input = "\
subgraph North
FW[Firewall] --> CORE[Core]
end
subgraph South
FW[Firewall]
FW --> SW[Switch]
end
FW --> X[Exit]";
        let expected = "\
subgraph North
FW[Firewall] --> CORE[Core]
end
subgraph South
FW_2[Firewall]
FW_2 --> SW[Switch]
end
FW --> X[Exit]";
        assert_eq!(dedupe_node_ids(input), expected);
    }

    #[test]
    fn whole_word_only() {
        assert_eq!(
            dedupe_node_ids("LB[lb]\nLB[lb2] --> LB_EDGE --> XLB"),
            "LB[lb]\nLB_2[lb2] --> LB_EDGE --> XLB"
        );
    }

    #[test]
    fn reference_on_definition_line_is_rewritten() {
        assert_eq!(
            dedupe_node_ids("DB[(one)]\nAPP --> DB[(two)] --> DB"),
            "DB[(one)]\nAPP --> DB_2[(two)] --> DB_2"
        );
    }

    #[test]
    fn reference_before_definition_on_same_line_follows_it() {
        assert_eq!(
            dedupe_node_ids("R[r]\nR --> R[edge]"),
            "R[r]\nR_2 --> R_2[edge]"
        );
    }

    #[test]
    fn same_line_repeat_gets_distinct_names() {
        assert_eq!(
            dedupe_node_ids("A[x] --> A[y] --> A"),
            "A[x] --> A_2[y] --> A_2"
        );
    }

    #[test]
    fn global_rename_does_not_leak_to_later_lines() {
        assert_eq!(
            dedupe_node_ids("A[x]\nA[y]\nA --> B[b]"),
            "A[x]\nA_2[y]\nA --> B[b]"
        );
    }

    #[test]
    fn nested_subgraph_resets_remap() {
        let input = "\
N[n]
subgraph Outer
N[n again]
subgraph Inner
N --> Q[q]
end
end";
        let out = dedupe_node_ids(input);
        assert!(out.contains("N_2[n again]"));
        assert!(out.contains("\nN --> Q[q]\n"));
    }

    #[test]
    fn preserves_line_count_and_blank_lines() {
        let input = "A[x]\n\n  \nA[y]\n";
        let out = dedupe_node_ids(input);
        assert_eq!(out, "A[x]\n\n  \nA_2[y]\n");
        assert_eq!(out.split('\n').count(), input.split('\n').count());
    }

    #[test]
    fn subgraph_identifier_counts_as_definition() {
        assert_eq!(
            dedupe_node_ids("DC[DC]\nsubgraph DC[Data Center]\nend"),
            "DC[DC]\nsubgraph DC_2[Data Center]\nend"
        );
    }

    #[test]
    fn output_is_fixed_point() {
        let once = dedupe_node_ids("A[x]\nsubgraph S\nA[y]\nA --> A[z]\nend\nA(w)");
        assert_eq!(dedupe_node_ids(&once), once);
    }
}
