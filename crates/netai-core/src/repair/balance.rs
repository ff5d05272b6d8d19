use super::{closes_block, opens_subgraph};

const BRACKET_PAIRS: [(char, char); 3] = [('[', ']'), ('(', ')'), ('{', '}')];

/// Drop truncated trailing lines and close any subgraph left open.
///
/// Blank lines are removed first. Trailing lines with more openers than closers in any
/// bracket class are dropped until the last line balances. Then one `end` is appended per
/// unclosed `subgraph`. Extra `end` lines are kept as they are.
pub fn balance_structure(input: &str) -> String {
    let mut lines: Vec<&str> = input.lines().filter(|l| !l.trim().is_empty()).collect();

    while let Some(last) = lines.last() {
        if is_balanced(last) {
            break;
        }
        tracing::debug!(line = %last, "dropping truncated line");
        lines.pop();
    }

    let open = open_blocks(&lines);
    if open > 0 {
        tracing::debug!(count = open, "closing unterminated subgraphs");
    }

    let mut out: Vec<&str> = lines;
    out.extend(std::iter::repeat("end").take(open));
    out.join("\n").trim().to_string()
}

fn is_balanced(line: &str) -> bool {
    BRACKET_PAIRS.iter().all(|&(open, close)| {
        let opened = line.chars().filter(|&c| c == open).count();
        let closed = line.chars().filter(|&c| c == close).count();
        opened <= closed
    })
}

/// Subgraphs still open after the last line. Stray `end`s never push this below zero.
fn open_blocks(lines: &[&str]) -> usize {
    lines.iter().fold(0usize, |open, line| {
        let trimmed = line.trim();
        if opens_subgraph(trimmed) {
            open + 1
        } else if closes_block(trimmed) {
            open.saturating_sub(1)
        } else {
            open
        }
    })
}
