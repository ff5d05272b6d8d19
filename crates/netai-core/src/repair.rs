//! Repair of raw LLM output into renderable Mermaid flowchart source.
//!
//! The passes are plain text transformations. Nothing here parses Mermaid; each pass
//! targets one failure mode seen in model output:
//!
//! - node identifiers reused across sections (`FW` defined in every site)
//! - port suffixes (`SW1:ge0`) and `-->|label|>` arrows that renderers reject
//! - generations cut off mid-line, and subgraphs that were never closed
//!
//! Order matters: deduplication must see identifiers before port stripping
//! reshapes adjacent tokens, and balancing runs last because the earlier passes
//! can change bracket counts.

mod balance;
mod dedupe;
mod strip;

pub use balance::balance_structure;
pub use dedupe::dedupe_node_ids;
pub use strip::{strip_edge_labels, strip_ports};

/// Run every repair pass over `raw` and return diagram source that is safe to render.
///
/// Never fails. Input that is entirely truncated or blank comes back as an empty string.
pub fn sanitize(raw: &str) -> String {
    let s = dedupe_node_ids(raw);
    let s = strip_ports(&s);
    let s = strip_edge_labels(&s);
    balance_structure(&s)
}

/// Whether a trimmed line opens a subgraph block.
pub(crate) fn opens_subgraph(trimmed: &str) -> bool {
    trimmed.starts_with("subgraph")
}

/// Whether a trimmed line closes a subgraph block.
pub(crate) fn closes_block(trimmed: &str) -> bool {
    trimmed == "end"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_a_typical_generation() {
        let raw = "\
flowchart LR
subgraph Site A
FW[Firewall] --> LB[Load Balancer]
LB -->|eth1|> APP:8080
end
subgraph Site B
FW[Firewall] --> LB[Load Balancer]
LB --> DB[(Postgres)]

subgraph Monitoring
MON[Prometheus";

        let expected = "\
flowchart LR
subgraph Site A
FW[Firewall] --> LB[Load Balancer]
LB --> APP
end
subgraph Site B
FW_2[Firewall] --> LB_2[Load Balancer]
LB_2 --> DB[(Postgres)]
subgraph Monitoring
end
end";

        assert_eq!(sanitize(raw), expected);
    }

    #[test]
    fn sanitized_output_is_stable() {
        let raw = "flowchart TB\nA[x] --> B[y]\nA[z]\nsubgraph Core\nC{c}";
        let once = sanitize(raw);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn blank_input_stays_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("\n  \n\t\n"), "");
    }

    #[test]
    fn fully_truncated_input_is_empty() {
        assert_eq!(sanitize("A[one\nB(two"), "");
    }
}
