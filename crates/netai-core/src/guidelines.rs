/// Diagram guidelines: single source of truth for the generation prompt and MCP instructions.
///
/// Each rule matches something the repair pipeline would otherwise have to fix after the fact.
pub const GUIDELINES: &str = "\
1. Start with `flowchart LR` or `flowchart TB` on its own line.\n\
2. Give every node a short, unique identifier (letters, digits, underscore) and put its display \
label in brackets: `FW1[Edge Firewall]`, `DB[(Primary Database)]`. Never reuse an identifier for a \
second node, even in a different subgraph: use `FW1` and `FW2`, not `FW` twice.\n\
3. Group tiers and sites with `subgraph Name` ... `end`. Close every subgraph you open.\n\
4. Connect nodes with plain arrows (`A --> B`). Put a link label in the form `A -->|HTTPS| B` \
only; never write `-->|label|>`.\n\
5. Do not use port or interface syntax on identifiers (`SW1:ge0`, `R1:eth1`). Mention interfaces \
in the node label instead.\n\
6. Use industry-standard layers where they apply: edge routers, firewalls, load balancers, \
application tiers, databases, monitoring.\n\
7. Keep each node definition and edge on a single line. Close every bracket on the line that \
opens it.\n\
8. Output Mermaid source only: no prose, no markdown fences.";
