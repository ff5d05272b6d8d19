use netai_core::DiagramRequest;

pub fn system_prompt() -> String {
    format!(
        "You are a senior network architect. Generate a clear Mermaid flowchart diagram \
for the requested network architecture. Use industry-standard components and labels \
(edge routers, firewalls, load balancers, app tiers, databases, monitoring). \
Prefer flowchart LR or TB. Return only Mermaid code without fences.\n\n\
## Diagram Guidelines\n{}",
        netai_core::guidelines::GUIDELINES
    )
}

/// Render the request as the sectioned user message. Empty sections read `None`.
pub fn user_message(request: &DiagramRequest) -> String {
    let context = request
        .context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("None");

    let constraints = if request.constraints.is_empty() {
        "None".to_string()
    } else {
        request
            .constraints
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Requirements:\n{}\n\n\
Context:\n{}\n\n\
Constraints:\n{}\n\n\
Output:\n\
Mermaid flowchart only.",
        request.requirements, context, constraints
    )
}
