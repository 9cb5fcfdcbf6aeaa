//! Fixed shell templates for each installable git hook, marker-delimited so
//! the installer can find, append, and remove its own section.

pub const HOOK_START_MARKER: &str = "# GRAPHITI_HOOK_START";
pub const HOOK_END_MARKER: &str = "# GRAPHITI_HOOK_END";

fn wrap(body: &str) -> String {
    format!("{HOOK_START_MARKER}\n{body}\n{HOOK_END_MARKER}\n")
}

/// The graphiti marker section for `hook_type`, including both markers.
pub fn section_for(hook_type: &str) -> String {
    match hook_type {
        "post-commit" => wrap(
            "SHA=$(git rev-parse HEAD)\n\
             mkdir -p \"$HOME/.graphiti\"\n\
             echo \"$SHA\" >> \"$HOME/.graphiti/pending_commits\" 2>/dev/null &",
        ),
        "pre-commit" => wrap(
            "if [ \"$GRAPHITI_SKIP\" = \"1\" ]; then exit 0; fi\n\
             graphiti capture --scan-staged --delta-only || exit 1",
        ),
        "post-merge" | "post-rewrite" => wrap("graphiti index --quiet &\ndisown 2>/dev/null || true"),
        "post-checkout" => wrap(
            "if [ \"$3\" = \"1\" ]; then\n\
             \tgraphiti index --quiet &\n\
             \tdisown 2>/dev/null || true\n\
             fi",
        ),
        other => wrap(&format!("# unsupported hook type: {other}")),
    }
}

/// A brand-new hook file for `hook_type`: shebang plus the graphiti section.
pub fn full_template(hook_type: &str) -> String {
    format!("#!/bin/sh\n\n{}", section_for(hook_type))
}
