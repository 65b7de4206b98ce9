//! Operator-facing text for command results.

use lgrelay_core::RelayError;

use crate::registry::{PeerPage, PeerRegistry};

/// Longest output, in characters, shown to an operator.
pub const PRESENTATION_LIMIT: usize = 4000;

/// Cuts `text` to at most `limit` characters without splitting one.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn render_output(server_id: &str, output: &str) -> String {
    format!(
        "```{}\n{}\n```",
        server_id,
        truncate_chars(output, PRESENTATION_LIMIT)
    )
}

pub fn render_error(err: &RelayError) -> String {
    format!("❌ Error: {}", err.headline())
}

/// One listing page; the currently selected server is marked.
pub fn render_page(registry: &PeerRegistry, page: &PeerPage<'_>, selected: Option<&str>) -> String {
    let mut lines: Vec<String> = page
        .peers
        .iter()
        .map(|peer| {
            let mark = if selected == Some(peer.id.as_str()) { "✅ " } else { "" };
            let local = if registry.is_local(&peer.id) { " [local]" } else { "" };
            format!("{}{} ({}){}", mark, peer.name, peer.id, local)
        })
        .collect();
    lines.push(format!("Page {}/{}", page.number, page.total_pages));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Peer, PAGE_SIZE};

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn output_is_fenced_and_capped() {
        let long = "x".repeat(PRESENTATION_LIMIT + 500);
        let rendered = render_output("hk", &long);
        assert!(rendered.starts_with("```hk\n"));
        assert!(rendered.ends_with("\n```"));
        assert_eq!(rendered.matches('x').count(), PRESENTATION_LIMIT);
    }

    #[test]
    fn error_shows_first_line_only() {
        let err = RelayError::process("traceroute: unknown host\nusage: traceroute ...");
        assert_eq!(render_error(&err), "❌ Error: traceroute: unknown host");
    }

    #[test]
    fn page_marks_selected_and_local() {
        let registry = PeerRegistry::new(
            "hk",
            vec![
                Peer::new("hk", "Hong Kong"),
                Peer::new("fra", "Frankfurt").with_url("http://fra/api/run"),
            ],
        )
        .unwrap();
        let page = registry.page(1, PAGE_SIZE);
        let text = render_page(&registry, &page, Some("fra"));
        assert_eq!(
            text,
            "✅ Frankfurt (fra)\nHong Kong (hk) [local]\nPage 1/1"
        );
    }
}
