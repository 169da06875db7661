//! Presentation-markup stripping for sub-agent replies.
//!
//! Handlers may answer with HTML or Markdown; the routing envelope carries
//! plain text only.

use std::sync::LazyLock;

use regex::Regex;

/// (pattern, replacement) pairs, applied in order.
const RULE_SOURCES: &[(&str, &str)] = &[
    (r"(?m)^[ \t]*```[^\n]*\n?", ""),
    (r"(?i)<br\s*/?>", "\n"),
    (r"(?i)</(?:p|div|li|h[1-6])>", "\n"),
    (r"</?[A-Za-z][^>\n]*>", ""),
    (r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
    (r"(?m)^[ \t]*>[ \t]?", ""),
    (r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$", ""),
    (r"!?\[([^\]\n]*)\]\([^)\n]*\)", "${1}"),
    (r"\*\*\*([^*\n]+)\*\*\*", "${1}"),
    (r"\*\*([^*\n]+)\*\*", "${1}"),
    (r"__([^_\n]+)__", "${1}"),
    (r"~~([^~\n]+)~~", "${1}"),
    (r"(?m)^([ \t]*)[*+][ \t]+", "${1}- "),
    (r"\*([^*\n]+)\*", "${1}"),
    (r"`([^`\n]+)`", "${1}"),
    (r"\n{3,}", "\n\n"),
];

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    RULE_SOURCES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, *replacement))
        })
        .collect()
});

/// Reduce HTML/Markdown-formatted text to plain text.
pub fn strip_markup(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    for (re, replacement) in RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    for (entity, plain) in ENTITIES {
        out = out.replace(entity, plain);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(RULES.len(), RULE_SOURCES.len());
    }

    #[test]
    fn test_markdown_emphasis_and_headings() {
        let text = "## Tus recuerdos\n\n**Verano 1998**: viaje a *Cádiz* con `mamá`.";
        assert_eq!(
            strip_markup(text),
            "Tus recuerdos\n\nVerano 1998: viaje a Cádiz con mamá."
        );
    }

    #[test]
    fn test_html_tags() {
        let text = "<p>Cita con <b>Dra. Ruiz</b> a las 10&nbsp;h</p><br/>Trae el DNI &amp; la tarjeta.";
        assert_eq!(
            strip_markup(text),
            "Cita con Dra. Ruiz a las 10 h\n\nTrae el DNI & la tarjeta."
        );
    }

    #[test]
    fn test_comparisons_are_not_tags() {
        assert_eq!(strip_markup("2 < 3 y 5 > 4"), "2 < 3 y 5 > 4");
        assert_eq!(strip_markup("2 < 3 y <b>5</b> > 4"), "2 < 3 y 5 > 4");
    }

    #[test]
    fn test_code_fences_keep_content() {
        let text = "Resultado:\n```json\n{\"ok\": true}\n```\n";
        assert_eq!(strip_markup(text), "Resultado:\n{\"ok\": true}");
    }

    #[test]
    fn test_links_lists_and_rules() {
        let text = "* uno\n* dos\n\n---\n\nVer [el contrato](https://example.org/c.pdf)";
        assert_eq!(strip_markup(text), "- uno\n- dos\n\nVer el contrato");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(strip_markup("  Hola, ¿qué tal? 2 * 3 = 6  "), "Hola, ¿qué tal? 2 * 3 = 6");
    }
}
