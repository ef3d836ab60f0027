//! Plain-text rendering of account plans
//!
//! Full plans are drawn inside a box with wrapped section text; single
//! sections are rendered without decoration for update confirmations.

use chrono::{DateTime, Utc};

use super::{Document, Section, SectionKey};

pub const WRAP_WIDTH: usize = 76;
const BOX_PADDING: usize = 2;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render the whole plan inside a box.
pub fn render_plan(document: &Document) -> String {
    let mut lines = vec![
        format!("ACCOUNT PLAN: {}", document.entity.display_name),
        format!("Generated: {}", timestamp(&document.generated_at)),
    ];
    if !document.revisions().is_empty() {
        lines.push(format!("Last Updated: {}", timestamp(&document.last_updated)));
    }
    lines.push(String::new());

    for (key, section) in document.sections() {
        lines.push(format!(" {} ", key.display_name().to_uppercase()));
        lines.extend(section_lines(section));
        lines.push(String::new());
    }

    if !document.sources.is_empty() {
        lines.push(format!("Sources: {}", document.sources.join(", ")));
    }

    draw_box(&lines)
}

/// Render one section as `Title:` followed by its text and gap note.
pub fn render_section(document: &Document, key: SectionKey) -> String {
    let mut out = format!("{}:\n", key.display_name());
    out.push_str(&section_lines(document.section(key)).join("\n"));
    out
}

fn section_lines(section: &Section) -> Vec<String> {
    let mut lines = if section.content.trim().is_empty() {
        vec!["[Not provided]".to_string()]
    } else {
        wrap(&section.content, WRAP_WIDTH)
    };
    if section.gap {
        let reason = section.gap_reason.as_deref().unwrap_or("information incomplete");
        lines.extend(wrap(&format!("[Gap: {}]", reason), WRAP_WIDTH));
    }
    lines
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn draw_box(lines: &[String]) -> String {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let inner = longest + BOX_PADDING * 2;
    let pad = " ".repeat(BOX_PADDING);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("┌{}┐", "─".repeat(inner)));
    for line in lines {
        let fill = " ".repeat(longest - line.chars().count());
        out.push(format!("│{pad}{line}{fill}{pad}│"));
    }
    out.push(format!("└{}┘", "─".repeat(inner)));
    out.join("\n")
}

/// Greedy word wrap. Paragraph breaks in the input are kept; words longer
/// than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::{Candidate, EntityId};

    fn doc() -> Document {
        let entity = Candidate {
            id: EntityId::from_name("Tesla"),
            display_name: "Tesla".into(),
        };
        Document::from_fn(entity, |key| match key {
            SectionKey::Risks => Section::gap("Unclear.", "Industry/sector information not found"),
            _ => Section::filled(format!("{} content", key)),
        })
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(60);
        let lines = wrap(&text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
    }

    #[test]
    fn test_wrap_long_word() {
        let lines = wrap("a supercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_render_plan_has_all_sections() {
        let out = render_plan(&doc());
        for key in SectionKey::ALL {
            assert!(out.contains(&key.display_name().to_uppercase()));
        }
        assert!(out.starts_with('┌'));
        assert!(out.ends_with('┘'));
        assert!(out.contains("[Gap: Industry/sector information not found]"));
        assert!(!out.contains("Last Updated"));
    }

    #[test]
    fn test_render_plan_lines_are_aligned() {
        let out = render_plan(&doc());
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_render_plan_shows_last_updated() {
        let mut d = doc();
        d.replace_section(SectionKey::Risks, "Battery supply");
        assert!(render_plan(&d).contains("Last Updated:"));
    }

    #[test]
    fn test_render_section() {
        let out = render_section(&doc(), SectionKey::Risks);
        assert_eq!(out, "Risks:\nUnclear.\n[Gap: Industry/sector information not found]");
    }
}
