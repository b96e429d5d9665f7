//! Markdown-ish completion text to HTML fragments.
//!
//! The transformation is a regex chain applied in a fixed order; later
//! rules assume earlier ones already consumed their markers. The order
//! (headings, bold, italic, bullets, line breaks, warnings) is part of
//! the observable contract, including its edge-case renders, and must
//! not be reshuffled.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"## (.*?)\n").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- (.*?)(\n|$)").unwrap());
static WARNING: Lazy<Regex> = Lazy::new(|| Regex::new(r"! (.*?)(\n|$)").unwrap());

const WARNING_OPEN: &str = r#"<div class="warning"><i class="fas fa-exclamation-triangle"></i> "#;

fn headings(text: &str) -> String {
    HEADING.replace_all(text, "<h4>$1</h4>").into_owned()
}

fn bold(text: &str) -> String {
    BOLD.replace_all(text, "<strong>$1</strong>").into_owned()
}

fn italic(text: &str) -> String {
    ITALIC.replace_all(text, "<em>$1</em>").into_owned()
}

fn bullets(text: &str) -> String {
    BULLET.replace_all(text, "<li>$1</li>").into_owned()
}

fn line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

fn warnings(text: &str) -> String {
    WARNING
        .replace_all(text, format!("{WARNING_OPEN}$1</div>"))
        .into_owned()
}

/// Chat bubble markup: bold, italic, bullets, breaks, warnings.
pub fn format_chat_message(text: &str) -> String {
    warnings(&line_breaks(&bullets(&italic(&bold(text)))))
}

/// Growth simulation markup: a quick summary (first paragraph, or a
/// 150-char prefix), the supplied visualization fragment, then the
/// full text through the complete rule chain.
pub fn format_simulation_result(raw: &str, visualization: &str) -> String {
    let first_paragraph = raw.split("\n\n").next().unwrap_or("");
    let summary = if first_paragraph.is_empty() {
        let mut prefix: String = raw.chars().take(150).collect();
        prefix.push_str("...");
        prefix
    } else {
        first_paragraph.to_string()
    };

    let summary_html = line_breaks(&bold(&summary));
    let details_html = warnings(&line_breaks(&bullets(&italic(&bold(&headings(raw))))));

    format!(
        r#"<div class="result-summary"><h4>Quick Summary</h4><p>{summary_html}</p>{visualization}</div><div class="result-details">{details_html}</div>"#
    )
}

static PLANT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Plant Identification\*\*: (.*?)(\n|$)").unwrap());
static DIAGNOSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Diagnosis\*\*: (.*?) \(Confidence: (.*?)\)").unwrap());
static SYMPTOMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Symptoms\*\*:(\n|$)").unwrap());
static TREATMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Treatment\*\*:(\n|$)").unwrap());
static PREVENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Prevention\*\*:(\n|$)").unwrap());
static SEVERITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Severity\*\*: (.*?)(\n|$)").unwrap());
static NOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Additional Notes\*\*: (.*?)(\n|$)").unwrap());

/// Disease report markup. The labeled fields are translated in source
/// order; Symptoms opens a list, Treatment and Prevention close the
/// previous one and open their own, Severity closes the last. Labels
/// that are absent emit nothing, malformed ones pass through as plain
/// text. A dangling list left by a truncated report is closed at the
/// end.
pub fn format_disease_result(raw: &str) -> String {
    // Label replacements keep the captured newline so the bullet rule
    // still sees its lines at line start.
    let mut text = PLANT_ID
        .replace_all(raw, "<h4>Plant Identified: $1</h4>$2")
        .into_owned();
    text = DIAGNOSIS
        .replace_all(
            &text,
            r#"<h4>Diagnosis: $1 <span class="disease-confidence">$2 Confidence</span></h4>"#,
        )
        .into_owned();
    text = SYMPTOMS
        .replace_all(&text, "<h4>Symptoms Observed:</h4><ul>$1")
        .into_owned();
    text = TREATMENT
        .replace_all(&text, "</ul><h4>Recommended Treatment:</h4><ul>$1")
        .into_owned();
    text = PREVENTION
        .replace_all(&text, "</ul><h4>Prevention Measures:</h4><ul>$1")
        .into_owned();
    text = SEVERITY
        .replace_all(
            &text,
            r#"</ul><h4>Severity: <span class="severity-$1">$1</span></h4>$2"#,
        )
        .into_owned();
    text = NOTES
        .replace_all(
            &text,
            r#"<div class="notes"><h4>Additional Notes:</h4><p>$1</p></div>$2"#,
        )
        .into_owned();
    text = line_breaks(&bullets(&text));

    let opened = text.matches("<ul>").count();
    let closed = text.matches("</ul>").count();
    if opened > closed {
        text.push_str("</ul>");
    }

    format!(r#"<div class="disease-result">{text}</div>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_runs_the_full_chain() {
        let html = format_chat_message("**Water** your *basil*\n- every morning\n- in summer\n");
        assert!(html.contains("<strong>Water</strong>"));
        assert!(html.contains("<em>basil</em>"));
        assert!(html.contains("<li>every morning</li>"));
        assert!(html.contains("<li>in summer</li>"));
        assert!(!html.contains('\n'));
    }

    #[test]
    fn warning_lines_become_callouts() {
        let html = format_chat_message("! Overwatering detected");
        assert!(html.contains(r#"<div class="warning">"#));
        assert!(html.contains("Overwatering detected</div>"));
    }

    #[test]
    fn marker_free_text_only_gains_line_breaks() {
        let plain = "The plant is healthy.\nKeep the soil moist.";
        assert_eq!(
            format_chat_message(plain),
            "The plant is healthy.<br>Keep the soil moist."
        );
    }

    #[test]
    fn simulation_headings_render_before_breaks() {
        let html = format_simulation_result("## Overview\nAll good.\n\nDetails follow.", "");
        assert!(html.contains("<h4>Overview</h4>"));
        // Heading replacement consumes the newline, so no stray <br>
        // directly after the heading.
        assert!(!html.contains("<h4>Overview</h4><br>"));
        assert!(html.contains("Quick Summary"));
    }

    #[test]
    fn simulation_summary_is_first_paragraph() {
        let html = format_simulation_result("First paragraph here.\n\nSecond paragraph.", "");
        assert!(html.contains("<p>First paragraph here.</p>"));
    }

    #[test]
    fn simulation_embeds_the_visualization_fragment() {
        let html = format_simulation_result("text", r#"<div class="viz">chart</div>"#);
        assert!(html.contains(r#"<div class="viz">chart</div>"#));
    }

    #[test]
    fn disease_report_translates_all_labeled_fields() {
        let raw = "**Plant Identification**: Tomato\n\
                   **Diagnosis**: Early Blight (Confidence: High)\n\
                   **Symptoms**:\n- brown spots\n- yellow halo\n\
                   **Treatment**:\n- remove affected leaves\n\
                   **Prevention**:\n- rotate crops\n\
                   **Severity**: Moderate\n\
                   **Additional Notes**: Monitor weekly\n";
        let html = format_disease_result(raw);

        assert!(html.contains("<h4>Plant Identified: Tomato</h4>"));
        assert!(html.contains(
            r#"<h4>Diagnosis: Early Blight <span class="disease-confidence">High Confidence</span></h4>"#
        ));
        assert!(html.contains("<h4>Symptoms Observed:</h4>"));
        assert!(html.contains("<h4>Recommended Treatment:</h4>"));
        assert!(html.contains("<h4>Prevention Measures:</h4>"));
        assert!(html.contains(r#"<span class="severity-Moderate">Moderate</span>"#));
        assert!(html.contains("<h4>Additional Notes:</h4><p>Monitor weekly</p>"));
        assert!(html.contains("<li>brown spots</li>"));

        // Each list container opened once and closed once.
        assert_eq!(html.matches("<ul>").count(), 3);
        assert_eq!(html.matches("</ul>").count(), 3);
    }

    #[test]
    fn disease_report_without_optional_fields_omits_their_sections() {
        let raw = "**Symptoms**:\n- wilting\n**Treatment**:\n- water deeply\n";
        let html = format_disease_result(raw);
        assert!(!html.contains("Severity"));
        assert!(!html.contains("Additional Notes"));
        // The truncated report leaves the Treatment list open; the
        // formatter closes it.
        assert_eq!(html.matches("<ul>").count(), html.matches("</ul>").count());
    }

    #[test]
    fn malformed_labels_pass_through_as_text() {
        let raw = "**Diagnosis** missing colon\nplain line\n";
        let html = format_disease_result(raw);
        assert!(html.contains("**Diagnosis** missing colon"));
        assert!(!html.contains("<h4>Diagnosis"));
    }
}
