//! Terminal and markdown rendering for fleetctl output.

use fleet_common::Section;
use owo_colors::OwoColorize;
use serde_json::Value;

/// Join sections into one markdown document, one `#` heading per section
pub fn report_markdown(sections: &[Section]) -> String {
    let mut doc = String::new();
    for section in sections {
        if !doc.is_empty() {
            doc.push('\n');
        }
        doc.push_str("# ");
        doc.push_str(&section.title);
        doc.push_str("\n\n");
        doc.push_str(section.markdown.trim_end());
        doc.push('\n');
    }
    doc
}

/// One-line summary of a /health response
pub fn health_line(health: &Value) -> String {
    let field = |name: &str| {
        health
            .get(name)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "?".to_string())
    };
    let status = field("status");
    let status = if status == "healthy" {
        status.green().to_string()
    } else {
        status.red().to_string()
    };
    format!(
        "fleetd {} - {} (mode {}, model {}, up {}s)",
        field("version"),
        status,
        field("mode"),
        field("model"),
        field("uptime_seconds")
    )
}
