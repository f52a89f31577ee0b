//! HTML templates for the web interface.
//!
//! The dashboard markup lives in the asset store; this module only fills in
//! its placeholders. Message pages are generated inline.

/// Placeholder replaced with `ON`/`OFF`
pub const LED_PLACEHOLDER: &str = "{{led_state}}";

/// Placeholder replaced with the light reading
pub const LIGHT_PLACEHOLDER: &str = "{{light_state}}";

/// `ON`/`OFF` label used by the page and the JSON API
pub fn led_label(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

/// Fill the dashboard template with the current device state
///
/// A sensor that could not be read renders as `--`.
pub fn render_dashboard(template: &str, led_on: bool, light_percent: Option<f64>) -> String {
    let light = light_percent
        .map(|percent| format!("{:.2}", percent))
        .unwrap_or_else(|| "--".to_string());

    template
        .replace(LED_PLACEHOLDER, led_label(led_on))
        .replace(LIGHT_PLACEHOLDER, &light)
}

/// Render a simple message page linking back to the dashboard
pub fn render_message_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="UTF-8"><title>{title}</title>
<style>body{{font-family:Helvetica,sans-serif;padding:20px;}}
.msg{{background:#e3f2fd;padding:20px;border-radius:8px;max-width:500px;margin:0 auto;}}
a{{color:#0F3376;}}</style></head>
<body><div class="msg"><h2>{title}</h2><p>{message}</p>
<p><a href="/">← Back to dashboard</a></p></div></body></html>"#,
        title = html_escape(title),
        message = html_escape(message),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_placeholders_are_filled() {
        let page = render_dashboard(
            "<p>{{led_state}}</p><p>{{light_state}}</p>",
            true,
            Some(49.999),
        );
        assert_eq!(page, "<p>ON</p><p>50.00</p>");
    }

    #[test]
    fn missing_light_reading_renders_dashes() {
        let page = render_dashboard("{{led_state}} {{light_state}}", false, None);
        assert_eq!(page, "OFF --");
    }

    #[test]
    fn message_page_escapes_text() {
        let page = render_message_page("Error", "<script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"<a href="/">"#));
    }
}
