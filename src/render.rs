//! Render module.
//! Builds the static dashboard page from config.json.
//! Read-only: never locks or writes the config. A missing or broken config
//! renders as an empty page instead of failing.

use std::path::Path;

use tracing::{info, warn};

use crate::config::{Configuration, Store, write_atomic};
use crate::editor::list;
use crate::error::Result;

pub const DEFAULT_PAGE_FILE: &str = "index.html";
const PAGE_TITLE: &str = "Links";

/// Loads the config for display. Any load failure yields an empty configuration.
pub fn load_for_display(path: &Path) -> Configuration {
    match Store::new(path).load() {
        Ok(config) => config,
        Err(e) => {
            warn!("showing an empty link list: {e}");
            Configuration::default()
        }
    }
}

/// Renders the grouped link list as a standalone HTML document.
pub fn render_page(config: &Configuration) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n  <meta charset=\"utf-8\">\n  <title>{PAGE_TITLE}</title>\n</head>\n\
         <body>\n  <h1>{PAGE_TITLE}</h1>\n"
    );

    let groups = list(config);
    if groups.is_empty() {
        html.push_str("  <p class=\"empty\">No links configured.</p>\n");
    }
    for group in groups {
        html.push_str(&format!("  <section>\n    <h2>{}</h2>\n    <ul>\n", escape(group.name)));
        for link in group.links {
            html.push_str(&format!("      <li><a href=\"{}\">", escape(&link.target)));
            if let Some(icon) = &link.icon {
                html.push_str(&format!("<i class=\"{}\"></i> ", escape(icon)));
            }
            html.push_str(&format!("{}</a>", escape(&link.label)));
            if let Some(description) = &link.description {
                html.push_str(&format!(" <span>{}</span>", escape(description)));
            }
            html.push_str("</li>\n");
        }
        html.push_str("    </ul>\n  </section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Loads `config_path` for display and writes the page to `out`.
pub fn write_page(config_path: &Path, out: &Path) -> Result<usize> {
    let config = load_for_display(config_path);
    write_atomic(out, render_page(&config).as_bytes())?;
    info!(out = %out.display(), links = config.links.len(), "rendered page");
    Ok(config.links.len())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
