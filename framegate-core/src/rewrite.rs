//! Rewriting of fetched HTML documents.
//!
//! Rewriting works on the raw markup with targeted substring operations; no
//! DOM is built. It is deliberately best-effort and sits behind
//! [`DocumentRewriter`] so a tag-aware implementation can replace it without
//! touching the fetch pipeline.
//!
//! [`SubstringRewriter`] performs, in order:
//!
//! 1. Makes the **first** `href="/` and the **first** `src="/` absolute
//!    against the target's origin. Later occurrences are left alone.
//! 2. Inserts `<base href="{target}">` right after the first literal `<head>`.
//! 3. Inserts the widget `<script>` tag, preceded by an address-rewrite
//!    script when passthrough parameters exist, before `</head>`, else
//!    before `</body>`, else at the end of the document.

use crate::defaults::{WIDGET_FILE_V1, WIDGET_FILE_V2};
use crate::url_validator::ValidatedUrl;

/// Which widget script to inject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WidgetVersion {
    #[default]
    V1,
    V2,
}

impl WidgetVersion {
    /// Parses the `widget_version` query parameter. Only `v2` selects V2.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("v2") => Self::V2,
            _ => Self::V1,
        }
    }

    /// Script file served by the widget host.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::V1 => WIDGET_FILE_V1,
            Self::V2 => WIDGET_FILE_V2,
        }
    }
}

/// Everything a rewriter needs to know about one proxied page.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Page being proxied
    pub target: &'a ValidatedUrl,
    /// Public origin of this proxy, where widget scripts are served
    pub widget_origin: &'a str,
    pub widget_version: WidgetVersion,
    /// Caller parameters re-exposed to the widget through the page address
    pub passthrough: &'a [(String, String)],
}

/// Transforms a fetched HTML document before it is returned.
pub trait DocumentRewriter: Send + Sync {
    fn rewrite(&self, html: &str, context: &RewriteContext<'_>) -> String;
}

/// First-match substring rewriter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringRewriter;

impl DocumentRewriter for SubstringRewriter {
    fn rewrite(&self, html: &str, context: &RewriteContext<'_>) -> String {
        let origin = context.target.origin();

        let mut document = html
            .replacen(r#"href="/"#, &format!(r#"href="{origin}/"#), 1)
            .replacen(r#"src="/"#, &format!(r#"src="{origin}/"#), 1);

        if let Some(position) = document.find("<head>") {
            let base = format!(
                r#"<base href="{}">"#,
                escape_attribute(context.target.normalized())
            );
            document.insert_str(position + "<head>".len(), &base);
        }

        let injection = widget_injection(context);
        match document.find("</head>").or_else(|| document.find("</body>")) {
            Some(position) => document.insert_str(position, &injection),
            None => document.push_str(&injection),
        }

        document
    }
}

/// Widget tag, preceded by the address-rewrite script when needed.
fn widget_injection(context: &RewriteContext<'_>) -> String {
    let widget_tag = format!(
        r#"<script src="{}/{}"></script>"#,
        escape_attribute(context.widget_origin),
        context.widget_version.file_name()
    );

    if context.passthrough.is_empty() {
        return widget_tag;
    }

    format!(
        "{}{widget_tag}",
        address_rewrite_script(context.passthrough)
    )
}

/// Script that merges `params` into the page's query string without
/// reloading, so the widget can read them from its own location.
fn address_rewrite_script(params: &[(String, String)]) -> String {
    format!(
        "<script>(function(){{var p=new URLSearchParams(window.location.search);\
         {}.forEach(function(kv){{p.set(kv[0],kv[1]);}});\
         window.history.replaceState(null,'',window.location.pathname+'?'+p.toString()+window.location.hash);\
         }})();</script>",
        script_safe_json(params)
    )
}

/// JSON array of `[key, value]` pairs that cannot close the script element.
fn script_safe_json(params: &[(String, String)]) -> String {
    serde_json::to_string(params)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('<', "\\u003c")
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
