//! "Show code" source pretty-printing for the docs panel
//!
//! Story args are turned into a templating-language snippet so the docs panel
//! shows what using the component actually looks like. A user-provided source
//! override always wins.

use crate::protocol::JsonMap;
use serde_json::Value;

/// Context for one docs source transformation
pub struct DocsContext<'a> {
    /// Slash-delimited hierarchical story title
    pub title: &'a str,
    /// Component display name, when the annotation carries one
    pub component_name: Option<&'a str>,
    pub args: &'a JsonMap,
    /// Custom source from story parameters, used verbatim when present
    pub source_override: Option<&'a str>,
}

/// Render the docs snippet for a story
pub fn transform_source(ctx: &DocsContext<'_>) -> String {
    if let Some(code) = ctx.source_override {
        return code.to_string();
    }

    let name = component_name(ctx);
    let props = format_props(ctx.args, "  ");

    if props.is_empty() {
        return format!(
            "---\nimport {name} from '../components/{name}.astro';\n---\n\n<{name} />"
        );
    }

    // Single short prop stays on one line; multiline props close on their own line
    if props.contains('\n') {
        format!("---\nimport {name} from '../components/{name}.astro';\n---\n\n<{name}{props}/>")
    } else {
        format!("---\nimport {name} from '../components/{name}.astro';\n---\n\n<{name}{props} />")
    }
}

// Component name from the annotation, falling back to the trailing title
// segment ("Components/HeroSection" -> "HeroSection").
fn component_name(ctx: &DocsContext<'_>) -> String {
    if let Some(name) = ctx.component_name {
        if !name.is_empty() && name != "default" {
            return name.to_string();
        }
    }
    ctx.title
        .rsplit('/')
        .next()
        .unwrap_or(ctx.title)
        .to_string()
}

fn format_props(args: &JsonMap, indent: &str) -> String {
    if args.is_empty() {
        return String::new();
    }

    if args.len() == 1 {
        if let Some((key, value)) = args.iter().next() {
            let formatted = format_prop_value(value);
            if formatted.len() < 40 {
                return format!(" {key}={formatted}");
            }
        }
    }

    let mut out = String::from("\n");
    for (key, value) in args {
        out.push_str(indent);
        out.push_str(key);
        out.push('=');
        out.push_str(&format_prop_value(value));
        out.push('\n');
    }
    out
}

fn format_prop_value(value: &Value) -> String {
    match value {
        Value::String(text) => format!("\"{}\"", text.replace('"', "\\\"")),
        Value::Number(_) | Value::Bool(_) => format!("{{{value}}}"),
        Value::Null => "{null}".to_string(),
        Value::Array(_) | Value::Object(_) => {
            let pretty =
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("{{{pretty}}}")
        }
    }
}
