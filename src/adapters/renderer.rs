use crate::adapters::template::{CardTemplates, Segment, Template};
use crate::config::toml_config::{MissingFieldPolicy, RenderConfig};
use crate::domain::model::{normalize_key, Side, StudentRecord};
use crate::utils::error::{IdGenError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const PHOTO_KEY: &str = "photo";
pub const BARCODE_KEY: &str = "barcode";

fn column_ref_regex() -> &'static Regex {
    static COLUMN_REF: OnceLock<Regex> = OnceLock::new();
    COLUMN_REF.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"))
}

fn is_reserved(key: &str) -> bool {
    key == PHOTO_KEY || key == BARCODE_KEY
}

fn data_uri_payload(uri: &str) -> &str {
    uri.split_once("base64,").map_or(uri, |(_, payload)| payload)
}

pub fn xml_escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Per-record values that do not come from roster columns.
#[derive(Debug, Default)]
pub struct RenderContext<'a> {
    pub key: &'a str,
    pub photo_uri: Option<String>,
    pub barcode_uri: Option<String>,
}

/// Fills `{{ key }}` placeholders from a record.
pub struct Renderer<'a> {
    policy: MissingFieldPolicy,
    /// Derived placeholders by normalized name, e.g. `name` -> `{First} {Last}`.
    fields: BTreeMap<String, &'a str>,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &RenderConfig, fields: &'a BTreeMap<String, String>) -> Self {
        Self {
            policy: config.missing_field,
            fields: fields
                .iter()
                .map(|(name, pattern)| (normalize_key(name), pattern.as_str()))
                .collect(),
        }
    }

    /// Fails on the first placeholder (or derived-field column) the roster header cannot
    /// satisfy. Under the `blank` policy everything passes.
    pub fn check(&self, templates: &CardTemplates, headers: &[String]) -> Result<()> {
        if self.policy == MissingFieldPolicy::Blank {
            return Ok(());
        }

        let columns: Vec<String> = headers.iter().map(|h| normalize_key(h)).collect();
        for side in Side::ALL {
            let template = templates.get(side);
            for key in template.placeholders() {
                if is_reserved(key) || columns.iter().any(|c| c == key) {
                    continue;
                }
                let Some(pattern) = self.fields.get(key) else {
                    return Err(unknown_placeholder(template, key));
                };
                for caps in column_ref_regex().captures_iter(pattern) {
                    let column = normalize_key(&caps[1]);
                    if !columns.contains(&column) {
                        return Err(IdGenError::UnknownPlaceholder {
                            placeholder: format!("{} (in field '{}')", &caps[0], key),
                            template: template.path().to_path_buf(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn render(
        &self,
        template: &Template,
        record: &StudentRecord,
        ctx: &RenderContext<'_>,
    ) -> Result<String> {
        let mut out = String::new();
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { key, raw } => {
                    let value = self.resolve(key, record, ctx)?;
                    match value {
                        // `data:...;base64,<!-- PHOTO -->` takes just the encoded bytes.
                        Some(value) if is_reserved(key) && out.ends_with("base64,") => {
                            out.push_str(data_uri_payload(&value))
                        }
                        Some(value) => out.push_str(&xml_escape(&value)),
                        None => {
                            if self.policy == MissingFieldPolicy::Error {
                                return Err(IdGenError::render(
                                    ctx.key,
                                    format!(
                                        "{} in {} has no matching roster column",
                                        raw,
                                        template.path().display()
                                    ),
                                ));
                            }
                            tracing::debug!("Card '{}': blanking unknown placeholder {}", ctx.key, raw);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn resolve<'r>(
        &self,
        key: &str,
        record: &'r StudentRecord,
        ctx: &RenderContext<'_>,
    ) -> Result<Option<Cow<'r, str>>> {
        match key {
            PHOTO_KEY => return Ok(Some(Cow::Owned(ctx.photo_uri.clone().unwrap_or_default()))),
            BARCODE_KEY => {
                return Ok(Some(Cow::Owned(ctx.barcode_uri.clone().unwrap_or_default())))
            }
            _ => {}
        }

        if let Some(pattern) = self.fields.get(key) {
            return self.expand_field(key, pattern, record, ctx).map(|v| Some(Cow::Owned(v)));
        }

        Ok(record.get(key).map(Cow::Borrowed))
    }

    fn expand_field(
        &self,
        name: &str,
        pattern: &str,
        record: &StudentRecord,
        ctx: &RenderContext<'_>,
    ) -> Result<String> {
        let mut missing = None;
        let value = column_ref_regex().replace_all(pattern, |caps: &regex::Captures| {
            match record.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| caps[0].to_string());
                    String::new()
                }
            }
        });

        if let Some(column) = missing {
            if self.policy == MissingFieldPolicy::Error {
                return Err(IdGenError::render(
                    ctx.key,
                    format!("field '{}' refers to unknown column {}", name, column),
                ));
            }
        }
        // Joined parts may leave stray separators when a part is empty.
        Ok(value.trim().to_string())
    }
}

/// Stacks both rendered sides into one document, front on top, each embedded as an
/// SVG data URI so their ids and styles cannot collide. Both `href` and `xlink:href`
/// are set for SVG 1.1 renderers.
pub fn merge_sides(front: &str, back: &str, config: &RenderConfig) -> String {
    let (w, h) = (config.card_width, config.card_height);
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" "#,
            r#"width="{w}" height="{total}" viewBox="0 0 {w} {total}">"#,
            "\n",
            r#"  <image x="0" y="0" width="{w}" height="{h}" "#,
            r#"href="data:image/svg+xml;base64,{front}" xlink:href="data:image/svg+xml;base64,{front}"/>"#,
            "\n",
            r#"  <image x="0" y="{h}" width="{w}" height="{h}" "#,
            r#"href="data:image/svg+xml;base64,{back}" xlink:href="data:image/svg+xml;base64,{back}"/>"#,
            "\n</svg>\n"
        ),
        w = w,
        h = h,
        total = h * 2.0,
        front = STANDARD.encode(front),
        back = STANDARD.encode(back),
    )
}

fn unknown_placeholder(template: &Template, key: &str) -> IdGenError {
    IdGenError::UnknownPlaceholder {
        placeholder: format!("{{{{{}}}}}", key),
        template: template.path().to_path_buf(),
    }
}
