use crate::config::toml_config::TemplateFiles;
use crate::domain::model::{normalize_key, Side};
use crate::utils::error::{IdGenError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(concat!(
            r"\{\{\s*(?P<braces>[^{}]*?)\s*\}\}",
            // Upper-case comment tokens such as `<!-- NAME -->` or `<!-- PHOTO -->`.
            r"|<!--\s*(?P<comment>[A-Z][A-Z0-9_]*(?:[ -][A-Z0-9_]+)*)\s*-->",
        ))
        .expect("valid regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `key` is normalized, `raw` is the token as written.
    Placeholder { key: String, raw: String },
}

/// One side of the card, split into literal text and placeholders. Placeholders are
/// written `{{ key }}` or, in older templates, as an upper-case comment `<!-- KEY -->`.
#[derive(Debug, Clone)]
pub struct Template {
    side: Side,
    path: PathBuf,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(side: Side, path: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let path = path.into();
        if !source.contains("<svg") {
            return Err(IdGenError::template(path, "not an SVG document"));
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(source) {
            let whole = caps.get(0).expect("group 0 always matches");
            let name = caps
                .name("braces")
                .or_else(|| caps.name("comment"))
                .map_or("", |m| m.as_str());
            let key = normalize_key(name);
            if key.is_empty() {
                return Err(IdGenError::template(
                    path,
                    format!("empty placeholder '{}'", whole.as_str()),
                ));
            }
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder {
                key,
                raw: whole.as_str().to_string(),
            });
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Ok(Self {
            side,
            path,
            segments,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct normalized placeholder keys in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder { key, .. } = segment {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    pub fn uses(&self, key: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder { key: k, .. } if k == key))
    }
}

#[derive(Debug, Clone)]
pub struct CardTemplates {
    pub front: Template,
    pub back: Template,
}

impl CardTemplates {
    pub fn load(dir: &Path, files: &TemplateFiles) -> Result<Self> {
        let front_path = dir.join(&files.front);
        let back_path = dir.join(&files.back);

        if !front_path.is_file() || !back_path.is_file() {
            let missing = if front_path.is_file() {
                back_path
            } else {
                front_path
            };
            return Err(IdGenError::template(missing, "file does not exist"));
        }

        let templates = Self {
            front: load_side(Side::Front, front_path)?,
            back: load_side(Side::Back, back_path)?,
        };
        if Side::ALL
            .iter()
            .all(|&side| templates.get(side).placeholders().is_empty())
        {
            tracing::warn!(
                "Templates in {} have no placeholders; every card will be identical",
                dir.display()
            );
        }
        Ok(templates)
    }

    pub fn get(&self, side: Side) -> &Template {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    pub fn uses(&self, key: &str) -> bool {
        self.front.uses(key) || self.back.uses(key)
    }
}

fn load_side(side: Side, path: PathBuf) -> Result<Template> {
    let source = std::fs::read_to_string(&path)
        .map_err(|e| IdGenError::template(&path, format!("cannot read: {}", e)))?;
    tracing::debug!("{} template {}:\n{}", side.as_str(), path.display(), source);

    let template = Template::parse(side, path, &source)?;
    tracing::debug!(
        "{} template placeholders: {:?}",
        side.as_str(),
        template.placeholders()
    );
    Ok(template)
}
