//! Documentation block parsing.
//!
//! A doc block is the `///` comment above a function. Free text before the
//! first tag is the summary. Every line starting with `@` opens a tag, and
//! the lines that follow continue it until the next tag.
//!
//! ```text
//! /// Net present value of a series of cash flows.
//! ///
//! /// @id npv
//! /// @version 2.1.0
//! /// @tags ["finance", "valuation"]
//! /// @engineHint.static.rounding round
//! /// @engineHint.static.scale 2
//! /// @param rate Discount rate per period @unit % @default 0.05
//! /// @returns Present value
//! ```

use crate::model::{DEFAULT_SCALE, EngineHint, Rounding};
use serde_json::Value;
use std::collections::BTreeMap;
use syn::{Attribute, Expr, ExprLit, Lit, Meta};
use tracing::warn;

/// Prefix of engine hint tags: `engineHint.<backend>.<rounding|scale>`.
const ENGINE_HINT_PREFIX: &str = "engineHint.";

/// Inline markers recognized inside `@param` text.
const PARAM_MARKERS: [&str; 2] = ["unit", "default"];

/// Collect the text of `#[doc = "..."]` attributes, one entry per line.
pub(crate) fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Meta::NameValue(nv) = &attr.meta else {
            continue;
        };
        if let Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) = &nv.value
        {
            for line in s.value().lines() {
                lines.push(line.strip_prefix(' ').unwrap_or(line).to_string());
            }
        }
    }
    lines
}

/// First non-empty doc line, used for field and variant descriptions.
pub(crate) fn first_doc_line(attrs: &[Attribute]) -> Option<String> {
    doc_lines(attrs)
        .into_iter()
        .map(|line| line.trim().to_string())
        .find(|line| !line.is_empty())
}

/// A parsed documentation block.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct DocBlock {
    pub summary: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub name: String,
    pub value: String,
}

impl DocBlock {
    pub fn parse(lines: &[String]) -> Self {
        let mut summary = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();

        for line in lines {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix('@') {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .unwrap_or((rest, ""));
                tags.push(Tag {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                });
            } else if let Some(tag) = tags.last_mut() {
                if !trimmed.is_empty() {
                    if !tag.value.is_empty() {
                        tag.value.push(' ');
                    }
                    tag.value.push_str(trimmed);
                }
            } else {
                summary.push(trimmed);
            }
        }

        Self {
            summary: summary.join("\n").trim().to_string(),
            tags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.tags.is_empty()
    }

    /// Value of the first tag named `name`, if it is non-empty.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// Collect `@engineHint.<backend>.<field>` tags into a per-backend map.
    pub fn engine_hints(&self) -> Option<BTreeMap<String, EngineHint>> {
        let mut hints: BTreeMap<String, EngineHint> = BTreeMap::new();
        for tag in &self.tags {
            let Some(path) = tag.name.strip_prefix(ENGINE_HINT_PREFIX) else {
                continue;
            };
            let Some((backend, field)) = path.split_once('.') else {
                warn!(tag = %tag.name, "engine hint tag without a field, ignoring");
                continue;
            };
            let hint = hints.entry(backend.to_string()).or_default();
            match field {
                "rounding" => {
                    hint.rounding = tag.value.parse::<Rounding>().unwrap_or_else(|err| {
                        warn!(backend, "{}; using round", err);
                        Rounding::Round
                    });
                }
                "scale" => {
                    hint.scale = tag.value.trim().parse::<u32>().unwrap_or(DEFAULT_SCALE);
                }
                other => warn!(backend, field = other, "unknown engine hint field, ignoring"),
            }
        }
        (!hints.is_empty()).then_some(hints)
    }
}

/// Parse a `@tags` value: a JSON array of strings, else a comma-separated list.
pub(crate) fn parse_tag_list(value: &str) -> Vec<String> {
    if let Ok(tags) = serde_json::from_str::<Vec<String>>(value) {
        return tags;
    }
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|t| t.trim().trim_matches('"').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Metadata of one `@param` tag.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ParamDoc {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub default: Option<Value>,
}

impl ParamDoc {
    /// Parse `name free text @unit U @default D`.
    ///
    /// A leading `{type}` annotation before the name is accepted and ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let mut rest = value.trim();
        if rest.starts_with('{') {
            let end = rest.find('}')?;
            rest = rest[end + 1..].trim_start();
        }
        let (name, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if name.is_empty() {
            return None;
        }
        let name = name.trim_end_matches([':', '-']);

        let (description, markers) = split_markers(text);
        let default = markers.get("default").map(|raw| {
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        });

        Some(Self {
            name: name.to_string(),
            description: non_empty(description.trim_start_matches(['-', ' ']).trim()),
            unit: markers.get("unit").and_then(|u| non_empty(u)),
            default,
        })
    }
}

/// Split free text on `@unit`/`@default` markers.
///
/// Returns the text before the first marker and the value of each marker.
fn split_markers(text: &str) -> (String, BTreeMap<&'static str, String>) {
    let mut positions: Vec<(usize, &'static str)> = PARAM_MARKERS
        .iter()
        .filter_map(|marker| {
            find_marker(text, marker).map(|pos| (pos, *marker))
        })
        .collect();
    positions.sort();

    let description = positions
        .first()
        .map_or(text, |(pos, _)| &text[..*pos])
        .trim()
        .to_string();

    let mut markers = BTreeMap::new();
    for (i, (pos, marker)) in positions.iter().enumerate() {
        let start = pos + marker.len() + 1;
        let end = positions.get(i + 1).map_or(text.len(), |(next, _)| *next);
        let value = text.get(start..end).unwrap_or("").trim().to_string();
        markers.insert(*marker, value);
    }
    (description, markers)
}

/// Byte offset of `@marker` when followed by whitespace or end of text.
fn find_marker(text: &str, marker: &str) -> Option<usize> {
    let needle = format!("@{}", marker);
    text.match_indices(&needle).map(|(pos, _)| pos).find(|pos| {
        text[pos + needle.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
    })
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
