//! Textual type parsing.
//!
//! This is the secondary strategy. It only runs when a type name cannot be
//! resolved against the parsed items, e.g. the type lives in a unit that
//! failed to parse, inside a macro body, or behind an import we never saw.
//! It looks for a `struct Name { ... }` literal in the raw source text and
//! reads `name: type` pairs out of it.

use crate::model::{BaseType, PropertySpec, TypeModel};
use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("valid comment regex"));

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#!?\[[^\]]*\]").expect("valid attribute regex"));

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*(?:pub(?:\s*\([^)]*\))?\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*:\s*(.+?)\s*$")
        .expect("valid field regex")
});

static NUMBER_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:f32|f64|[iu](?:8|16|32|64|128|size)|Decimal|BigDecimal|BigInt|BigUint|OrderedFloat|NotNan|Ratio|Rational(?:32|64)?|NonZero[IU]\w*)$",
    )
    .expect("valid number regex")
});

static STRING_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:String|str|char|Cow|PathBuf|Path|OsString|Uuid|Url|NaiveDate|NaiveDateTime|NaiveTime|DateTime|SmolStr|CompactString|ArcStr)$",
    )
    .expect("valid string regex")
});

static BOOLEAN_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:bool|AtomicBool)$").expect("valid boolean regex"));

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid ident regex"));

const ARRAY_WRAPPERS: [&str; 6] = ["Vec", "VecDeque", "HashSet", "BTreeSet", "LinkedList", "BinaryHeap"];
const TRANSPARENT_WRAPPERS: [&str; 5] = ["Box", "Rc", "Arc", "Cow", "RefCell"];

/// Base type implied by a bare type name, if the name is recognized.
pub(crate) fn base_type_of_name(name: &str) -> Option<BaseType> {
    if NUMBER_LIKE.is_match(name) {
        Some(BaseType::Number)
    } else if STRING_LIKE.is_match(name) {
        Some(BaseType::String)
    } else if BOOLEAN_LIKE.is_match(name) {
        Some(BaseType::Boolean)
    } else {
        None
    }
}

/// Resolve a union by preference: number, then string, then boolean.
///
/// `text` is the textual form of the union (member types, trait bounds).
pub(crate) fn prefer_union<'a>(members: impl IntoIterator<Item = &'a str>) -> BaseType {
    let found: Vec<BaseType> = members
        .into_iter()
        .flat_map(|text| IDENT.find_iter(text).map(|m| m.as_str()))
        .filter_map(base_type_of_name)
        .collect();
    [BaseType::Number, BaseType::String, BaseType::Boolean]
        .into_iter()
        .find(|preferred| found.contains(preferred))
        .unwrap_or(BaseType::Object)
}

/// Find the body of `struct name { ... }` in `text`.
pub(crate) fn find_struct_literal<'t>(text: &'t str, name: &str) -> Option<&'t str> {
    let pattern = format!(r"\bstruct\s+{}\b[^{{;(]*\{{", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let open = re.find(text)?.end() - 1;

    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the fields of a struct literal body into properties.
pub(crate) fn parse_struct_fields(body: &str) -> Vec<PropertySpec> {
    let without_comments = COMMENT.replace_all(body, "");
    let cleaned = ATTRIBUTE.replace_all(&without_comments, "");

    split_top_level(&cleaned, ',')
        .into_iter()
        .filter_map(|field| {
            let captures = FIELD.captures(field)?;
            let name = captures.get(1)?.as_str();
            let ty = captures.get(2)?.as_str();
            Some(PropertySpec::new(name, classify_text(ty)))
        })
        .collect()
}

/// Classify a type from its text alone.
pub(crate) fn classify_text(ty: &str) -> TypeModel {
    let ty = strip_reference(ty.trim());

    if let Some(inner) = generic_inner(ty, "Option") {
        return classify_text(inner).nullable();
    }
    for wrapper in ARRAY_WRAPPERS {
        if let Some(inner) = generic_inner(ty, wrapper) {
            return classify_text(inner).array();
        }
    }
    for wrapper in TRANSPARENT_WRAPPERS {
        if let Some(inner) = generic_inner(ty, wrapper) {
            return classify_text(inner);
        }
    }
    if let Some(inner) = ty.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let element = split_top_level(inner, ';').into_iter().next().unwrap_or(inner);
        return classify_text(element).array();
    }

    let head = ty.split('<').next().unwrap_or(ty);
    let name = head.rsplit("::").next().unwrap_or(head).trim();
    TypeModel::new(base_type_of_name(name).unwrap_or(BaseType::Object))
}

/// `Wrapper<inner>` -> `inner`, matching the last path segment only.
fn generic_inner<'t>(ty: &'t str, wrapper: &str) -> Option<&'t str> {
    let open = ty.find('<')?;
    let head = ty[..open].trim();
    let last = head.rsplit("::").next().unwrap_or(head);
    if last != wrapper || !ty.ends_with('>') {
        return None;
    }
    let inner = &ty[open + 1..ty.len() - 1];
    // `Cow<'a, str>`: skip lifetimes and take the first type argument.
    split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .find(|arg| !arg.starts_with('\''))
}

fn strip_reference(mut ty: &str) -> &str {
    while let Some(rest) = ty.strip_prefix('&') {
        ty = rest.trim_start();
        if ty.starts_with('\'') {
            ty = ty.split_once(char::is_whitespace).map_or("", |(_, rest)| rest);
        }
        ty = ty.strip_prefix("mut ").unwrap_or(ty).trim_start();
    }
    ty
}

/// Split on `separator` outside of any bracket pair.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = '\0';

    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' if prev == '-' => {}
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&text[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn name_patterns() {
        assert_eq!(base_type_of_name("f64"), Some(BaseType::Number));
        assert_eq!(base_type_of_name("Decimal"), Some(BaseType::Number));
        assert_eq!(base_type_of_name("usize"), Some(BaseType::Number));
        assert_eq!(base_type_of_name("String"), Some(BaseType::String));
        assert_eq!(base_type_of_name("bool"), Some(BaseType::Boolean));
        assert_eq!(base_type_of_name("Holding"), None);
    }

    #[test]
    fn union_prefers_number_then_string_then_boolean() {
        assert_eq!(prefer_union(["bool", "String", "f64"]), BaseType::Number);
        assert_eq!(prefer_union(["bool", "String"]), BaseType::String);
        assert_eq!(prefer_union(["impl Into<bool>"]), BaseType::Boolean);
        assert_eq!(prefer_union(["Holding"]), BaseType::Object);
    }

    #[test]
    fn finds_struct_literal_with_nested_braces() {
        let text = "struct Other { a: f64 }\npub struct Loan<T> where T: Copy { principal: f64, meta: Meta<{ 1 }> }";
        assert_eq!(
            find_struct_literal(text, "Loan").map(str::trim),
            Some("principal: f64, meta: Meta<{ 1 }>")
        );
        assert_eq!(find_struct_literal(text, "Missing"), None);
        assert_eq!(find_struct_literal(text, "Oth"), None);
    }

    #[test]
    fn parses_fields_ignoring_comments_and_attributes() {
        let body = r#"
            /// The amount borrowed
            pub principal: f64,
            #[serde(rename = "r")]
            pub(crate) rate: Option<Decimal>, // yearly
            /* free-form */ label: &'static str,
            history: Vec<HashMap<String, f64>>,
            active: bool,
            callback: fn(f64) -> f64,
        "#;
        let fields = parse_struct_fields(body);
        let summary: Vec<_> = fields
            .iter()
            .map(|p| {
                (
                    p.name.as_str(),
                    p.type_model.base_type,
                    p.type_model.nullable,
                    p.type_model.is_array,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("principal", BaseType::Number, false, false),
                ("rate", BaseType::Number, true, false),
                ("label", BaseType::String, false, false),
                ("history", BaseType::Object, false, true),
                ("active", BaseType::Boolean, false, false),
                ("callback", BaseType::Object, false, false),
            ]
        );
    }

    #[test]
    fn classify_text_handles_slices_and_paths() {
        assert_eq!(classify_text("[f64; 12]"), TypeModel::number().array());
        assert_eq!(classify_text("&[String]"), TypeModel::string().array());
        assert_eq!(classify_text("rust_decimal::Decimal"), TypeModel::number());
        assert_eq!(classify_text("Cow<'a, str>"), TypeModel::string());
    }
}
