//! Mapping of `syn` types onto [`TypeModel`]s.

use super::docs::first_doc_line;
use super::fallback;
use super::index::{Declaration, TypeIndex};
use super::naming::apply_rename_rule;
use crate::model::{BaseType, Constraints, PropertySpec, TypeModel};
use quote::ToTokens;
use serde_json::Value;
use syn::{
    Attribute, Expr, ExprLit, ExprUnary, Fields, GenericArgument, ItemEnum, ItemStruct, Lit,
    LitStr, Meta, PathArguments, Type, TypeParamBound, UnOp,
};

/// Number of structural levels expanded into properties.
pub(crate) const MAX_DEPTH: usize = 2;

const MAX_ALIAS_HOPS: usize = 8;

const TRANSPARENT: [&str; 7] = ["Box", "Rc", "Arc", "Cow", "RefCell", "Cell", "Result"];
const SEQUENCES: [&str; 6] = [
    "Vec",
    "VecDeque",
    "HashSet",
    "BTreeSet",
    "LinkedList",
    "BinaryHeap",
];
const MAPS: [&str; 5] = ["HashMap", "BTreeMap", "IndexMap", "Map", "Value"];

#[derive(Clone, Copy, Default)]
struct Walk {
    depth: usize,
    alias_hops: usize,
}

impl Walk {
    fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    fn through_alias(self) -> Self {
        Self {
            alias_hops: self.alias_hops + 1,
            ..self
        }
    }

    fn can_expand(self) -> bool {
        self.depth < MAX_DEPTH
    }
}

pub(crate) struct Classifier<'a> {
    index: &'a TypeIndex<'a>,
}

impl<'a> Classifier<'a> {
    pub fn new(index: &'a TypeIndex<'a>) -> Self {
        Self { index }
    }

    pub fn classify(&self, ty: &Type) -> TypeModel {
        self.classify_with(ty, Walk::default())
    }

    fn classify_with(&self, ty: &Type, walk: Walk) -> TypeModel {
        match ty {
            Type::Reference(r) => self.classify_with(&r.elem, walk),
            Type::Paren(p) => self.classify_with(&p.elem, walk),
            Type::Group(g) => self.classify_with(&g.elem, walk),
            Type::Slice(s) => self.classify_with(&s.elem, walk).array(),
            Type::Array(a) => self.classify_with(&a.elem, walk).array(),
            Type::Tuple(t) if t.elems.is_empty() => TypeModel::object().nullable(),
            Type::ImplTrait(t) => union_of(t.bounds.iter().map(bound_text)),
            Type::TraitObject(t) => union_of(t.bounds.iter().map(bound_text)),
            Type::Path(p) if p.qself.is_none() => self.classify_path(&p.path, walk),
            _ => TypeModel::object(),
        }
    }

    fn classify_path(&self, path: &syn::Path, walk: Walk) -> TypeModel {
        let Some(segment) = path.segments.last() else {
            return TypeModel::object();
        };
        let name = segment.ident.to_string();
        let inner = first_type_arg(&segment.arguments);
        let classify_inner = |walk: Walk| {
            inner.map_or_else(TypeModel::object, |t| self.classify_with(t, walk))
        };

        if name == "Option" {
            return classify_inner(walk).nullable();
        }
        if TRANSPARENT.contains(&name.as_str()) {
            return classify_inner(walk);
        }
        if SEQUENCES.contains(&name.as_str()) {
            return classify_inner(walk).array();
        }
        if MAPS.contains(&name.as_str()) {
            return TypeModel::object();
        }
        if let Some(base) = fallback::base_type_of_name(&name) {
            return TypeModel::new(base);
        }

        match self.index.lookup(&name) {
            Some(Declaration::Struct(item)) => self.classify_struct(item, walk),
            Some(Declaration::Enum(item)) => classify_enum(item),
            Some(Declaration::Alias(target)) if walk.alias_hops < MAX_ALIAS_HOPS => {
                self.classify_with(target, walk.through_alias())
            }
            Some(Declaration::Alias(_)) => TypeModel::object(),
            None => self.classify_textually(&name, walk),
        }
    }

    fn classify_struct(&self, item: &ItemStruct, walk: Walk) -> TypeModel {
        match &item.fields {
            // A newtype is its inner type.
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                self.classify_with(&fields.unnamed[0].ty, walk)
            }
            Fields::Named(fields) if walk.can_expand() => {
                let rule = SerdeAttrs::parse(&item.attrs).rename_all;
                let properties = fields
                    .named
                    .iter()
                    .filter_map(|field| {
                        let serde = SerdeAttrs::parse(&field.attrs);
                        if serde.skip {
                            return None;
                        }
                        let ident = field.ident.as_ref()?.to_string();
                        let mut property = PropertySpec::new(
                            serialized_name(&ident, serde.rename, rule.as_deref()),
                            self.classify_with(&field.ty, walk.nested()),
                        );
                        property.description = first_doc_line(&field.attrs);
                        Some(property)
                    })
                    .collect();
                TypeModel::object().with_properties(properties)
            }
            _ => TypeModel::object(),
        }
    }

    fn classify_textually(&self, name: &str, walk: Walk) -> TypeModel {
        let literal = self
            .index
            .raw_texts()
            .iter()
            .find_map(|text| fallback::find_struct_literal(text, name));
        match literal {
            Some(body) if walk.can_expand() => {
                TypeModel::object().with_properties(fallback::parse_struct_fields(body))
            }
            Some(_) => TypeModel::object(),
            None => TypeModel::new(fallback::base_type_of_name(name).unwrap_or(BaseType::Object)),
        }
    }
}

fn classify_enum(item: &ItemEnum) -> TypeModel {
    let is_unit_enum = item
        .variants
        .iter()
        .all(|v| matches!(v.fields, Fields::Unit));
    if !is_unit_enum {
        let payloads: Vec<String> = item
            .variants
            .iter()
            .flat_map(|v| v.fields.iter())
            .map(|f| f.ty.to_token_stream().to_string())
            .collect();
        return union_of(payloads);
    }

    let rule = SerdeAttrs::parse(&item.attrs).rename_all;
    let mut next_discriminant = Some(0i64);
    let mut members = Vec::new();

    for variant in &item.variants {
        let value = match &variant.discriminant {
            Some((_, expr)) => integer_literal(expr),
            None => next_discriminant,
        };
        next_discriminant = value.and_then(|v| v.checked_add(1));

        let serde = SerdeAttrs::parse(&variant.attrs);
        let ident = variant.ident.to_string();
        if serde.skip || is_doc_hidden(&variant.attrs) || ident.starts_with("__") {
            continue;
        }
        members.push(EnumMember {
            name: serialized_name(&ident, serde.rename, rule.as_deref()),
            explicit: variant.discriminant.is_some(),
            value,
            description: first_doc_line(&variant.attrs),
        });
    }

    let numeric = members
        .first()
        .is_some_and(|first| first.explicit && first.value.is_some());
    let base = if numeric {
        BaseType::Number
    } else {
        BaseType::String
    };

    let enum_values = members
        .iter()
        .filter_map(|m| {
            if numeric {
                m.value.map(Value::from)
            } else {
                Some(Value::from(m.name.clone()))
            }
        })
        .collect();
    let properties = members
        .into_iter()
        .map(|m| {
            let mut property = PropertySpec::new(m.name, TypeModel::new(base));
            property.description = m.description;
            property
        })
        .collect();

    TypeModel::new(base)
        .with_properties(properties)
        .with_constraints(Constraints {
            enum_values: Some(enum_values),
            ..Constraints::default()
        })
}

struct EnumMember {
    name: String,
    explicit: bool,
    value: Option<i64>,
    description: Option<String>,
}

fn union_of<I>(members: I) -> TypeModel
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let texts: Vec<I::Item> = members.into_iter().collect();
    TypeModel::new(fallback::prefer_union(texts.iter().map(|t| t.as_ref())))
}

fn bound_text(bound: &TypeParamBound) -> String {
    bound.to_token_stream().to_string()
}

fn first_type_arg(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn integer_literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse().ok(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => integer_literal(expr).and_then(i64::checked_neg),
        Expr::Paren(p) => integer_literal(&p.expr),
        Expr::Group(g) => integer_literal(&g.expr),
        _ => None,
    }
}

fn is_doc_hidden(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| match &attr.meta {
        Meta::List(list) if list.path.is_ident("doc") => {
            list.tokens.to_string().trim() == "hidden"
        }
        _ => false,
    })
}

fn serialized_name(ident: &str, rename: Option<String>, rule: Option<&str>) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    rename
        .or_else(|| rule.and_then(|rule| apply_rename_rule(rule, ident)))
        .unwrap_or_else(|| ident.to_string())
}

/// The subset of `#[serde(...)]` that affects the serialized shape.
#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
}

impl SerdeAttrs {
    fn parse(attrs: &[Attribute]) -> Self {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            // Unknown keys stop the walk for this attribute; what was read so
            // far is kept.
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("rename_all") {
                    out.rename_all = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<Expr>()?;
                }
                Ok(())
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify_in(source: &str, ty: &str) -> TypeModel {
        let file = syn::parse_file(source).unwrap();
        let index = TypeIndex::build([&file], [source]);
        let ty: Type = syn::parse_str(ty).unwrap();
        Classifier::new(&index).classify(&ty)
    }

    #[test]
    fn primitives_and_wrappers() {
        assert_eq!(classify_in("", "f64"), TypeModel::number());
        assert_eq!(classify_in("", "&str"), TypeModel::string());
        assert_eq!(classify_in("", "bool"), TypeModel::boolean());
        assert_eq!(classify_in("", "Option<Arc<String>>"), TypeModel::string().nullable());
        assert_eq!(classify_in("", "Result<u32, Error>"), TypeModel::number());
        assert_eq!(classify_in("", "rust_decimal::Decimal"), TypeModel::number());
        assert_eq!(classify_in("", "HashMap<String, f64>"), TypeModel::object());
        assert_eq!(classify_in("", "()"), TypeModel::object().nullable());
    }

    #[test]
    fn sequences_unwrap_one_level() {
        assert_eq!(classify_in("", "Vec<f64>"), TypeModel::number().array());
        assert_eq!(classify_in("", "&[i32]"), TypeModel::number().array());
        assert_eq!(classify_in("", "[bool; 4]"), TypeModel::boolean().array());
        assert_eq!(
            classify_in("", "Option<BTreeSet<String>>"),
            TypeModel::string().array().nullable()
        );
    }

    #[test]
    fn struct_expansion_stops_after_two_levels() {
        let source = r#"
            struct Outer { middle: Middle }
            struct Middle { inner: Inner }
            struct Inner { value: f64 }
        "#;
        let model = classify_in(source, "Outer");
        let middle = &model.property("middle").unwrap().type_model;
        let inner = &middle.property("inner").unwrap().type_model;
        assert_eq!(inner, &TypeModel::object());
    }

    #[test]
    fn newtype_and_alias_resolve_to_inner() {
        let source = r#"
            struct Rate(f64);
            type Rates = Vec<Rate>;
        "#;
        assert_eq!(classify_in(source, "Rate"), TypeModel::number());
        assert_eq!(classify_in(source, "Rates"), TypeModel::number().array());
    }

    #[test]
    fn cyclic_aliases_terminate() {
        let source = "type A = B; type B = A;";
        assert_eq!(classify_in(source, "A"), TypeModel::object());
    }

    #[test]
    fn serde_renames_apply_to_properties() {
        let source = r#"
            #[serde(rename_all = "camelCase")]
            struct Loan {
                annual_rate: f64,
                #[serde(rename = "n")]
                periods: u32,
                #[serde(skip)]
                cache: Vec<f64>,
            }
        "#;
        let model = classify_in(source, "Loan");
        let names: Vec<_> = model
            .properties
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["annualRate", "n"]);
    }

    #[test]
    fn implicit_discriminants_continue_counting() {
        let source = "enum Level { Low = -1, Mid, High = 10, Max }";
        let model = classify_in(source, "Level");
        assert_eq!(model.base_type, BaseType::Number);
        assert_eq!(
            model.constraints.unwrap().enum_values.unwrap(),
            vec![Value::from(-1), Value::from(0), Value::from(10), Value::from(11)]
        );
    }
}
