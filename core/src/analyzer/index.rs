//! Index of the type declarations visible to the analyzer.

use std::collections::HashMap;
use syn::{Item, ItemEnum, ItemStruct, Type};

/// Structs, enums and aliases declared in every successfully parsed unit,
/// plus the raw text of all units for the textual fallback.
///
/// Names are indexed by their bare identifier. Two declarations with the same
/// name in different modules collide; the first one wins.
#[derive(Default)]
pub(crate) struct TypeIndex<'a> {
    structs: HashMap<String, &'a ItemStruct>,
    enums: HashMap<String, &'a ItemEnum>,
    aliases: HashMap<String, &'a Type>,
    raw_texts: Vec<&'a str>,
}

pub(crate) enum Declaration<'a> {
    Struct(&'a ItemStruct),
    Enum(&'a ItemEnum),
    Alias(&'a Type),
}

impl<'a> TypeIndex<'a> {
    pub fn build(
        files: impl IntoIterator<Item = &'a syn::File>,
        raw_texts: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut index = Self {
            raw_texts: raw_texts.into_iter().collect(),
            ..Self::default()
        };
        for file in files {
            index.add_items(&file.items);
        }
        index
    }

    fn add_items(&mut self, items: &'a [Item]) {
        for item in items {
            match item {
                Item::Struct(s) => {
                    self.structs.entry(s.ident.to_string()).or_insert(s);
                }
                Item::Enum(e) => {
                    self.enums.entry(e.ident.to_string()).or_insert(e);
                }
                Item::Type(t) => {
                    self.aliases.entry(t.ident.to_string()).or_insert(&t.ty);
                }
                Item::Mod(m) => {
                    if let Some((_, items)) = &m.content {
                        self.add_items(items);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Declaration<'a>> {
        if let Some(s) = self.structs.get(name) {
            return Some(Declaration::Struct(s));
        }
        if let Some(e) = self.enums.get(name) {
            return Some(Declaration::Enum(e));
        }
        self.aliases.get(name).map(|t| Declaration::Alias(t))
    }

    pub fn raw_texts(&self) -> &[&'a str] {
        &self.raw_texts
    }
}
