use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};

use crate::error::Error;
use crate::registry::BASE_SUFFIX;
use crate::types::{TypeDescriptor, TypeName, UnionType};

use super::{object, object_mut, Service, Types};

/// Declared `BaseType` edges between structured types of the document.
#[derive(Debug, Default)]
pub(crate) struct Inheritance {
    /// `(child, base)` pairs, ordered so that a type appears as a child before it appears as a
    /// base.
    edges: Vec<(String, String)>,
}

impl Inheritance {
    fn children_by_base(&self) -> IndexMap<&str, Vec<&str>> {
        let mut children: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (child, base) in &self.edges {
            children.entry(base.as_str()).or_default().push(child.as_str());
        }
        children
    }
}

/// Orders the inheritance edges of the document. Edges to base types that are not declared are
/// ignored; a cycle is a configuration error.
pub(crate) fn resolve(edm: &edm::EdmDocument) -> Result<Inheritance, Error> {
    let known: HashSet<&str> = edm
        .structured_types
        .iter()
        .map(|structured_type| structured_type.name.as_str())
        .collect();

    let mut pending: IndexMap<&str, &str> = edm
        .structured_types
        .iter()
        .filter_map(|structured_type| {
            let base = structured_type.base_type_name()?;
            known
                .contains(base)
                .then_some((structured_type.name.as_str(), base))
        })
        .collect();

    // process types whose base is no longer pending, until nothing is pending
    let mut edges = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready: Vec<(&str, &str)> = pending
            .iter()
            .filter(|(_, base)| !pending.contains_key(**base))
            .map(|(child, base)| (*child, *base))
            .collect();

        if ready.is_empty() {
            let mut types: Vec<String> = pending.keys().map(ToString::to_string).collect();
            types.sort();
            return Err(Error::InheritanceCycle { types });
        }

        for (child, base) in ready {
            pending.shift_remove(child);
            edges.push((child.to_string(), base.to_string()));
        }
    }
    Ok(Inheritance { edges })
}

/// Replaces every base type that has subtypes with a union under the base type's name. The
/// base object moves to `{Name}_Base` and becomes a member of the union, next to every
/// descendant, so that instances of the base type itself still fit the union.
pub(crate) fn synthesize_unions(service: Service<'_>, inheritance: &Inheritance, types: &mut Types) {
    let children_by_base = inheritance.children_by_base();
    let member_key = |key: &str| {
        if children_by_base.contains_key(key) {
            format!("{key}{BASE_SUFFIX}")
        } else {
            key.to_string()
        }
    };

    for (base, children) in &children_by_base {
        if !matches!(types.get(*base), Some(TypeDescriptor::Object(_))) {
            continue;
        }

        let mut members = IndexSet::new();
        let mut queue: VecDeque<&str> = children.iter().copied().collect();
        while let Some(descendant) = queue.pop_front() {
            if members.insert(member_key(descendant)) {
                if let Some(grandchildren) = children_by_base.get(descendant) {
                    queue.extend(grandchildren.iter().copied());
                }
            }
        }
        let base_key = format!("{base}{BASE_SUFFIX}");
        members.insert(base_key.clone());

        // the union takes over the base type's position and name
        let union = TypeDescriptor::Union(UnionType {
            name: service.type_name(base),
            description: None,
            members,
            directives: Vec::new(),
        });
        let Some(TypeDescriptor::Object(mut base_object)) =
            types.insert((*base).to_string(), union)
        else {
            continue;
        };
        base_object.name = TypeName(format!("{}{BASE_SUFFIX}", base_object.name));
        types.insert(base_key, TypeDescriptor::Object(base_object));
    }
}

/// Copies every field of a base type onto its subtypes, unless the subtype declares a field
/// with the same name. Bases are complete before their own fields are copied further down.
pub(crate) fn propagate_fields(inheritance: &Inheritance, types: &mut Types) {
    for (child, base) in &inheritance.edges {
        let Some(inherited) = object(types, base).map(|base| base.fields.clone()) else {
            continue;
        };
        let Some(child) = object_mut(types, child) else {
            continue;
        };
        for (name, field) in inherited {
            child.fields.entry(name).or_insert(field);
        }
    }
}
