//! Normalized selections, as handed over by the document front end: fragments are expanded,
//! variables are substituted, and every field is known to exist on its parent type.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    pub fields: Vec<FieldSelection>,
}

impl SelectionSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    /// Response key of the field.
    pub alias: String,
    pub name: String,
    pub arguments: IndexMap<String, serde_json::Value>,
    pub selection_set: SelectionSet,
    /// Set for fields selected through a fragment on a narrower type than the parent.
    pub type_condition: Option<TypeCondition>,
}

impl FieldSelection {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            arguments: IndexMap::new(),
            selection_set: SelectionSet::default(),
            type_condition: None,
        }
    }

    /// Whether the field applies to a value whose concrete type is `type_key`.
    pub fn applies_to(&self, type_key: &str) -> bool {
        self.type_condition
            .as_ref()
            .map_or(true, |condition| condition.includes(type_key))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCondition {
    /// GraphQL name the fragment was declared on.
    pub type_name: String,
    /// Registry keys of the objects the condition holds for.
    pub possible_types: Vec<String>,
}

impl TypeCondition {
    pub fn includes(&self, type_key: &str) -> bool {
        self.possible_types.iter().any(|possible| possible == type_key)
    }
}
