use std::collections::BTreeMap;

use indexmap::IndexMap;

/// Annotations of one type, keyed by property name. Annotations of the type itself are stored
/// under the empty property name.
pub type PropertyAnnotations = IndexMap<String, Vec<Annotation>>;

/// Vocabulary annotations grouped by their target.
///
/// Targets are reduced to the unqualified, lower-cased type name plus an optional property name,
/// so `Trippin.Person/Emails` is stored under `("person", "Emails")`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTargets(BTreeMap<String, PropertyAnnotations>);

impl AnnotationTargets {
    /// Records an annotation for a `Target` path as written in an `<Annotations>` block.
    pub fn insert_for_target(&mut self, target: &str, annotation: Annotation) {
        let path = target.rsplit('.').next().unwrap_or(target);
        let mut segments = path.split('/');
        let type_name = segments.next().unwrap_or_default();
        let property = segments.next().unwrap_or_default();
        self.insert(type_name, property, annotation);
    }

    pub fn insert(&mut self, type_name: &str, property: &str, annotation: Annotation) {
        self.0
            .entry(type_name.to_lowercase())
            .or_default()
            .entry(property.to_string())
            .or_default()
            .push(annotation);
    }

    /// Annotations for a type, looked up case-insensitively by its unqualified name.
    pub fn for_type(&self, type_name: &str) -> Option<&PropertyAnnotations> {
        self.0.get(&type_name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One `<Annotation>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Fully qualified term, e.g. `Org.OData.Capabilities.V1.FilterRestrictions`.
    pub term: String,
    /// Inline constant expressions such as `Bool="false"` or `String="..."`.
    pub attributes: BTreeMap<String, String>,
    /// Text of a child constant expression such as `<Bool>false</Bool>`.
    pub text: Option<String>,
    /// `PropertyValue`s of a `<Record>` value, keyed by property.
    pub record: IndexMap<String, PropertyValue>,
    /// The element as written in the document.
    pub raw: String,
}

impl Annotation {
    pub fn string(&self) -> Option<&str> {
        self.attributes
            .get("String")
            .map(String::as_str)
            .or(self.text.as_deref())
    }

    pub fn bool(&self) -> Option<bool> {
        self.attributes
            .get("Bool")
            .map(String::as_str)
            .or(self.text.as_deref())
            .map(parse_bool)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.record.get(name)
    }
}

/// One `<PropertyValue>` of an annotation record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyValue {
    pub attributes: BTreeMap<String, String>,
    /// Text of the first child element, e.g. `<EnumMember>...</EnumMember>`.
    pub text: Option<String>,
}

impl PropertyValue {
    /// The boolean value exactly as written.
    pub fn raw_bool(&self) -> &str {
        self.attributes
            .get("Bool")
            .or(self.text.as_ref())
            .map_or("", String::as_str)
    }

    pub fn bool(&self) -> Option<bool> {
        let raw = self.raw_bool();
        (!raw.is_empty()).then(|| parse_bool(raw))
    }

    pub fn enum_member(&self) -> Option<&str> {
        self.attributes
            .get("EnumMember")
            .or(self.text.as_ref())
            .map(String::as_str)
    }
}

fn parse_bool(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
