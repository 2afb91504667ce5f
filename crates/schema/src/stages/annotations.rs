//! Capability and core vocabulary annotations: they describe types and fields, and decide which
//! OData query options are offered as arguments.

use indexmap::IndexMap;

use crate::registry::BASE_SUFFIX;
use crate::types::{ArgumentDefinition, ResolverKind, ScalarType, TypeDescriptor, TypeReference};

use super::Types;

const CORE: &str = "Org.OData.Core.V1.";
const CAPABILITIES: &str = "Org.OData.Capabilities.V1.";

/// What the annotations of one target amount to.
#[derive(Debug, Default)]
struct Capabilities {
    description: Option<String>,
    long_description: Option<String>,
    notes: Vec<String>,
    countable: Option<bool>,
    top: Option<bool>,
    skip: Option<bool>,
    search: Option<bool>,
    filter: Option<bool>,
    order_by: Option<bool>,
    expandable: Option<bool>,
    selectable: Option<bool>,
}

impl Capabilities {
    fn from_annotations(annotations: &[edm::Annotation]) -> Self {
        let mut capabilities = Self::default();
        for annotation in annotations {
            capabilities.apply(annotation);
        }
        capabilities
    }

    fn apply(&mut self, annotation: &edm::Annotation) {
        let term = annotation.term.as_str();
        let record = |property: &str| annotation.property(property);

        if let Some(core_term) = term.strip_prefix(CORE) {
            match core_term {
                "Description" => {
                    self.description = annotation.string().map(ToString::to_string);
                }
                "LongDescription" => {
                    self.long_description = annotation.string().map(ToString::to_string);
                }
                "ChangeTracking" => self.change_tracking(annotation),
                "Computed" => {
                    if annotation.bool() == Some(true) {
                        self.notes.push(
                            "A value for this property is generated on both insert and update"
                                .to_string(),
                        );
                    }
                }
                "Permissions" => {}
                _ => self.unknown(annotation),
            }
            return;
        }

        let Some(capability_term) = term.strip_prefix(CAPABILITIES) else {
            self.unknown(annotation);
            return;
        };
        match capability_term {
            "ChangeTracking" => self.change_tracking(annotation),
            "ExpandRestrictions" => {
                self.expandable = record("Expandable").and_then(edm::PropertyValue::bool);
            }
            "SelectRestrictions" => {
                self.selectable = record("Selectable").and_then(edm::PropertyValue::bool);
            }
            "NavigationRestrictions" => {
                if let Some(navigability) = record("Navigability").and_then(|value| value.enum_member())
                {
                    let navigability = navigability
                        .strip_prefix("Org.OData.Capabilities.V1.NavigationType/")
                        .unwrap_or(navigability);
                    self.notes.push(format!("Navigability: {navigability}"));
                }
            }
            "SearchRestrictions" => {
                self.search = record("Searchable").and_then(edm::PropertyValue::bool);
            }
            "CountRestrictions" => {
                self.countable = record("Countable").and_then(edm::PropertyValue::bool);
            }
            "FilterRestrictions" => {
                self.filter = record("Filterable").and_then(edm::PropertyValue::bool);
            }
            "SortRestrictions" => {
                self.order_by = record("Sortable").and_then(edm::PropertyValue::bool);
            }
            "SkipSupported" => self.skip = annotation.bool(),
            "TopSupported" => self.top = annotation.bool(),
            "InsertRestrictions" => {
                if let Some(value) = record("Insertable") {
                    self.notes
                        .push(format!("Entities can be inserted: {}", value.raw_bool()));
                }
            }
            "UpdateRestrictions" => {
                if let Some(value) = record("Updatable") {
                    self.notes
                        .push(format!("Entities can be updated: {}", value.raw_bool()));
                }
            }
            "DeleteRestrictions" => {
                if let Some(value) = record("Deletable") {
                    self.notes
                        .push(format!("Entities can be deleted: {}", value.raw_bool()));
                }
            }
            _ => self.unknown(annotation),
        }
    }

    fn change_tracking(&mut self, annotation: &edm::Annotation) {
        if let Some(supported) = annotation.property("Supported") {
            self.notes.push(format!(
                "This entity set supports the odata.track-changes preference: {}",
                supported.raw_bool()
            ));
        }
    }

    fn unknown(&mut self, annotation: &edm::Annotation) {
        self.notes
            .push(format!("{}: {}", annotation.term, annotation.raw));
    }

    fn description(&self) -> Option<String> {
        let notes = self.notes.join("\n");
        let parts: Vec<&str> = [
            self.description.as_deref(),
            self.long_description.as_deref(),
            Some(notes.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }

    /// Query options, each offered unless the annotations declare it unsupported.
    fn arguments(&self) -> IndexMap<String, ArgumentDefinition> {
        let mut arguments = Vec::new();
        if self.countable != Some(false) {
            arguments.push(ArgumentDefinition::new(
                "_count",
                TypeReference::Scalar(ScalarType::Boolean),
            ));
        }
        if self.top != Some(false) {
            arguments.push(
                ArgumentDefinition::new("_top", TypeReference::Scalar(ScalarType::Int))
                    .with_description("Return at most this many records"),
            );
        }
        match self.skip {
            Some(true) => arguments.push(
                ArgumentDefinition::new("_skip", TypeReference::Scalar(ScalarType::Int))
                    .with_description("Skip this many records"),
            ),
            None => arguments.push(
                ArgumentDefinition::new("_skip", TypeReference::Scalar(ScalarType::Int))
                    .with_description("Skip this many records, may or may not be supported"),
            ),
            Some(false) => {}
        }
        match self.search {
            Some(true) => arguments.push(
                ArgumentDefinition::new("_search", TypeReference::Scalar(ScalarType::String))
                    .with_description("Search String"),
            ),
            None => arguments.push(
                ArgumentDefinition::new("_search", TypeReference::Scalar(ScalarType::String))
                    .with_description("Search String, may or may not be supported"),
            ),
            Some(false) => {}
        }
        if self.filter != Some(false) {
            arguments.push(
                ArgumentDefinition::new("_filter", TypeReference::Scalar(ScalarType::String))
                    .with_description(
                        "Filter string see https://help.nintex.com/en-us/insight/OData/HE_CON_ODATAQueryCheatSheet.htm#Filter for examples",
                    ),
            );
        }
        if self.order_by != Some(false) {
            arguments.push(
                ArgumentDefinition::new("_orderby", TypeReference::Scalar(ScalarType::String))
                    .with_description(
                        "Fields to order by, comma separated. You may also add ' asc' or ' desc' to set the sort direction",
                    ),
            );
        }
        arguments
            .into_iter()
            .map(|argument| (argument.name.clone(), argument))
            .collect()
    }
}

fn annotation_key(registry_key: &str) -> &str {
    registry_key
        .strip_suffix(BASE_SUFFIX)
        .unwrap_or(registry_key)
}

/// Query-option arguments for the type `key`, as derived from its type-level annotations.
pub(crate) fn type_arguments(
    edm: &edm::EdmDocument,
    key: &str,
) -> IndexMap<String, ArgumentDefinition> {
    let annotations = edm
        .annotations
        .for_type(annotation_key(key))
        .and_then(|targets| targets.get(""))
        .map_or(&[][..], Vec::as_slice);
    Capabilities::from_annotations(annotations).arguments()
}

/// Applies annotations to every type. Type-level annotations set the description, flags and
/// query-option arguments of a type; objects without annotations still get the default
/// arguments. Property-level annotations describe the field, and collection-valued navigation
/// fields also get the query options the annotations allow.
pub(crate) fn resolve(edm: &edm::EdmDocument, types: &mut Types) {
    for (key, descriptor) in types.iter_mut() {
        let targets = edm.annotations.for_type(annotation_key(key));

        if let TypeDescriptor::Object(object) = &mut *descriptor {
            let type_level = targets
                .and_then(|targets| targets.get(""))
                .map_or(&[][..], Vec::as_slice);
            let capabilities = Capabilities::from_annotations(type_level);
            object.description = capabilities.description();
            object.arguments = capabilities.arguments();
            if let Some(expandable) = capabilities.expandable {
                object.expandable = expandable;
            }
            if let Some(selectable) = capabilities.selectable {
                object.selectable = selectable;
            }
        }

        let Some(targets) = targets else {
            continue;
        };
        for (property, annotations) in targets {
            let capabilities = Capabilities::from_annotations(annotations);
            match (property.as_str(), &mut *descriptor) {
                ("", TypeDescriptor::Object(_)) => {}
                ("", TypeDescriptor::Union(union)) => {
                    union.description = capabilities.description();
                }
                ("", TypeDescriptor::Enum(enum_type)) => {
                    enum_type.description = capabilities.description();
                }
                (property, TypeDescriptor::Object(object)) => {
                    let Some(field) = object.fields.get_mut(property) else {
                        continue;
                    };
                    field.description = capabilities.description();
                    if field.resolver == ResolverKind::Navigation && field.field_type.is_list() {
                        field.arguments.extend(capabilities.arguments());
                    }
                }
                (_, TypeDescriptor::Union(_) | TypeDescriptor::Enum(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn annotation(term: &str, record: &[(&str, &str)]) -> edm::Annotation {
        edm::Annotation {
            term: term.to_string(),
            attributes: BTreeMap::new(),
            text: None,
            record: record
                .iter()
                .map(|(property, value)| {
                    let mut attributes = BTreeMap::new();
                    attributes.insert("Bool".to_string(), (*value).to_string());
                    (
                        (*property).to_string(),
                        edm::PropertyValue {
                            attributes,
                            text: None,
                        },
                    )
                })
                .collect(),
            raw: format!("<Annotation Term=\"{term}\" />"),
        }
    }

    fn argument_names(capabilities: &Capabilities) -> Vec<String> {
        capabilities.arguments().keys().cloned().collect()
    }

    #[test]
    fn every_query_option_is_offered_by_default() {
        let capabilities = Capabilities::default();
        assert_eq!(
            argument_names(&capabilities),
            vec!["_count", "_top", "_skip", "_search", "_filter", "_orderby"]
        );
        assert_eq!(
            capabilities.arguments()["_skip"].description.as_deref(),
            Some("Skip this many records, may or may not be supported")
        );
        assert_eq!(capabilities.description(), None);
    }

    #[test]
    fn restrictions_remove_query_options() {
        let capabilities = Capabilities::from_annotations(&[
            annotation(
                "Org.OData.Capabilities.V1.FilterRestrictions",
                &[("Filterable", "false")],
            ),
            annotation(
                "Org.OData.Capabilities.V1.CountRestrictions",
                &[("Countable", "false")],
            ),
            annotation(
                "Org.OData.Capabilities.V1.SearchRestrictions",
                &[("Searchable", "true")],
            ),
            annotation(
                "Org.OData.Capabilities.V1.SortRestrictions",
                &[("Sortable", "false")],
            ),
        ]);
        assert_eq!(
            argument_names(&capabilities),
            vec!["_top", "_skip", "_search"]
        );
        assert_eq!(
            capabilities.arguments()["_search"].description.as_deref(),
            Some("Search String")
        );
    }

    #[test]
    fn descriptions_join_text_and_notes() {
        let mut description = annotation("Org.OData.Core.V1.Description", &[]);
        description
            .attributes
            .insert("String".into(), "An airline".into());
        let capabilities = Capabilities::from_annotations(&[
            description,
            annotation(
                "Org.OData.Capabilities.V1.InsertRestrictions",
                &[("Insertable", "false")],
            ),
            annotation("Com.Contoso.Audited", &[]),
        ]);
        assert_eq!(
            capabilities.description().as_deref(),
            Some(
                "An airline\n\nEntities can be inserted: false\nCom.Contoso.Audited: <Annotation Term=\"Com.Contoso.Audited\" />"
            )
        );
    }
}
