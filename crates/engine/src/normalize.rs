//! Front end of the engine: a GraphQL document is parsed, the requested operation picked out,
//! and its selections normalized against the generated types. Fragments are expanded into type
//! conditions on the fields they select, `@skip`/`@include` are applied, and variables are
//! substituted. Anything the types do not declare is rejected here, before a service is called.

use std::collections::HashMap;

use async_graphql_parser::types::{
    Directive, DocumentOperations, ExecutableDocument, Field, FragmentDefinition,
    OperationDefinition, OperationType, Selection, SelectionSet as DocumentSelectionSet,
};
use async_graphql_parser::Positioned;
use async_graphql_value::{ConstValue, Name, Value};
use execute::{FieldSelection, SelectionSet, TypeCondition};
use indexmap::IndexMap;
use schema::{ArgumentDefinition, FieldDefinition, ObjectType, TypeReference, TypeRegistry};

use crate::error::RequestError;
use crate::host::ResolvedHostField;
use crate::types::{Engine, RawRequest, Service};

const TYPENAME: &str = "__typename";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub(crate) fn root_name(self) -> &'static str {
        match self {
            Self::Query => Engine::QUERY_ROOT,
            Self::Mutation => Engine::MUTATION_ROOT,
        }
    }
}

pub(crate) struct Operation<'e> {
    pub kind: OperationKind,
    pub root_fields: Vec<RootField<'e>>,
}

pub(crate) struct RootField<'e> {
    pub alias: String,
    pub target: RootTarget<'e>,
    pub arguments: IndexMap<String, serde_json::Value>,
    pub selection_set: SelectionSet,
}

pub(crate) enum RootTarget<'e> {
    Typename,
    Service(&'e Service),
    Host {
        field: &'e ResolvedHostField,
        service: &'e Service,
    },
}

pub(crate) fn normalize<'e>(
    engine: &'e Engine,
    request: &RawRequest,
) -> Result<Operation<'e>, RequestError> {
    let document = async_graphql_parser::parse_query(&request.query)?;
    let operation = select_operation(&document, request.operation_name.as_deref())?;
    let kind = match operation.ty {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => return Err(RequestError::SubscriptionsNotSupported),
    };
    let normalizer = Normalizer {
        fragments: &document.fragments,
        variables: variables(operation, request.variables.as_ref())?,
    };
    Ok(Operation {
        kind,
        root_fields: normalizer.root_fields(engine, kind, &operation.selection_set.node)?,
    })
}

fn select_operation<'d>(
    document: &'d ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition, RequestError> {
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Ok(&operation.node),
        (DocumentOperations::Single(_), Some(name)) => {
            Err(RequestError::OperationNotFound(name.to_string()))
        }
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .get(name)
            .map(|operation| &operation.node)
            .ok_or_else(|| RequestError::OperationNotFound(name.to_string())),
        (DocumentOperations::Multiple(operations), None) => {
            let mut operations = operations.values();
            match (operations.next(), operations.next()) {
                (Some(operation), None) => Ok(&operation.node),
                _ => Err(RequestError::OperationNameRequired),
            }
        }
    }
}

/// Values of the variables the operation defines: provided ones, then defaults, then null.
fn variables(
    operation: &OperationDefinition,
    provided: Option<&IndexMap<String, serde_json::Value>>,
) -> Result<HashMap<String, ConstValue>, RequestError> {
    let mut variables = HashMap::new();
    for definition in &operation.variable_definitions {
        let definition = &definition.node;
        let name = definition.name.node.as_str();
        let value = match provided.and_then(|provided| provided.get(name)) {
            Some(value) => {
                ConstValue::from_json(value.clone()).map_err(RequestError::InvalidVariables)?
            }
            None => definition
                .default_value
                .as_ref()
                .map_or(ConstValue::Null, |default| default.node.clone()),
        };
        if value == ConstValue::Null && !definition.var_type.node.nullable {
            return Err(RequestError::MissingVariable(name.to_string()));
        }
        variables.insert(name.to_string(), value);
    }
    Ok(variables)
}

/// A field of a selection set, with the type conditions of the fragments it was selected
/// through, outermost first.
struct Collected<'d> {
    field: &'d Field,
    conditions: Vec<&'d str>,
}

/// The type whose fields a selection set selects.
struct Scope<'r> {
    registry: &'r TypeRegistry,
    type_name: &'r str,
    /// Where the fields are declared. `None` for unions whose base variant was pruned.
    fields: Option<&'r ObjectType>,
    /// Registry keys of the objects a value can be. Empty for the service roots.
    possible_types: Vec<&'r str>,
}

impl<'r> Scope<'r> {
    fn root(registry: &'r TypeRegistry, root: &'r ObjectType) -> Self {
        Self {
            registry,
            type_name: root.name.as_str(),
            fields: Some(root),
            possible_types: Vec::new(),
        }
    }

    /// `None` unless `key` is an object or a union.
    fn of(registry: &'r TypeRegistry, key: &str) -> Option<Self> {
        let descriptor = registry.get(key).filter(|descriptor| descriptor.is_composite())?;
        Some(Self {
            registry,
            type_name: descriptor.name().as_str(),
            fields: registry.concrete_object(key).map(|(_, object)| object),
            possible_types: registry.possible_types(key),
        })
    }
}

struct Normalizer<'d> {
    fragments: &'d HashMap<Name, Positioned<FragmentDefinition>>,
    variables: HashMap<String, ConstValue>,
}

impl<'d> Normalizer<'d> {
    fn root_fields<'e>(
        &self,
        engine: &'e Engine,
        kind: OperationKind,
        selection_set: &'d DocumentSelectionSet,
    ) -> Result<Vec<RootField<'e>>, RequestError> {
        let root_name = kind.root_name();
        self.collect_fields(selection_set)?
            .into_iter()
            .map(|Collected { field, conditions }| {
                if let Some(condition) = conditions.into_iter().find(|name| *name != root_name) {
                    return Err(RequestError::InvalidTypeCondition {
                        condition: condition.to_string(),
                        type_name: root_name.to_string(),
                    });
                }
                let name = field.name.node.as_str();
                let alias = field.response_key().node.to_string();

                if name == TYPENAME {
                    leaf_only(field)?;
                    return Ok(RootField {
                        alias,
                        target: RootTarget::Typename,
                        arguments: IndexMap::new(),
                        selection_set: SelectionSet::default(),
                    });
                }

                if let Some(service) = engine.services.get(name) {
                    let root = match kind {
                        OperationKind::Query => &service.registry.query_root,
                        OperationKind::Mutation => &service.registry.mutation_root,
                    };
                    if field.selection_set.node.items.is_empty() {
                        return Err(RequestError::SelectionRequired {
                            field_name: name.to_string(),
                        });
                    }
                    return Ok(RootField {
                        alias,
                        target: RootTarget::Service(service),
                        arguments: self.arguments(name, &IndexMap::new(), &field.arguments)?,
                        selection_set: self.selection_set(
                            &Scope::root(&service.registry, root),
                            &field.selection_set.node,
                        )?,
                    });
                }

                let host = engine
                    .host_fields
                    .get(name)
                    .filter(|_| kind == OperationKind::Query)
                    .and_then(|host| {
                        engine
                            .services
                            .get(&host.prefix)
                            .map(|service| (host, service))
                    });
                if let Some((host, service)) = host {
                    return Ok(RootField {
                        alias,
                        target: RootTarget::Host {
                            field: host,
                            service,
                        },
                        arguments: self.arguments(
                            name,
                            &host.definition.arguments,
                            &field.arguments,
                        )?,
                        selection_set: self.subselection(
                            &service.registry,
                            &host.definition,
                            field,
                        )?,
                    });
                }

                Err(RequestError::UnknownField {
                    type_name: root_name.to_string(),
                    field_name: name.to_string(),
                })
            })
            .collect()
    }

    fn selection_set(
        &self,
        scope: &Scope<'_>,
        selection_set: &'d DocumentSelectionSet,
    ) -> Result<SelectionSet, RequestError> {
        let fields = self
            .collect_fields(selection_set)?
            .into_iter()
            .map(|collected| self.field(scope, collected))
            .collect::<Result<_, _>>()?;
        Ok(SelectionSet { fields })
    }

    fn field(
        &self,
        scope: &Scope<'_>,
        Collected { field, conditions }: Collected<'d>,
    ) -> Result<FieldSelection, RequestError> {
        let (object, type_condition) = narrow(scope, &conditions)?;
        let name = field.name.node.as_str();
        let mut selection = FieldSelection::new(name);
        selection.alias = field.response_key().node.to_string();

        if name != TYPENAME {
            let definition = object
                .and_then(|object| object.fields.get(name))
                .ok_or_else(|| RequestError::UnknownField {
                    type_name: type_condition
                        .as_ref()
                        .map_or(scope.type_name, |condition| condition.type_name.as_str())
                        .to_string(),
                    field_name: name.to_string(),
                })?;
            selection.arguments = self.arguments(name, &definition.arguments, &field.arguments)?;
            selection.selection_set = self.subselection(scope.registry, definition, field)?;
        } else {
            leaf_only(field)?;
        }
        selection.type_condition = type_condition;
        Ok(selection)
    }

    fn subselection(
        &self,
        registry: &TypeRegistry,
        definition: &FieldDefinition,
        field: &'d Field,
    ) -> Result<SelectionSet, RequestError> {
        let selection_set = &field.selection_set.node;
        let scope = definition
            .field_type
            .registry_key()
            .and_then(|key| Scope::of(registry, key));
        match scope {
            Some(_) if selection_set.items.is_empty() => Err(RequestError::SelectionRequired {
                field_name: definition.name.clone(),
            }),
            Some(scope) => self.selection_set(&scope, selection_set),
            None => {
                leaf_only(field)?;
                Ok(SelectionSet::default())
            }
        }
    }

    fn arguments(
        &self,
        field_name: &str,
        definitions: &IndexMap<String, ArgumentDefinition>,
        arguments: &[(Positioned<Name>, Positioned<Value>)],
    ) -> Result<IndexMap<String, serde_json::Value>, RequestError> {
        let mut values = IndexMap::new();
        for (name, value) in arguments {
            let name = name.node.as_str();
            if !definitions.contains_key(name) {
                return Err(RequestError::UnknownArgument {
                    field_name: field_name.to_string(),
                    argument: name.to_string(),
                });
            }
            values.insert(name.to_string(), self.value(&value.node)?);
        }
        for definition in definitions.values() {
            let required = matches!(definition.argument_type, TypeReference::NonNull(_));
            if required && values.get(&definition.name).map_or(true, serde_json::Value::is_null) {
                return Err(RequestError::MissingArgument {
                    field_name: field_name.to_string(),
                    argument: definition.name.clone(),
                });
            }
        }
        Ok(values)
    }

    fn value(&self, value: &Value) -> Result<serde_json::Value, RequestError> {
        value
            .clone()
            .into_const_with(|name| {
                self.variables
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| RequestError::UndefinedVariable(name.to_string()))
            })?
            .into_json()
            .map_err(RequestError::InvalidValue)
    }

    /// Flattens fragments into the list of fields they select.
    fn collect_fields(
        &self,
        selection_set: &'d DocumentSelectionSet,
    ) -> Result<Vec<Collected<'d>>, RequestError> {
        let mut collected = Vec::new();
        self.collect(selection_set, &[], &mut Vec::new(), &mut collected)?;
        Ok(collected)
    }

    fn collect(
        &self,
        selection_set: &'d DocumentSelectionSet,
        conditions: &[&'d str],
        spreading: &mut Vec<&'d str>,
        collected: &mut Vec<Collected<'d>>,
    ) -> Result<(), RequestError> {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.included(&field.node.directives)? {
                        collected.push(Collected {
                            field: &field.node,
                            conditions: conditions.to_vec(),
                        });
                    }
                }
                Selection::InlineFragment(fragment) => {
                    let fragment = &fragment.node;
                    if !self.included(&fragment.directives)? {
                        continue;
                    }
                    let mut inner = conditions.to_vec();
                    if let Some(condition) = &fragment.type_condition {
                        inner.push(condition.node.on.node.as_str());
                    }
                    self.collect(&fragment.selection_set.node, &inner, spreading, collected)?;
                }
                Selection::FragmentSpread(spread) => {
                    let spread = &spread.node;
                    if !self.included(&spread.directives)? {
                        continue;
                    }
                    let name = spread.fragment_name.node.as_str();
                    if spreading.contains(&name) {
                        return Err(RequestError::FragmentCycle(name.to_string()));
                    }
                    let fragment = &self
                        .fragments
                        .get(name)
                        .ok_or_else(|| RequestError::FragmentNotFound(name.to_string()))?
                        .node;
                    let mut inner = conditions.to_vec();
                    inner.push(fragment.type_condition.node.on.node.as_str());
                    spreading.push(name);
                    self.collect(&fragment.selection_set.node, &inner, spreading, collected)?;
                    spreading.pop();
                }
            }
        }
        Ok(())
    }

    /// Applies `@skip(if:)` and `@include(if:)`.
    fn included(&self, directives: &[Positioned<Directive>]) -> Result<bool, RequestError> {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            let include_when = match name {
                "skip" => false,
                "include" => true,
                _ => continue,
            };
            let condition = directive
                .node
                .get_argument("if")
                .map(|value| self.value(&value.node))
                .transpose()?;
            match condition {
                Some(serde_json::Value::Bool(condition)) if condition != include_when => {
                    return Ok(false)
                }
                Some(serde_json::Value::Bool(_)) => {}
                _ => {
                    return Err(RequestError::InvalidDirective {
                        directive: name.to_string(),
                    })
                }
            }
        }
        Ok(true)
    }
}

fn leaf_only(field: &Field) -> Result<(), RequestError> {
    if field.selection_set.node.items.is_empty() {
        Ok(())
    } else {
        Err(RequestError::SelectionNotAllowed {
            field_name: field.name.node.to_string(),
        })
    }
}

/// Applies the type conditions a field was selected through. Returns the object declaring the
/// fields of the narrowest condition and, if the conditions exclude some of the scope's
/// possible types, the condition the field carries.
fn narrow<'r>(
    scope: &Scope<'r>,
    conditions: &[&str],
) -> Result<(Option<&'r ObjectType>, Option<TypeCondition>), RequestError> {
    let mut fields = scope.fields;
    let mut possible_types = scope.possible_types.clone();
    let mut narrowest = None;
    for &condition in conditions {
        if condition == scope.type_name {
            continue;
        }
        let invalid = || RequestError::InvalidTypeCondition {
            condition: condition.to_string(),
            type_name: scope.type_name.to_string(),
        };
        let (key, descriptor) = scope
            .registry
            .find_by_graphql_name(condition)
            .ok_or_else(|| RequestError::UnknownType(condition.to_string()))?;
        if !descriptor.is_composite() {
            return Err(invalid());
        }
        let candidates = scope.registry.possible_types(key);
        possible_types.retain(|possible| candidates.contains(possible));
        if possible_types.is_empty() {
            return Err(invalid());
        }
        fields = scope.registry.concrete_object(key).map(|(_, object)| object);
        narrowest = Some(condition);
    }
    let condition = narrowest
        .filter(|_| possible_types.len() < scope.possible_types.len())
        .map(|type_name| TypeCondition {
            type_name: type_name.to_string(),
            possible_types: possible_types.iter().map(ToString::to_string).collect(),
        });
    Ok((fields, condition))
}
