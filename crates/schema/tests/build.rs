use pretty_assertions::assert_eq;
use schema::{
    Directive, Error, ResolverKind, ScalarType, TypeDescriptor, TypeName, TypeReference,
    PLACEHOLDER_FIELD, RAW_VALUE_FIELD,
};

const ZOO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="Zoo" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EnumType Name="Color">
        <Member Name="Brown" Value="1" />
        <Member Name="Black" />
      </EnumType>
      <EntityType Name="Animal">
        <Key><PropertyRef Name="id" /></Key>
        <Property Name="id" Type="Edm.Int32" Nullable="false" />
        <Property Name="Name" Type="Edm.String" />
        <Property Name="Location" Type="Edm.GeographyPoint" />
      </EntityType>
      <EntityType Name="Dog" BaseType="Zoo.Animal">
        <Property Name="Breed" Type="Edm.String" />
        <Property Name="Coat" Type="Zoo.Color" />
        <NavigationProperty Name="Friends" Type="Collection(Zoo.Animal)" />
      </EntityType>
      <EntityType Name="Cat" BaseType="Zoo.Animal">
        <Property Name="Name" Type="Edm.Int32" />
        <Property Name="Lives" Type="Edm.Int16" />
      </EntityType>
      <EntityType Name="Tag" />
      <ComplexType Name="Shape" Abstract="true" />
      <ComplexType Name="Circle" BaseType="Zoo.Shape">
        <Property Name="Radius" Type="Edm.Double" />
      </ComplexType>
      <Function Name="Describe" IsBound="true">
        <Parameter Name="bindingParameter" Type="Zoo.Animal" />
        <Parameter Name="style" Type="Edm.String" Nullable="false" />
        <Parameter Name="since" Type="Edm.Date" />
        <ReturnType Type="Edm.String" />
      </Function>
      <Function Name="CountAll" IsBound="true">
        <Parameter Name="bindingParameter" Type="Collection(Zoo.Animal)" />
        <ReturnType Type="Edm.Int32" />
      </Function>
      <EntityContainer Name="Container">
        <EntitySet Name="Animals" EntityType="Zoo.Animal" />
        <EntitySet Name="Dogs" EntityType="Zoo.Dog" />
        <EntitySet Name="Tags" EntityType="Zoo.Tag" />
        <Singleton Name="Mascot" Type="Zoo.Dog" />
      </EntityContainer>
      <Annotations Target="Zoo.Dog">
        <Annotation Term="Org.OData.Core.V1.Description" String="Good dogs" />
        <Annotation Term="Org.OData.Capabilities.V1.FilterRestrictions">
          <Record>
            <PropertyValue Property="Filterable" Bool="false" />
          </Record>
        </Annotation>
      </Annotations>
      <Annotations Target="Zoo.Dog/Friends">
        <Annotation Term="Org.OData.Capabilities.V1.TopSupported" Bool="false" />
      </Annotations>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

const BASE_URL: &str = "http://zoo.example.com/odata";

fn build_zoo() -> schema::TypeRegistry {
    let edm = edm::EdmDocument::parse(ZOO).unwrap();
    schema::build("zoo", BASE_URL, &edm, None).unwrap()
}

fn field_names(registry: &schema::TypeRegistry, key: &str) -> Vec<String> {
    registry.object(key).unwrap().fields.keys().cloned().collect()
}

#[test]
fn base_types_become_unions() {
    let registry = build_zoo();

    let Some(TypeDescriptor::Union(animal)) = registry.get("Animal") else {
        panic!("Animal should be a union");
    };
    assert_eq!(animal.name, TypeName("zoo_Animal".into()));
    assert_eq!(
        animal.members.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["Dog", "Cat", "Animal_Base"]
    );

    let animal_base = registry.object("Animal_Base").unwrap();
    assert_eq!(animal_base.name.as_str(), "zoo_Animal_Base");
    assert_eq!(
        field_names(&registry, "Animal_Base"),
        vec![RAW_VALUE_FIELD, "id", "Name", "Describe"]
    );

    assert_eq!(registry.possible_types("Animal"), vec!["Dog", "Cat", "Animal_Base"]);
    assert_eq!(registry.possible_types("Dog"), vec!["Dog"]);
    assert_eq!(
        registry.concrete_object("Animal").map(|(key, _)| key),
        Some("Animal_Base")
    );
}

#[test]
fn subtypes_inherit_fields_they_do_not_redefine() {
    let registry = build_zoo();

    assert_eq!(
        field_names(&registry, "Dog"),
        vec![RAW_VALUE_FIELD, "Breed", "Coat", "Friends", "id", "Name", "Describe"]
    );

    let cat = registry.object("Cat").unwrap();
    assert_eq!(
        cat.fields["Name"].field_type,
        TypeReference::Scalar(ScalarType::Int)
    );
    assert_eq!(cat.fields["Describe"].resolver, ResolverKind::Function);

    let describe = &cat.fields["Describe"];
    assert_eq!(
        describe.arguments["style"].argument_type,
        TypeReference::non_null(TypeReference::Scalar(ScalarType::String))
    );
    assert_eq!(
        describe.arguments["since"].argument_type,
        TypeReference::Scalar(ScalarType::Date)
    );
}

#[test]
fn fields_resolve_to_scalars_enums_and_navigations() {
    let registry = build_zoo();
    let dog = registry.object("Dog").unwrap();

    assert_eq!(dog.fields["Coat"].field_type, TypeReference::Named("Color".into()));
    let friends = &dog.fields["Friends"];
    assert_eq!(friends.resolver, ResolverKind::Navigation);
    assert_eq!(
        friends.field_type,
        TypeReference::list(TypeReference::Named("Animal".into()))
    );
    // property-level restrictions only narrow the navigation's own options
    assert!(!friends.arguments.contains_key("_top"));
    assert!(friends.arguments.contains_key("_filter"));

    // geography types have no scalar
    assert!(!registry.object("Animal_Base").unwrap().fields.contains_key("Location"));

    let Some(TypeDescriptor::Enum(color)) = registry.get("Color") else {
        panic!("Color should be an enum");
    };
    let values: Vec<(&str, &str)> = color
        .values
        .iter()
        .map(|value| (value.name.as_str(), value.value.as_str()))
        .collect();
    assert_eq!(values, vec![("Brown", "1"), ("Black", "1")]);
}

#[test]
fn empty_objects_get_a_placeholder_and_empty_bases_are_pruned() {
    let registry = build_zoo();

    assert_eq!(
        field_names(&registry, "Tag"),
        vec![RAW_VALUE_FIELD, PLACEHOLDER_FIELD]
    );

    assert!(registry.get("Shape_Base").is_none());
    let Some(TypeDescriptor::Union(shape)) = registry.get("Shape") else {
        panic!("Shape should be a union");
    };
    assert_eq!(shape.members.iter().collect::<Vec<_>>(), vec!["Circle"]);
    assert_eq!(registry.concrete_object("Shape"), None);
}

/// Every union member is a registered object.
fn assert_unions_well_formed(registry: &schema::TypeRegistry) {
    for (key, descriptor) in &registry.types {
        let TypeDescriptor::Union(union) = descriptor else {
            continue;
        };
        assert!(!union.members.is_empty(), "union {key} has no members");
        for member in &union.members {
            assert!(
                registry.object(member).is_some(),
                "union {key} lists {member}, which is not an object of the registry"
            );
        }
    }
}

#[test]
fn empty_bases_are_pruned_from_every_ancestor_union() {
    let edm = edm::EdmDocument::parse(
        r#"<Schema Namespace="Zoo">
             <EntityType Name="Animal" />
             <EntityType Name="Dog" BaseType="Zoo.Animal" />
             <EntityType Name="Puppy" BaseType="Zoo.Dog">
               <Property Name="Breed" Type="Edm.String" />
             </EntityType>
           </Schema>"#,
    )
    .unwrap();
    let registry = schema::build("zoo", BASE_URL, &edm, None).unwrap();

    assert_unions_well_formed(&registry);
    assert!(registry.get("Animal_Base").is_none());
    assert!(registry.get("Dog_Base").is_none());
    assert_eq!(registry.possible_types("Animal"), vec!["Puppy"]);
    assert_eq!(registry.possible_types("Dog"), vec!["Puppy"]);
    assert_eq!(
        field_names(&registry, "Puppy"),
        vec![RAW_VALUE_FIELD, "Breed"]
    );

    let sdl = registry.to_sdl();
    assert!(sdl.contains("union zoo_Animal = zoo_Puppy\n"), "{sdl}");
    assert!(sdl.contains("union zoo_Dog = zoo_Puppy\n"), "{sdl}");
    assert!(!sdl.contains("_Base"), "{sdl}");
}

#[test]
fn unions_of_the_zoo_only_list_registered_objects() {
    assert_unions_well_formed(&build_zoo());
}

#[test]
fn annotations_restrict_query_options() {
    let registry = build_zoo();

    let dog = registry.object("Dog").unwrap();
    assert_eq!(dog.description.as_deref(), Some("Good dogs"));
    let arguments: Vec<&str> = dog.arguments.keys().map(String::as_str).collect();
    assert_eq!(arguments, vec!["_count", "_top", "_skip", "_search", "_orderby"]);

    let dogs = &registry.query_root.fields["Dogs"];
    assert!(!dogs.arguments.contains_key("_filter"));
    assert!(registry.query_root.fields["Animals"]
        .arguments
        .contains_key("_filter"));
}

#[test]
fn container_entries_become_root_fields() {
    let registry = build_zoo();

    assert_eq!(registry.query_root.name.as_str(), "zoo");
    let animals = &registry.query_root.fields["Animals"];
    assert_eq!(animals.resolver, ResolverKind::EntitySet);
    assert_eq!(
        animals.field_type,
        TypeReference::list(TypeReference::Named("Animal".into()))
    );
    let mascot = &registry.query_root.fields["Mascot"];
    assert_eq!(mascot.resolver, ResolverKind::Singleton);
    assert_eq!(mascot.field_type, TypeReference::Named("Dog".into()));

    let sets = &registry.entity_sets;
    assert_eq!(sets.get(&TypeName("zoo_Animal".into())), Some("Animals"));
    assert_eq!(sets.get(&TypeName("zoo_Dog".into())), Some("Dogs"));
    assert_eq!(sets.get(&TypeName("zoo_Tag".into())), Some("Tags"));
    assert_eq!(sets.len(), 3);

    assert_eq!(registry.mutation_root.name.as_str(), "zooMutations");
    let placeholder = &registry.mutation_root.fields[PLACEHOLDER_FIELD];
    assert_eq!(placeholder.field_type, TypeReference::Scalar(ScalarType::Void));
}

#[test]
fn cyclic_inheritance_is_a_configuration_error() {
    let edm = edm::EdmDocument::parse(
        r#"<Schema Namespace="Loop">
             <EntityType Name="A" BaseType="Loop.B" />
             <EntityType Name="B" BaseType="Loop.A" />
             <EntityType Name="C" BaseType="Loop.A" />
           </Schema>"#,
    )
    .unwrap();

    let error = schema::build("loop", BASE_URL, &edm, None).unwrap_err();
    match error {
        Error::InheritanceCycle { types } => {
            assert_eq!(types, vec!["A", "B", "C"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn augmentation_reaches_every_type_and_the_sdl() {
    let edm = edm::EdmDocument::parse(ZOO).unwrap();
    let authorize = |descriptor: &mut TypeDescriptor| {
        if descriptor.as_object().is_some() {
            descriptor.directives_mut().push(Directive {
                name: "authorize".into(),
                arguments: [("role".to_string(), serde_json::json!("keeper"))]
                    .into_iter()
                    .collect(),
            });
        }
    };
    let registry = schema::build("zoo", BASE_URL, &edm, Some(&authorize)).unwrap();

    assert_eq!(registry.object("Dog").unwrap().directives.len(), 1);
    assert_eq!(registry.query_root.directives.len(), 1);
    assert_eq!(registry.mutation_root.directives.len(), 1);

    let sdl = registry.to_sdl();
    assert!(sdl.starts_with("schema {\n  query: zoo\n  mutation: zooMutations\n}\n"));
    assert!(sdl.contains("type zoo_Dog @authorize(role: \"keeper\") {\n"));
    assert!(sdl.contains("union zoo_Animal = zoo_Dog | zoo_Cat | zoo_Animal_Base\n"));
    assert!(sdl.contains("\"\"\"\nReturns nothing\n\"\"\"\nscalar void\n"));
    assert!(sdl.contains("scalar Date\n"));
    assert!(!sdl.contains("scalar DateTimeOffset"));
    assert!(sdl.contains("  Mascot: zoo_Dog\n"));
    assert!(sdl.contains("  Placeholder: void\n"));
    assert!(sdl.contains("    style: String!\n"));
}
