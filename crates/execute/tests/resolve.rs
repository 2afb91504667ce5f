use std::sync::Arc;

use async_trait::async_trait;
use execute::{
    ExecutionContext, ExposeInternalErrors, FieldError, FieldSelection, HookError, Hooks,
    ODataRequest, PathSegment, PreRequest, RequestContext, SelectionSet, TypeCondition,
};
use indexmap::IndexMap;
use mockito::Matcher;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const ZOO: &str = r#"<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="Zoo" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Animal">
        <Property Name="id" Type="Edm.Int32" />
        <Property Name="Name" Type="Edm.String" />
        <Property Name="Feeding" Type="Edm.TimeOfDay" />
      </EntityType>
      <EntityType Name="Dog" BaseType="Zoo.Animal">
        <Property Name="Breed" Type="Edm.String" />
        <Property Name="Nicknames" Type="Collection(Edm.String)" />
        <Property Name="Kennel" Type="Zoo.Kennel" />
        <NavigationProperty Name="Friends" Type="Collection(Zoo.Animal)" />
      </EntityType>
      <ComplexType Name="Kennel">
        <Property Name="Size" Type="Edm.String" />
      </ComplexType>
      <Function Name="Describe" IsBound="true">
        <Parameter Name="bindingParameter" Type="Zoo.Dog" />
        <Parameter Name="style" Type="Edm.String" />
        <ReturnType Type="Edm.String" />
      </Function>
      <EntityContainer Name="Container">
        <EntitySet Name="Animals" EntityType="Zoo.Animal" />
        <EntitySet Name="Dogs" EntityType="Zoo.Dog" />
        <Singleton Name="Mascot" Type="Zoo.Dog" />
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

fn registry(base_url: &str) -> schema::TypeRegistry {
    let edm = edm::EdmDocument::parse(ZOO).unwrap();
    schema::build("zoo", base_url, &edm, None).unwrap()
}

fn field(name: &str, fields: Vec<FieldSelection>) -> FieldSelection {
    let mut field = FieldSelection::new(name);
    field.selection_set = SelectionSet { fields };
    field
}

fn leaf(name: &str) -> FieldSelection {
    FieldSelection::new(name)
}

fn on(type_key: &str, mut field: FieldSelection) -> FieldSelection {
    field.type_condition = Some(TypeCondition {
        type_name: format!("zoo_{type_key}"),
        possible_types: vec![type_key.to_string()],
    });
    field
}

fn selection(fields: Vec<FieldSelection>) -> SelectionSet {
    SelectionSet { fields }
}

fn root_path() -> Vec<PathSegment> {
    vec![PathSegment::field("zoo")]
}

#[tokio::test]
async fn unauthorized_fields_become_null_without_failing_siblings() {
    let mut server = mockito::Server::new_async().await;
    let denied = server
        .mock("GET", Matcher::Regex(r"^/Dogs($|\?)".into()))
        .match_query(Matcher::UrlEncoded("$select".into(), "Name,id".into()))
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":"Authorization_RequestDenied","message":"Insufficient privileges"}}"#)
        .create_async()
        .await;
    let animals = server
        .mock("GET", Matcher::Regex(r"^/Animals($|\?)".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[{"id":1,"Name":"Rex"}]}"#)
        .create_async()
        .await;

    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Censor,
    );

    let query = selection(vec![
        field("Dogs", vec![leaf("Name")]),
        field("Animals", vec![leaf("Name")]),
    ]);
    let data = execute::resolve_query_root(&ctx, &query, root_path())
        .await
        .unwrap();
    assert_eq!(
        data,
        serde_json::json!({"Dogs": null, "Animals": [{"Name": "Rex"}]})
    );

    let errors = ctx.into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].path,
        Some(vec![PathSegment::field("zoo"), PathSegment::field("Dogs")])
    );
    assert!(errors[0].message.contains("denied"));
    assert_eq!(
        errors[0].extensions.as_ref().unwrap().details["error"]["code"],
        "Authorization_RequestDenied"
    );

    denied.assert_async().await;
    animals.assert_async().await;
}

#[tokio::test]
async fn union_elements_take_their_discriminated_type() {
    let mut server = mockito::Server::new_async().await;
    // `Breed` is not declared on the base type, so every property is requested
    let animals = server
        .mock("GET", "/Animals")
        .with_status(200)
        .with_header("content-type", "application/json;odata.metadata=minimal")
        .with_body(
            r##"{"value":[
                {"@odata.type":"#Zoo.Dog","id":7,"Name":"Rex","Breed":"Collie","Feeding":"08:30:00.0000000"},
                {"id":2,"Name":"Generic"}
            ]}"##,
        )
        .create_async()
        .await;

    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let query = selection(vec![field(
        "Animals",
        vec![
            leaf("__typename"),
            leaf("Name"),
            leaf("Feeding"),
            on("Dog", leaf("Breed")),
        ],
    )]);
    let data = execute::resolve_query_root(&ctx, &query, root_path())
        .await
        .unwrap();
    assert_eq!(
        data,
        serde_json::json!({"Animals": [
            {"__typename": "zoo_Dog", "Name": "Rex", "Feeding": "08:30:00", "Breed": "Collie"},
            {"__typename": "zoo_Animal_Base", "Name": "Generic", "Feeding": null}
        ]})
    );
    assert!(ctx.into_errors().is_empty());
    animals.assert_async().await;
}

#[tokio::test]
async fn navigations_functions_and_raw_values_follow_the_canonical_url() {
    let mut server = mockito::Server::new_async().await;
    let mascot = server
        .mock("GET", Matcher::Regex(r"^/Mascot($|\?)".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":7,"Name":"Rex","Nicknames":["R","Rexy"],"Kennel":{"Size":"L"}}"#,
        )
        .create_async()
        .await;
    let friends = server
        .mock("GET", "/Dogs/7/Friends")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[{"id":3,"Name":"Tom"}]}"#)
        .create_async()
        .await;
    let describe = server
        .mock("GET", Matcher::Regex(r"^/Dogs/7/Describe\(style='short'\)$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":"A good dog"}"#)
        .create_async()
        .await;
    let photo = server
        .mock("GET", "/Dogs/7/$value")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body([1_u8, 2, 3])
        .create_async()
        .await;

    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let mut describe_field = leaf("Describe");
    describe_field
        .arguments
        .insert("style".into(), serde_json::json!("short"));
    let query = selection(vec![field(
        "Mascot",
        vec![
            leaf("Nicknames"),
            field("Kennel", vec![leaf("Size")]),
            field("Friends", vec![leaf("Name")]),
            describe_field,
            leaf("_value"),
        ],
    )]);
    let data = execute::resolve_query_root(&ctx, &query, root_path())
        .await
        .unwrap();
    assert_eq!(
        data,
        serde_json::json!({"Mascot": {
            "Nicknames": ["R", "Rexy"],
            "Kennel": {"Size": "L"},
            "Friends": [{"Name": "Tom"}],
            "Describe": r#"{"value":"A good dog"}"#,
            "_value": "data:image/png;base64,AQID"
        }})
    );

    for mock in [mascot, friends, describe, photo] {
        mock.assert_async().await;
    }
}

struct DropPeopleRequests;

#[async_trait]
impl PreRequest for DropPeopleRequests {
    async fn pre_request(
        &self,
        context: RequestContext<'_>,
        mut request: ODataRequest,
    ) -> Result<Option<ODataRequest>, HookError> {
        if context.field_name == "Dogs" {
            return Ok(None);
        }
        request
            .headers
            .insert("authorization", "Bearer zoo-keeper".parse().unwrap());
        Ok(Some(request))
    }
}

#[tokio::test]
async fn pre_request_hooks_decorate_and_veto_requests() {
    let mut server = mockito::Server::new_async().await;
    let animals = server
        .mock("GET", Matcher::Regex(r"^/Animals($|\?)".into()))
        .match_header("authorization", "Bearer zoo-keeper")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[]}"#)
        .create_async()
        .await;
    let dogs = server
        .mock("GET", Matcher::Regex(r"^/Dogs".into()))
        .expect(0)
        .create_async()
        .await;

    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks {
        pre_request: Some(Arc::new(DropPeopleRequests)),
        pre_parse: None,
    };
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let query = selection(vec![
        field("Animals", vec![leaf("Name")]),
        field("Dogs", vec![leaf("Name")]),
    ]);
    let data = execute::resolve_query_root(&ctx, &query, root_path())
        .await
        .unwrap();
    assert_eq!(data, serde_json::json!({"Animals": [], "Dogs": null}));
    assert!(ctx.into_errors().is_empty());

    animals.assert_async().await;
    dogs.assert_async().await;
}

#[tokio::test]
async fn cancellation_ends_the_resolution() {
    let server = mockito::Server::new_async().await;
    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    cancellation.cancel();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let query = selection(vec![field("Animals", vec![leaf("Name")])]);
    let error = execute::resolve_query_root(&ctx, &query, root_path())
        .await
        .unwrap_err();
    assert!(matches!(error, FieldError::Cancelled));
}

#[tokio::test]
async fn placeholder_mutations_resolve_to_null() {
    let server = mockito::Server::new_async().await;
    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let mutation = selection(vec![leaf("Placeholder"), leaf("__typename")]);
    let data = execute::resolve_mutation_root(&ctx, &mutation, root_path())
        .await
        .unwrap();
    assert_eq!(
        data,
        serde_json::json!({"Placeholder": null, "__typename": "zooMutations"})
    );
}

#[tokio::test]
async fn host_function_calls_can_take_the_first_result() {
    let mut server = mockito::Server::new_async().await;
    let nearest = server
        .mock("GET", Matcher::Regex(r"^/GetNearestEnclosure\(lat=1\.5,lon=2\)$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[{"Name":"Savanna"},{"Name":"Jungle"}]}"#)
        .expect(2)
        .create_async()
        .await;

    let registry = registry(&server.url());
    let client = reqwest::Client::new();
    let hooks = Hooks::default();
    let cancellation = CancellationToken::new();
    let ctx = ExecutionContext::new(
        &client,
        &registry,
        &hooks,
        &cancellation,
        ExposeInternalErrors::Expose,
    );

    let mut parameters = IndexMap::new();
    parameters.insert("lat".to_string(), serde_json::json!(1.5));
    parameters.insert("lon".to_string(), serde_json::json!(2));

    let first = execute::call_function(&ctx, "GetNearestEnclosure", &parameters, true)
        .await
        .unwrap();
    assert_eq!(first, serde_json::json!({"Name": "Savanna"}));

    let all = execute::call_function(&ctx, "GetNearestEnclosure", &parameters, false)
        .await
        .unwrap();
    assert_eq!(all["value"].as_array().map(Vec::len), Some(2));

    nearest.assert_async().await;
}
