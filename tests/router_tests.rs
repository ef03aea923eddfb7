use apiconform::document::{self, Document};
use apiconform::router::{CaptureMode, PathRouter, RouteMatch};
use apiconform::RouteError;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ============================================================================
// HELPERS
// ============================================================================

fn operation(id: &str) -> Value {
    json!({ "operationId": id, "responses": { "200": { "description": "ok" } } })
}

/// Build a document from `paths`, keeping their declaration order
fn document_with(paths: Value, servers: Value) -> Document {
    document::from_value(json!({
        "openapi": "3.0.3",
        "info": { "title": "Routing", "version": "1.0.0" },
        "servers": servers,
        "paths": paths
    }))
    .unwrap()
}

fn pets() -> Document {
    document_with(
        json!({
            "/pets": { "get": operation("listPets"), "post": operation("createPet") },
            "/pets/{petId}": { "get": operation("showPetById") },
            "/pets/mine": { "get": operation("myPets") }
        }),
        json!([]),
    )
}

fn route<'d>(
    router: &PathRouter,
    document: &'d Document,
    method: &str,
    url: &str,
    path: &str,
) -> Result<RouteMatch<'d>, RouteError> {
    router.find(document, method, url, path)
}

fn captures<'a>(route: &'a RouteMatch<'_>) -> Vec<(&'a str, &'a str)> {
    route
        .captures
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect()
}

// ============================================================================
// MATCHING
// ============================================================================

#[test]
fn test_literal_path() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "post", "http://localhost/pets", "/pets").unwrap();
    assert_eq!(found.operation.display_name(), "createPet");
    assert!(found.captures.is_empty());
}

#[test]
fn test_template_captures_parameter() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "GET", "http://localhost/pets/42", "/pets/42").unwrap();
    assert_eq!(found.item.template, "/pets/{petId}");
    assert_eq!(captures(&found), vec![("petId", "42")]);
}

#[test]
fn test_literal_wins_over_earlier_template() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "GET", "http://localhost/pets/mine", "/pets/mine").unwrap();
    assert_eq!(found.operation.display_name(), "myPets");
}

#[test]
fn test_segment_capture_stops_at_slash() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let err = route(&router, &document, "GET", "http://localhost/pets/42/toys", "/pets/42/toys")
        .unwrap_err();
    assert_eq!(
        err,
        RouteError::PathNotFound {
            url: "http://localhost/pets/42/toys".to_string()
        }
    );
}

#[test]
fn test_greedy_capture_spans_segments() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Greedy).unwrap();

    let found = route(&router, &document, "GET", "http://localhost/pets/42/toys", "/pets/42/toys")
        .unwrap();
    assert_eq!(captures(&found), vec![("petId", "42/toys")]);
}

#[test]
fn test_first_declared_template_wins() {
    // Alphabetical order would put `{id}.json` first
    let document = document_with(
        json!({
            "/files/{name}": { "get": operation("byName") },
            "/files/{id}.json": { "get": operation("byId") }
        }),
        json!([]),
    );
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "GET", "http://h/files/a.json", "/files/a.json").unwrap();
    assert_eq!(found.operation.display_name(), "byName");
    assert_eq!(captures(&found), vec![("name", "a.json")]);
}

#[test]
fn test_multiple_placeholders() {
    let document = document_with(
        json!({ "/users/{userId}/orders/{orderId}": { "get": operation("userOrder") } }),
        json!([]),
    );
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "GET", "http://h/users/u1/orders/9", "/users/u1/orders/9")
        .unwrap();
    assert_eq!(captures(&found), vec![("userId", "u1"), ("orderId", "9")]);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_method_not_found_is_distinct() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let err = route(&router, &document, "delete", "http://localhost/pets/1", "/pets/1").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operation not defined for the method: DELETE http://localhost/pets/1"
    );
}

#[test]
fn test_path_not_found_message() {
    let document = pets();
    let router = PathRouter::new(&document, &[], CaptureMode::Segment).unwrap();

    let err = route(&router, &document, "GET", "http://localhost/owners", "/owners").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operation not defined for the path: http://localhost/owners"
    );
}

// ============================================================================
// SERVERS
// ============================================================================

#[test]
fn test_absolute_server_prefix() {
    let document = document_with(
        json!({ "/pets/{petId}": { "get": operation("showPetById") } }),
        json!([{ "url": "https://api.example.com/v1/" }]),
    );
    assert_eq!(document.servers, vec!["https://api.example.com/v1"]);
    let router = PathRouter::new(&document, &document.servers, CaptureMode::Segment).unwrap();

    let found = route(
        &router,
        &document,
        "GET",
        "https://api.example.com/v1/pets/5",
        "/v1/pets/5",
    )
    .unwrap();
    assert_eq!(captures(&found), vec![("petId", "5")]);

    assert!(route(&router, &document, "GET", "https://other.example.com/pets/5", "/pets/5").is_err());
}

#[test]
fn test_relative_server_matches_on_path() {
    let document = document_with(
        json!({ "/pets": { "get": operation("listPets") } }),
        json!([{ "url": "/v2" }]),
    );
    let router = PathRouter::new(&document, &document.servers, CaptureMode::Segment).unwrap();

    let found = route(&router, &document, "GET", "http://any.host/v2/pets", "/v2/pets").unwrap();
    assert_eq!(found.operation.display_name(), "listPets");
    assert!(route(&router, &document, "GET", "http://any.host/pets", "/pets").is_err());
}
