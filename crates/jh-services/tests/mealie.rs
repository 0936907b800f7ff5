mod common;

use common::StubServer;
use jh_services::mealie::ShoppingItem;
use jh_services::{Mealie, ServiceError, ShoppingService};
use serde_json::json;

fn item(id: &str, list: &str, checked: bool) -> serde_json::Value {
    json!({"id": id, "shoppingListId": list, "checked": checked, "note": id})
}

#[tokio::test]
async fn load_foods_refetches_when_total_exceeds_page() {
    let server = StubServer::new()
        .route_query("GET", "/api/foods", "perPage=1&", 200, json!({
            "items": [{"id": "f1", "name": "apple"}],
            "total": 3
        }))
        .route_query("GET", "/api/foods", "perPage=3&", 200, json!({
            "items": [
                {"id": "f1", "name": "apple"},
                {"id": "f2", "name": "banana"},
                {"id": "f3", "name": "test food", "pluralName": null}
            ],
            "total": 3
        }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "secret", None);

    let foods = mealie.load_foods(1, true).await.unwrap();
    assert_eq!(foods.len(), 3);
    assert_eq!(foods[2].name, "test food");

    // Served from cache.
    let again = mealie.foods().await.unwrap();
    assert_eq!(again, foods);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("authorization"), Some("Bearer secret"));
    assert!(requests[0].query.contains("orderBy=name"));
    assert!(requests[0].query.contains("orderDirection=asc"));
}

#[tokio::test]
async fn shopping_items_paginate_and_filter_by_list() {
    let server = StubServer::new()
        .route_query("GET", "/api/households/shopping/items", "page=1&", 200, json!({
            "items": [item("a", "L", false), item("b", "M", false)],
            "next": "/api/households/shopping/items?page=2"
        }))
        .route_query("GET", "/api/households/shopping/items", "page=2&", 200, json!({
            "items": [item("c", "L", false), item("d", "L", true)],
            "next": null
        }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", Some("L".to_string()));

    let items = mealie.load_shopping_items(2, false).await.unwrap();
    let ids: Vec<_> = items.iter().filter_map(|i| i.id.as_deref()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(server.requests().len(), 2);

    // Cached until the list changes.
    mealie.shopping_items().await.unwrap();
    assert_eq!(server.requests().len(), 2);

    mealie.set_shopping_list_id(Some("M".to_string()));
    let items = mealie.load_shopping_items(2, false).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id.as_deref(), Some("b"));
    assert_eq!(server.requests().len(), 4);
}

#[tokio::test]
async fn short_page_stops_pagination() {
    let server = StubServer::new()
        .route_query("GET", "/api/households/shopping/items", "page=1&", 200, json!({
            "items": [item("a", "L", false), item("b", "L", true)],
            "next": "/api/households/shopping/items?page=2"
        }))
        .route_query("GET", "/api/households/shopping/items", "page=2&", 200, json!({
            "items": [item("c", "L", false)],
            "next": null
        }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", None);

    let items = mealie.load_shopping_items(2, true).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(server.requests().len(), 1);
    assert!(server.requests()[0].query.contains("orderBy=checked"));
}

#[tokio::test]
async fn unknown_list_yields_no_items() {
    let server = StubServer::new().route("GET", "/api/households/shopping/items", 200, json!({
        "items": [item("a", "L", false)],
        "next": null
    }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", Some("invalid_id".to_string()));
    assert!(mealie.shopping_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_without_list_makes_no_request() {
    let server = StubServer::new();
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", None);

    let err = mealie
        .add_shopping_items(vec![ShoppingItem::with_note("potatoes")])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Item is missing required key shoppingListId");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn add_stamps_list_and_delete_sends_ids() {
    let server = StubServer::new()
        .route("POST", "/api/households/shopping/items/create-bulk", 201, json!({
            "createdItems": [{"id": "n1", "note": "test non-food example"}],
            "updatedItems": [{"id": "n2", "note": "example"}],
            "deletedItems": []
        }))
        .route("DELETE", "/api/households/shopping/items", 200, json!({"message": "ok"}));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", Some("L".to_string()));

    let result = mealie
        .add_shopping_items(vec![
            ShoppingItem::with_note("test non-food example"),
            ShoppingItem {
                food_id: Some("f3".to_string()),
                ..ShoppingItem::with_note("example")
            },
        ])
        .await
        .unwrap();
    let ids = result.touched_ids();
    assert_eq!(ids, vec!["n1", "n2"]);

    mealie.delete_shopping_items(&ids).await.unwrap();

    let requests = server.requests();
    let posted = requests[0].json();
    assert_eq!(posted[0]["shoppingListId"], "L");
    assert_eq!(posted[1]["shoppingListId"], "L");
    assert_eq!(posted[1]["foodId"], "f3");
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].query_values("ids"), vec!["n1", "n2"]);
}

#[tokio::test]
async fn parse_then_add_via_trait() {
    let server = StubServer::new()
        .route("POST", "/api/parser/ingredients", 200, json!([
            {"input": "milk", "ingredient": {"note": "", "display": "milk", "food": {"name": "milk"}}},
            {"input": "2 eggs", "ingredient": {"quantity": 2.0, "display": "2 eggs", "food": {"name": "egg"}}}
        ]))
        .route("POST", "/api/households/shopping/items/create-bulk", 201, json!({
            "createdItems": [], "updatedItems": [], "deletedItems": []
        }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", Some("L".to_string()));

    let parsed = mealie
        .parse_items(&["milk".to_string(), "2 eggs".to_string()])
        .await
        .unwrap();
    let displays: Vec<_> = parsed.iter().filter_map(|p| p.display.as_deref()).collect();
    assert_eq!(displays, vec!["milk", "2 eggs"]);

    let service: &dyn ShoppingService = &mealie;
    service.add_items(&["milk".to_string()]).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    let parse_body = requests[0].json();
    assert_eq!(parse_body["parser"], "nlp");
    assert_eq!(parse_body["ingredients"], json!(["milk", "2 eggs"]));
    let bulk = requests[2].json();
    assert_eq!(bulk[0]["display"], "milk");
    assert_eq!(bulk[0]["food"]["name"], "milk");
    assert_eq!(bulk[0]["shoppingListId"], "L");
}

#[tokio::test]
async fn read_recipe_scales_to_servings() {
    let server = StubServer::new()
        .route("GET", "/api/recipes", 200, json!({
            "items": [
                {"name": "Banana Pancakes", "slug": "banana-pancakes"},
                {"name": "Pancakes", "slug": "pancakes"}
            ]
        }))
        .route("GET", "/api/recipes/pancakes", 200, json!({
            "name": "Pancakes",
            "slug": "pancakes",
            "recipeServings": 2.0,
            "recipeIngredient": [
                {"quantity": 1.0, "unit": {"name": "cup"}, "food": {"name": "flour"}}
            ],
            "recipeInstructions": [{"text": "Mix and fry."}]
        }));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", None);

    let md = mealie.read_recipe("pancakes", 1.0, Some(6)).await.unwrap();
    assert!(md.starts_with("# Pancakes"));
    assert!(md.contains("- 3 cup flour"));
    assert!(md.contains("1. Mix and fry."));

    let requests = server.requests();
    assert_eq!(requests[0].query_values("search"), vec!["pancakes"]);
    assert_eq!(requests[1].path, "/api/recipes/pancakes");
}

#[tokio::test]
async fn read_recipe_without_hits_is_not_found() {
    let server = StubServer::new().route("GET", "/api/recipes", 200, json!({"items": []}));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "k", None);

    let err = mealie.read_recipe("waffles", 1.0, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = StubServer::new().route("GET", "/api/foods", 401, json!({"detail": "Unauthorized"}));
    let url = server.start().await;
    let mealie = Mealie::new(&url, "bad", None);

    let err = mealie.load_foods(10, true).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Unauthorized"));
}
