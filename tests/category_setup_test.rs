mod common;

use std::collections::HashSet;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;
use teslaparts_api::{
    errors::ServiceError,
    models::TeslaModel,
    services::category_setup::hierarchy::{
        builtin_hierarchy, CategoryDefinition, HierarchyDefinition,
    },
};

#[tokio::test]
async fn second_run_creates_nothing_and_skips_everything() {
    let app = TestApp::new().await;
    let setup = &app.state.services.category_setup;
    let expected = builtin_hierarchy(TeslaModel::ModelY).unwrap().node_count();

    let first = setup.setup(TeslaModel::ModelY, None).await.unwrap();
    assert!(first.success);
    assert_eq!(first.total_created, expected);
    assert_eq!(first.total_skipped, 0);
    assert!(first.errors.is_empty());

    let second = setup.setup(TeslaModel::ModelY, None).await.unwrap();
    assert!(second.success);
    assert_eq!(second.total_created, 0);
    assert_eq!(second.total_skipped, first.total_created);

    let stored = app.state.services.categories.list().await.unwrap();
    assert_eq!(stored.len(), expected);
}

#[tokio::test]
async fn created_tree_has_three_levels_and_unique_sort_orders() {
    let app = TestApp::new().await;
    app.state
        .services
        .category_setup
        .setup(TeslaModel::ModelY, None)
        .await
        .unwrap();

    let tree = app.state.services.categories.tree().await.unwrap();
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert_eq!(root.category.name, "Model Y");
    assert_eq!(root.category.level, 1);
    assert_eq!(root.children.len(), 21);

    let body = &root.children[0];
    assert_eq!(body.category.name, "Model Y - 10 - BODY");
    assert_eq!(body.category.level, 2);
    assert_eq!(body.category.parent_id, Some(root.category.id));
    assert_eq!(body.children[0].category.name, "Model Y - 1001 - Bumper and Fascia");
    assert_eq!(body.children[0].category.level, 3);

    let all = app.state.services.categories.list().await.unwrap();
    let orders: HashSet<i32> = all.iter().map(|c| c.sort_order).collect();
    assert_eq!(orders.len(), all.len());
    assert_eq!(root.category.sort_order, 1);
    assert_eq!(orders.iter().max(), Some(&(all.len() as i32)));
    let slugs: HashSet<&str> = all.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs.len(), all.len());
}

#[tokio::test]
async fn model_3_names_carry_no_prefix() {
    let app = TestApp::new().await;
    app.state
        .services
        .category_setup
        .setup(TeslaModel::Model3, None)
        .await
        .unwrap();

    let tree = app.state.services.categories.tree().await.unwrap();
    assert_eq!(tree[0].category.name, "Model 3");
    assert_eq!(tree[0].children[0].category.name, "10 - BODY");
}

#[tokio::test]
async fn later_runs_continue_the_sort_order() {
    let app = TestApp::new().await;
    let setup = &app.state.services.category_setup;
    setup.setup(TeslaModel::Model3, None).await.unwrap();
    let before = app.state.services.categories.list().await.unwrap();
    let highest = before.iter().map(|c| c.sort_order).max().unwrap();

    let custom = HierarchyDefinition {
        roots: vec![CategoryDefinition::new("Model S")
            .with_children(vec![CategoryDefinition::new("Brakes")])],
    };
    let report = setup.setup(TeslaModel::ModelS, Some(custom)).await.unwrap();
    assert_eq!(report.total_created, 2);

    let after = app.state.services.categories.list().await.unwrap();
    let model_s = after.iter().find(|c| c.name == "Model S").unwrap();
    let brakes = after.iter().find(|c| c.name == "Brakes").unwrap();
    assert_eq!(model_s.sort_order, highest + 1);
    assert_eq!(brakes.sort_order, highest + 2);
    assert_eq!(brakes.parent_id, Some(model_s.id));
}

#[tokio::test]
async fn models_without_builtin_hierarchy_need_an_override() {
    let app = TestApp::new().await;
    let setup = &app.state.services.category_setup;

    assert_matches!(
        setup.setup(TeslaModel::ModelS, None).await,
        Err(ServiceError::BadRequest(_))
    );
    assert_matches!(
        setup.setup(TeslaModel::ModelX, None).await,
        Err(ServiceError::BadRequest(_))
    );
    assert!(app.state.services.categories.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn too_deep_nodes_fail_without_aborting_the_run() {
    let app = TestApp::new().await;
    let custom = HierarchyDefinition {
        roots: vec![
            CategoryDefinition::new("Model X").with_children(vec![CategoryDefinition::new(
                "Doors",
            )
            .with_children(vec![CategoryDefinition::new("Falcon Wing")
                .with_children(vec![CategoryDefinition::new("Hinge")
                    .with_children(vec![CategoryDefinition::new("Hinge Bolt")])])])]),
            CategoryDefinition::new("Accessories"),
        ],
    };

    let report = app
        .state
        .services
        .category_setup
        .setup(TeslaModel::ModelX, Some(custom))
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.total_created, 4);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Hinge:"));
    assert!(report.message.contains("[failed]  Hinge"));
    // The failed node's subtree is not attempted.
    assert!(!report.message.contains("Hinge Bolt"));
    assert!(report.message.contains("[created] Accessories"));
}

#[tokio::test]
async fn auto_setup_endpoint_defaults_to_model_3() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/categories/auto-setup", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    let expected = builtin_hierarchy(TeslaModel::Model3).unwrap().node_count();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["model"], json!("MODEL_3"));
    assert_eq!(body["totalCreated"], json!(expected));
    assert_eq!(body["totalSkipped"], json!(0));
    assert_eq!(body["errors"], json!([]));

    let message = body["message"].as_str().unwrap();
    let mut lines = message.lines();
    assert_eq!(
        lines.next(),
        Some(format!("Category setup for Model 3: {expected} created, 0 skipped, 0 failed").as_str())
    );
    assert_eq!(lines.next(), Some("[created] Model 3"));
    assert_eq!(lines.next(), Some("  [created] 10 - BODY"));
    assert_eq!(lines.next(), Some("    [created] 1001 - Bumper and Fascia"));
}

#[tokio::test]
async fn auto_setup_endpoint_accepts_a_custom_hierarchy() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories/auto-setup",
            Some(json!({
                "model": "MODEL_Y",
                "hierarchy": {
                    "roots": [{
                        "name": "Model Y",
                        "children": [{ "name": "BODY", "description": "Panels" }]
                    }]
                }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["totalCreated"], json!(2));

    let tree = response_json(app.request(Method::GET, "/api/v1/categories/tree", None).await).await;
    let root = &tree["data"][0];
    assert_eq!(root["name"], json!("Model Y"));
    // Custom names only gain the model prefix.
    assert_eq!(root["children"][0]["name"], json!("Model Y - BODY"));
    assert_eq!(root["children"][0]["slug"], json!("model-y-body"));
    assert_eq!(root["children"][0]["description"], json!("Panels"));
}

#[tokio::test]
async fn auto_setup_endpoint_rejects_model_s_without_hierarchy() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories/auto-setup",
            Some(json!({ "model": "MODEL_S" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("MODEL_S"));
}
