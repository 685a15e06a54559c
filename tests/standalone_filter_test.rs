use grocery_planner::domain::model::candidates_from_json;
use grocery_planner::utils::export::shopping_list_csv;
use grocery_planner::{MealPlanner, OpenAiGenerator, PlannerSettings, TraderJoesSearch};
use httpmock::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const CANDIDATES: &str = r#"
[
  {"name": "Organic Tofu", "retailPrice": "2.99", "packageSize": "14 oz", "unitDescription": "Oz", "matchedTerm": "tofu"},
  {"name": "Firm Tofu", "retailPrice": "1.99", "packageSize": "16 oz", "matchedTerm": "tofu"},
  {"name": "Quinoa Blend", "retailPrice": "4.49", "matchedTerm": "quinoa"}
]
"#;

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn test_filter_candidates_loaded_from_file() {
    let mut products_file = NamedTempFile::new().unwrap();
    products_file.write_all(CANDIDATES.as_bytes()).unwrap();

    let raw = std::fs::read_to_string(products_file.path()).unwrap();
    let candidates = candidates_from_json(&raw).unwrap();
    assert_eq!(candidates.len(), 3);

    let server = MockServer::start();
    let selection_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("Here is a list of grocery products")
            .body_contains("3. Quinoa Blend - N/A");
        then.status(200).json_body(completion(
            "```json\n[{\"name\": \"tofu\", \"quantity\": 1}, {\"name\": \"Kale\", \"quantity\": 3}, {\"name\": \"quinoa blend\", \"quantity\": 2}]\n```",
        ));
    });
    let retailer_mock = server.mock(|when, then| {
        when.method(POST).path("/api/graphql");
        then.status(200).json_body(serde_json::json!({"data": {"products": {"items": []}}}));
    });

    let planner = MealPlanner::new(
        OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4"),
        TraderJoesSearch::new(server.url("/api/graphql")),
        PlannerSettings::default(),
    );

    let outcome = planner.filter("vegan", &candidates).await.unwrap();

    selection_mock.assert();
    retailer_mock.assert_hits(0);

    let names: Vec<&str> = outcome.entries.iter().map(|e| e.name()).collect();
    // 第一個符合的候選商品勝出
    assert_eq!(names, vec!["Organic Tofu", "Quinoa Blend"]);
    assert_eq!(outcome.entries[0].quantity, 1);
    assert_eq!(outcome.entries[1].quantity, 2);
    assert_eq!(outcome.dropped, vec!["Kale".to_string()]);
    assert!((outcome.estimated_total() - 11.97).abs() < 1e-9);

    let csv = shopping_list_csv(&outcome.entries).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "name,package_size,unit_description,retail_price,quantity,line_total,matched_term"
    );
    assert_eq!(lines[1], "Organic Tofu,14 oz,Oz,2.99,1,2.99,tofu");
    assert_eq!(lines[2], "Quinoa Blend,,,4.49,2,8.98,quinoa");
    assert_eq!(lines[3], "TOTAL,,,,,11.97,");
}

#[tokio::test]
async fn test_filter_is_stable_for_identical_responses() {
    let candidates = candidates_from_json(CANDIDATES).unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .json_body(completion(r#"[{"name": "Firm", "quantity": 4}]"#));
    });

    let planner = MealPlanner::new(
        OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4"),
        TraderJoesSearch::new(server.url("/api/graphql")),
        PlannerSettings::default(),
    );

    let first = planner.filter("cheap protein", &candidates).await.unwrap();
    let second = planner.filter("cheap protein", &candidates).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.entries.len(), 1);
    assert_eq!(first.entries[0].name(), "Firm Tofu");
    assert_eq!(first.entries[0].quantity, 4);
}
