use std::time::Duration;

use roster_rs::{
    CatalogClient, Effect, LoadOutcome, RosterConfig, RosterController, UserIntent, ViewState,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn docs_payload(count: usize) -> Value {
    let docs = (0..count)
        .map(|i| {
            json!({
                "_id": format!("id-{i}"),
                "Nombre": format!("Vecino {i}"),
                "Ocupacion": if i % 3 == 0 { "Estudiante" } else { "Trabajador de la planta" },
                "Historia": format!("Vive en Springfield desde el episodio {i}."),
                "Imagen": format!("https://cdn.example.com/{i}.webp"),
            })
        })
        .collect::<Vec<_>>();
    json!({ "docs": docs, "totalDocs": count, "limit": 50, "page": 1 })
}

fn config_for(server: &MockServer) -> RosterConfig {
    RosterConfig {
        endpoint: format!("{}/api/personajes?limit=50", server.uri()),
        ..RosterConfig::default()
    }
}

fn client() -> CatalogClient {
    CatalogClient::new("roster-rs-integration", Some(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn full_browse_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/personajes"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_payload(30)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client();
    let mut controller = RosterController::new(&config_for(&server));
    assert_eq!(controller.reload(&client).await, LoadOutcome::Loaded { records: 30 });
    assert_eq!(controller.state(), &ViewState::Idle);
    assert_eq!(controller.stats().displayed, 12);
    assert!(controller.grid().load_more_visible());

    controller.dispatch(UserIntent::LoadMore);
    controller.dispatch(UserIntent::LoadMore);
    assert_eq!(controller.stats().displayed, 30);
    assert!(!controller.grid().load_more_visible());

    controller.dispatch(UserIntent::SelectCategory("estudiante".into()));
    assert_eq!(controller.stats().matched, 10);
    assert_eq!(controller.grid().cursor(), 0);

    controller.dispatch(UserIntent::Search("episodio 2".into()));
    let names: Vec<_> = controller
        .grid()
        .cards()
        .iter()
        .map(|card| card.name.as_str())
        .collect();
    assert_eq!(names, ["Vecino 21", "Vecino 24", "Vecino 27"]);

    let Effect::ShowDetails(details) = controller.dispatch(UserIntent::OpenDetails(1)) else {
        panic!("expected details for the second card");
    };
    assert_eq!(details.name, "Vecino 24");
    assert_eq!(details.occupation, "Estudiante");
    assert_eq!(details.image_url, "https://cdn.example.com/24.webp");

    let html = controller.grid().to_html("Nada").unwrap();
    assert_eq!(html.matches("class=\"character-card\"").count(), 3);
}

#[tokio::test]
async fn retry_after_server_error_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_payload(2)))
        .mount(&server)
        .await;

    let client = client();
    let mut controller = RosterController::new(&config_for(&server));
    let outcome = controller.reload(&client).await;
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    let ViewState::Error { message } = controller.state() else {
        panic!("expected error state");
    };
    assert!(message.contains("500"));
    assert!(controller.catalog().is_empty());

    let Effect::Fetch(ticket) = controller.dispatch(UserIntent::Retry) else {
        panic!("retry must start a load");
    };
    assert_eq!(controller.state(), &ViewState::Loading);
    let result = client.load_catalog(ticket.url()).await;
    assert_eq!(
        controller.finish_load(ticket, result),
        LoadOutcome::Loaded { records: 2 }
    );
    assert_eq!(controller.state(), &ViewState::Idle);
}

#[tokio::test]
async fn slower_superseded_load_is_ignored() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(docs_payload(5))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&slow)
        .await;
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_payload(2)))
        .mount(&fast)
        .await;

    let client = client();
    let mut controller = RosterController::new(&config_for(&slow));
    let stale = controller.begin_load();
    let current = controller.begin_load();
    let fast_url = fast.uri();

    let (stale_result, current_result) = tokio::join!(
        client.load_catalog(stale.url()),
        client.load_catalog(&fast_url),
    );
    assert_eq!(
        controller.finish_load(current, current_result),
        LoadOutcome::Loaded { records: 2 }
    );
    assert_eq!(controller.finish_load(stale, stale_result), LoadOutcome::Stale);
    assert_eq!(controller.catalog().len(), 2);
}
