//! Create and delete, and the invalidation that follows them.

use super::*;
use axum::http::StatusCode;
use roster_server::{EmployeeCreateRequest, NewEmployee};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn alice() -> NewEmployee {
    EmployeeCreateRequest {
        name: Some("Alice".to_string()),
        salary: Some(90_000),
        age: Some(28),
        title: Some("Senior Developer".to_string()),
    }
    .validate()
    .unwrap()
}

async fn mount_bob(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{EMPLOYEES_PATH}/b-1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(upstream_employee("b-1", "Bob", 50_000))),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_returns_the_assigned_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMPLOYEES_PATH))
        .and(body_json(json!({
            "name": "Alice",
            "salary": 90000,
            "age": 28,
            "title": "Senior Developer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "a-1",
            "employee_name": "Alice",
            "employee_salary": 90000,
            "employee_age": 28,
            "employee_title": "Senior Developer",
            "employee_email": "alice@company.com"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let created = service(&server).create(alice()).await.unwrap();
    assert_eq!(created.id, "a-1");
    assert_eq!(created.name, "Alice");
    assert_eq!(created.salary, 90_000);
    assert_eq!(created.age, 28);
    assert_eq!(created.title, "Senior Developer");
}

#[tokio::test]
async fn create_without_data_is_internal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    let err = service(&server).create(alice()).await.unwrap_err();
    assert_eq!(err, ApiError::Internal("Failed to create employee".to_string()));
}

#[tokio::test]
async fn create_makes_the_next_list_fetch_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(staff()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
            upstream_employee("1", "Tiger Nixon", 320_800),
            upstream_employee("2", "Garrett Winters", 170_750),
            upstream_employee("3", "Ashton Cox", 86_000),
            upstream_employee("4", "Cedric Kelly", 433_060),
            upstream_employee("a-1", "Alice", 90_000),
        ]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(upstream_employee("a-1", "Alice", 90_000))),
        )
        .mount(&server)
        .await;
    let service = service(&server);

    assert_eq!(service.fetch_all().await.unwrap().len(), 4);
    assert!(service.search_by_name("alice").await.unwrap().is_empty());
    let top_before = service.top_ten_names_by_salary().await.unwrap();
    assert!(!top_before.contains(&"Alice".to_string()));

    service.create(alice()).await.unwrap();

    let employees = service.fetch_all().await.unwrap();
    assert_eq!(employees.len(), 5);
    assert!(employees.iter().any(|e| e.id == "a-1" && e.name == "Alice"));

    let found = service.search_by_name("alice").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "a-1");

    let top_after = service.top_ten_names_by_salary().await.unwrap();
    assert_eq!(top_after.len(), 5);
    assert_eq!(top_after[3], "Alice");

    let stats = service.cache_stats();
    assert!(stats.values().all(|s| s.invalidations == 1));
}

#[tokio::test]
async fn failed_create_keeps_the_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(staff()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("duplicate"))
        .mount(&server)
        .await;
    let service = service(&server);

    service.fetch_all().await.unwrap();
    assert!(matches!(
        service.create(alice()).await,
        Err(ApiError::BadRequest(_))
    ));
    service.fetch_all().await.unwrap();
}

#[tokio::test]
async fn delete_resolves_the_name_and_returns_it() {
    let server = MockServer::start().await;
    mount_bob(&server).await;
    Mock::given(method("DELETE"))
        .and(path(EMPLOYEES_PATH))
        .and(body_json(json!({"name": "Bob"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(service(&server).delete_by_id("b-1").await.unwrap(), "Bob");
}

#[tokio::test]
async fn delete_accepts_a_string_confirmation() {
    let server = MockServer::start().await;
    mount_bob(&server).await;
    Mock::given(method("DELETE"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!("TRUE"))))
        .mount(&server)
        .await;

    assert_eq!(service(&server).delete_by_id("b-1").await.unwrap(), "Bob");
}

#[tokio::test]
async fn unconfirmed_delete_fails_with_the_upstream_status() {
    let server = MockServer::start().await;
    mount_bob(&server).await;
    Mock::given(method("DELETE"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(false))))
        .mount(&server)
        .await;
    let service = service(&server);

    let err = service.delete_by_id("b-1").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::DeleteFailed {
            id: "b-1".to_string(),
            status: StatusCode::OK,
        }
    );
    assert_eq!(err.to_string(), "Failed to delete employee with id b-1");

    // Nothing changed upstream, so the caches were left alone.
    assert!(service.cache_stats().values().all(|s| s.invalidations == 0));
}

#[tokio::test]
async fn delete_of_unknown_id_never_calls_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EMPLOYEES_PATH}/nobody")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = service(&server).delete_by_id("nobody").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::NotFound("Employee not found for id nobody".to_string())
    );
}

#[tokio::test]
async fn delete_by_traversing_id_never_deletes_another_employee() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EMPLOYEES_PATH}/1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(upstream_employee("1", "Tiger Nixon", 320_800))),
        )
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(true))))
        .expect(0)
        .mount(&server)
        .await;

    let err = service(&server).delete_by_id("2/../1").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::NotFound("Employee not found for id 2/../1".to_string())
    );
}

#[tokio::test]
async fn delete_invalidates_every_region() {
    let server = MockServer::start().await;
    mount_bob(&server).await;
    Mock::given(method("DELETE"))
        .and(path(EMPLOYEES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(true))))
        .mount(&server)
        .await;
    let service = service(&server);

    service.delete_by_id("b-1").await.unwrap();

    let stats = service.cache_stats();
    assert!(stats.values().all(|s| s.invalidations == 1 && s.size == 0));
}
