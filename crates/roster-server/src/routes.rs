//! HTTP routes under `/api/v1/employee`.

use crate::error::ApiError;
use crate::model::{Employee, EmployeeCreateRequest};
use crate::service::EmployeeService;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

const EMPLOYEES: &str = "/api/v1/employee";

/// The employee API over `service`.
///
/// Static segments take precedence over `/:id`, so `highestSalary` is never
/// looked up as an id.
pub fn router(service: EmployeeService) -> Router {
    Router::new()
        .route(EMPLOYEES, get(all_employees).post(create_employee))
        .route(
            &format!("{EMPLOYEES}/search/:name"),
            get(search_by_name),
        )
        .route(&format!("{EMPLOYEES}/highestSalary"), get(highest_salary))
        .route(
            &format!("{EMPLOYEES}/topTenHighestEarningEmployeeNames"),
            get(top_ten_names),
        )
        .route(
            &format!("{EMPLOYEES}/:id"),
            get(employee_by_id).delete(delete_employee),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn all_employees(
    State(service): State<EmployeeService>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    info!("Request received to fetch all employees");
    let employees = service.fetch_all().await?;
    debug!(count = employees.len(), "Returning all employees");
    Ok(Json(employees))
}

async fn search_by_name(
    State(service): State<EmployeeService>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    info!(term = %name, "Request received to search employees by name");
    let employees = service.search_by_name(&name).await?;
    debug!(term = %name, count = employees.len(), "Returning matching employees");
    Ok(Json(employees))
}

async fn employee_by_id(
    State(service): State<EmployeeService>,
    Path(id): Path<String>,
) -> Result<Json<Employee>, ApiError> {
    info!(%id, "Request received to fetch employee by id");
    let employee = service.fetch_by_id(&id).await?;
    debug!(%id, name = %employee.name, "Returning employee");
    Ok(Json(employee))
}

async fn highest_salary(State(service): State<EmployeeService>) -> Result<Json<i64>, ApiError> {
    info!("Request received to fetch the highest salary");
    let salary = service.highest_salary().await?;
    debug!(salary, "Returning highest salary");
    Ok(Json(salary))
}

async fn top_ten_names(
    State(service): State<EmployeeService>,
) -> Result<Json<Vec<String>>, ApiError> {
    info!("Request received to fetch the top ten earners");
    let names = service.top_ten_names_by_salary().await?;
    debug!(count = names.len(), "Returning top earner names");
    Ok(Json(names))
}

async fn create_employee(
    State(service): State<EmployeeService>,
    payload: Result<Json<EmployeeCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    info!("Request received to create an employee");
    let Json(request) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let created = service.create(request.validate()?).await?;
    debug!(id = %created.id, "Returning created employee");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_employee(
    State(service): State<EmployeeService>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    info!(%id, "Request received to delete employee");
    let name = service.delete_by_id(&id).await?;
    debug!(%id, %name, "Returning deleted employee name");
    Ok(Json(name))
}
