//! The seven employee operations, composed as cache, then retry, then the
//! upstream client.

use crate::caches::{CacheSettings, EmployeeCaches};
use crate::error::ApiError;
use crate::model::{Employee, NewEmployee};
use crate::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use axum::http::StatusCode;
use roster_cache::RegionStats;
use roster_retry::{Retry, RetryConfig};
use std::collections::BTreeMap;
use tower::{Layer, ServiceExt};
use tracing::{error, info, warn};

const TOP_EARNERS: usize = 10;

/// Employee operations over a cached, retried upstream client.
///
/// Cloning is cheap; clones share caches and the connection pool.
#[derive(Clone)]
pub struct EmployeeService {
    upstream: Retry<UpstreamClient, ApiError>,
    caches: EmployeeCaches,
}

impl EmployeeService {
    pub fn new(
        upstream: UpstreamClient,
        retry: RetryConfig<ApiError>,
        caches: EmployeeCaches,
    ) -> Self {
        Self {
            upstream: retry.layer().layer(upstream),
            caches,
        }
    }

    /// A service with default cache settings.
    pub fn with_default_caches(
        upstream: UpstreamClient,
        retry: RetryConfig<ApiError>,
    ) -> Result<Self, roster_cache::CacheError> {
        Ok(Self::new(
            upstream,
            retry,
            EmployeeCaches::new(CacheSettings::default())?,
        ))
    }

    async fn call_upstream(
        &self,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, ApiError> {
        self.upstream.clone().oneshot(request).await
    }

    /// Every employee. An upstream answer without data is an empty list.
    pub async fn fetch_all(&self) -> Result<Vec<Employee>, ApiError> {
        self.caches
            .employees_all
            .get_or_compute((), || async {
                info!("Fetching all employees from upstream");
                match self.call_upstream(UpstreamRequest::List).await? {
                    UpstreamResponse::Employees(Some(employees)) => {
                        info!(count = employees.len(), "Fetched employees");
                        Ok(employees)
                    }
                    UpstreamResponse::Employees(None) => {
                        warn!("Empty response received while fetching all employees");
                        Ok(Vec::new())
                    }
                    other => Err(unexpected(other)),
                }
            })
            .await
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<Employee, ApiError> {
        self.caches
            .employee_by_id
            .get_or_compute(id.to_string(), || async {
                info!(id, "Fetching employee by id");
                match self.call_upstream(UpstreamRequest::Get(id.to_string())).await {
                    Ok(UpstreamResponse::Employee(Some(employee))) => Ok(employee),
                    Ok(UpstreamResponse::Employee(None)) | Err(ApiError::NotFound(_)) => {
                        error!(id, "Employee not found");
                        Err(ApiError::NotFound(format!("Employee not found for id {id}")))
                    }
                    Ok(other) => Err(unexpected(other)),
                    Err(err) => Err(err),
                }
            })
            .await
    }

    /// Employees whose name contains `term`, ignoring case. An empty term
    /// matches everyone.
    pub async fn search_by_name(&self, term: &str) -> Result<Vec<Employee>, ApiError> {
        self.caches
            .search_by_name
            .get_or_compute(term.to_string(), || async {
                info!(term, "Searching employees by name");
                let matched = filter_by_name(self.fetch_all().await?, term);
                info!(term, count = matched.len(), "Found matching employees");
                Ok(matched)
            })
            .await
    }

    /// Names of the (at most) ten best paid employees, best paid first.
    pub async fn top_ten_names_by_salary(&self) -> Result<Vec<String>, ApiError> {
        self.caches
            .top_ten_names
            .get_or_compute((), || async {
                info!("Fetching top earners by salary");
                Ok(top_names_by_salary(self.fetch_all().await?, TOP_EARNERS))
            })
            .await
    }

    /// The highest salary, or 0 when there are no employees.
    pub async fn highest_salary(&self) -> Result<i64, ApiError> {
        self.caches
            .highest_salary
            .get_or_compute((), || async {
                info!("Fetching highest salary");
                Ok(max_salary(&self.fetch_all().await?))
            })
            .await
    }

    /// Creates an employee upstream and clears every region.
    pub async fn create(&self, employee: NewEmployee) -> Result<Employee, ApiError> {
        info!(name = %employee.name, "Creating employee");
        let name = employee.name.clone();

        match self
            .call_upstream(UpstreamRequest::Create(employee))
            .await?
        {
            UpstreamResponse::Employee(Some(created)) => {
                self.caches.invalidate_all();
                info!(name = %created.name, id = %created.id, "Employee created");
                Ok(created)
            }
            UpstreamResponse::Employee(None) => {
                error!(name = %name, "Failed to create employee");
                Err(ApiError::Internal("Failed to create employee".to_string()))
            }
            other => Err(unexpected(other)),
        }
    }

    /// Deletes the employee with `id` and returns their name.
    ///
    /// Upstream deletes by name, so the name is resolved through
    /// [`fetch_by_id`](Self::fetch_by_id) first. Only a 200 with a confirmed
    /// deletion counts as success; anything else fails with the upstream
    /// status.
    pub async fn delete_by_id(&self, id: &str) -> Result<String, ApiError> {
        info!(id, "Deleting employee");
        let employee = self.fetch_by_id(id).await?;

        match self
            .call_upstream(UpstreamRequest::Delete(employee.name.clone()))
            .await?
        {
            UpstreamResponse::Deleted {
                status,
                confirmed: true,
            } if status == StatusCode::OK => {
                self.caches.invalidate_all();
                info!(id, name = %employee.name, "Employee deleted");
                Ok(employee.name)
            }
            UpstreamResponse::Deleted { status, .. } => {
                error!(id, status = status.as_u16(), "Failed to delete employee");
                Err(ApiError::DeleteFailed {
                    id: id.to_string(),
                    status,
                })
            }
            other => Err(unexpected(other)),
        }
    }

    /// Clears every region.
    pub fn invalidate_all(&self) {
        self.caches.invalidate_all();
    }

    /// Counters of every region, keyed by region name.
    pub fn cache_stats(&self) -> BTreeMap<&'static str, RegionStats> {
        self.caches.stats()
    }
}

fn unexpected(response: UpstreamResponse) -> ApiError {
    error!(?response, "Upstream response does not match the request");
    ApiError::Internal("Unexpected upstream response".to_string())
}

/// Employees whose name contains `term`, ignoring case.
pub fn filter_by_name(employees: Vec<Employee>, term: &str) -> Vec<Employee> {
    let term = term.to_lowercase();
    employees
        .into_iter()
        .filter(|e| e.name.to_lowercase().contains(&term))
        .collect()
}

/// Names of the `limit` best paid employees. The sort is stable, so equal
/// salaries keep their upstream order.
pub fn top_names_by_salary(mut employees: Vec<Employee>, limit: usize) -> Vec<String> {
    employees.sort_by(|a, b| b.salary.cmp(&a.salary));
    employees
        .into_iter()
        .take(limit)
        .map(|e| e.name)
        .collect()
}

pub fn max_salary(employees: &[Employee]) -> i64 {
    employees.iter().map(|e| e.salary).max().unwrap_or(0)
}
