//! A REST proxy for employee records with caching, retry and validation.
//!
//! Requests are served from five in-memory cache regions when possible. On a
//! miss, the upstream employee API is called through a bounded retry policy
//! that only retries rate limiting and unavailability. Search and the salary
//! aggregates are derived from the cached full list. Every successful create
//! or delete clears all regions.
//!
//! ```text
//! axum router -> EmployeeService -> CacheRegion -> Retry -> UpstreamClient
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use roster_server::{router, Config, EmployeeService, UpstreamClient};
//! use clap::Parser;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::parse();
//! config.validate()?;
//!
//! let upstream = UpstreamClient::new(config.upstream_url.clone(), config.timeouts())?;
//! let service = EmployeeService::with_default_caches(upstream, config.retry_config())?;
//!
//! let listener = tokio::net::TcpListener::bind(config.listen).await?;
//! axum::serve(listener, router(service)).await?;
//! # Ok(())
//! # }
//! ```

mod caches;
mod config;
mod error;
mod model;
mod routes;
mod service;
mod upstream;

pub use caches::{
    CacheSettings, EmployeeCaches, EMPLOYEES_ALL, EMPLOYEE_BY_ID, HIGHEST_SALARY, SEARCH_BY_NAME,
    TOP_TEN_NAMES_BY_SALARY,
};
pub use config::{Config, ConfigError};
pub use error::{ApiError, ErrorBody, ValidationErrorBody};
pub use model::{Employee, EmployeeCreateRequest, NewEmployee};
pub use routes::router;
pub use service::{filter_by_name, max_salary, top_names_by_salary, EmployeeService};
pub use upstream::{
    ClientBuildError, UpstreamClient, UpstreamRequest, UpstreamResponse, UpstreamTimeouts,
};
