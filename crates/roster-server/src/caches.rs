//! The five cache regions behind the employee service.

use crate::error::ApiError;
use crate::model::Employee;
use roster_cache::{CacheError, CacheRegion, RegionConfig, RegionStats};
use std::collections::BTreeMap;
use std::time::Duration;

pub const EMPLOYEE_BY_ID: &str = "employeeById";
pub const SEARCH_BY_NAME: &str = "searchByName";
pub const EMPLOYEES_ALL: &str = "employeesAll";
pub const HIGHEST_SALARY: &str = "highestSalary";
pub const TOP_TEN_NAMES_BY_SALARY: &str = "topTenNamesBySalary";

const MINUTE: Duration = Duration::from_secs(60);

/// Sizes and lifetimes of the regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Entry bound shared by the two keyed regions.
    pub max_entries: usize,
    pub by_id_ttl: Duration,
    pub search_ttl: Duration,
    /// Lifetime of the list and the two aggregates derived from it.
    pub aggregate_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 50_000,
            by_id_ttl: 60 * MINUTE,
            search_ttl: 30 * MINUTE,
            aggregate_ttl: 5 * MINUTE,
        }
    }
}

/// Owned cache state of one [`EmployeeService`](crate::EmployeeService).
#[derive(Clone)]
pub struct EmployeeCaches {
    pub(crate) employee_by_id: CacheRegion<String, Employee, ApiError>,
    pub(crate) search_by_name: CacheRegion<String, Vec<Employee>, ApiError>,
    pub(crate) employees_all: CacheRegion<(), Vec<Employee>, ApiError>,
    pub(crate) highest_salary: CacheRegion<(), i64, ApiError>,
    pub(crate) top_ten_names: CacheRegion<(), Vec<String>, ApiError>,
}

impl EmployeeCaches {
    pub fn new(settings: CacheSettings) -> Result<Self, CacheError> {
        Ok(Self {
            employee_by_id: RegionConfig::builder()
                .name(EMPLOYEE_BY_ID)
                .max_entries(settings.max_entries)
                .ttl(settings.by_id_ttl)
                .build()?,
            search_by_name: RegionConfig::builder()
                .name(SEARCH_BY_NAME)
                .max_entries(settings.max_entries)
                .ttl(settings.search_ttl)
                .build()?,
            employees_all: CacheRegion::singleton(EMPLOYEES_ALL, settings.aggregate_ttl)?,
            highest_salary: CacheRegion::singleton(HIGHEST_SALARY, settings.aggregate_ttl)?,
            top_ten_names: CacheRegion::singleton(
                TOP_TEN_NAMES_BY_SALARY,
                settings.aggregate_ttl,
            )?,
        })
    }

    /// Clears all five regions.
    pub fn invalidate_all(&self) {
        self.employees_all.invalidate_all();
        self.employee_by_id.invalidate_all();
        self.search_by_name.invalidate_all();
        self.highest_salary.invalidate_all();
        self.top_ten_names.invalidate_all();
    }

    /// Counters of every region, keyed by region name.
    pub fn stats(&self) -> BTreeMap<&'static str, RegionStats> {
        BTreeMap::from([
            (EMPLOYEE_BY_ID, self.employee_by_id.stats()),
            (SEARCH_BY_NAME, self.search_by_name.stats()),
            (EMPLOYEES_ALL, self.employees_all.stats()),
            (HIGHEST_SALARY, self.highest_salary.stats()),
            (TOP_TEN_NAMES_BY_SALARY, self.top_ten_names.stats()),
        ])
    }
}
