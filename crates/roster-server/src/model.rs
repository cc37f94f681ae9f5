//! Employee records and the upstream wire format.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MIN_AGE: i32 = 16;
const MAX_AGE: i32 = 75;

/// An employee as owned by the upstream API.
///
/// Accepts both plain and `employee_`-prefixed field names when decoding,
/// and always encodes plain names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    #[serde(alias = "employee_name")]
    pub name: String,
    #[serde(alias = "employee_salary")]
    pub salary: i64,
    #[serde(alias = "employee_age")]
    pub age: i32,
    #[serde(alias = "employee_title")]
    pub title: String,
    #[serde(alias = "employee_email", default)]
    pub email: Option<String>,
}

/// Body of a create request, before validation.
///
/// Every field is optional here so that a missing field is reported through
/// [`validate`](Self::validate) rather than as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCreateRequest {
    pub name: Option<String>,
    pub salary: Option<i64>,
    pub age: Option<i32>,
    pub title: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub salary: i64,
    pub age: i32,
    pub title: String,
}

impl EmployeeCreateRequest {
    /// Checks every field and reports all failures at once.
    pub fn validate(self) -> Result<NewEmployee, ApiError> {
        let mut errors = BTreeMap::new();

        let name = non_blank(self.name);
        if name.is_none() {
            errors.insert("name".to_string(), "Name field cannot be empty".to_string());
        }

        match self.salary {
            None => {
                errors.insert("salary".to_string(), "Salary must be provided".to_string());
            }
            Some(salary) if salary <= 0 => {
                errors.insert(
                    "salary".to_string(),
                    "Salary must be greater than zero".to_string(),
                );
            }
            Some(_) => {}
        }

        match self.age {
            None => {
                errors.insert("age".to_string(), "Age is required".to_string());
            }
            Some(age) if age < MIN_AGE => {
                errors.insert(
                    "age".to_string(),
                    format!("Age should not be less than {MIN_AGE}"),
                );
            }
            Some(age) if age > MAX_AGE => {
                errors.insert("age".to_string(), format!("Age should not exceed {MAX_AGE}"));
            }
            Some(_) => {}
        }

        let title = non_blank(self.title);
        if title.is_none() {
            errors.insert("title".to_string(), "Title is required".to_string());
        }

        match (name, self.salary, self.age, title) {
            (Some(name), Some(salary), Some(age), Some(title)) if errors.is_empty() => {
                Ok(NewEmployee {
                    name,
                    salary,
                    age,
                    title,
                })
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `{ "data": ..., "status": ... }` wrapper around every upstream payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    pub status: Option<String>,
}

/// Body of the upstream delete call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeleteByName<'a> {
    pub name: &'a str,
}
