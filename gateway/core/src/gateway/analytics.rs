//! Analytics Gateway
//!
//! Read-only aggregates over the student roster. The backend nests these
//! under `/analytics/analytics/*`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::decode;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

const TOTAL_STUDENTS_PATH: &str = "/analytics/analytics/total-students";
const BY_DEPARTMENT_PATH: &str = "/analytics/analytics/students-by-department";
const RECENT_STUDENTS_PATH: &str = "/analytics/analytics/students/recent";
const ACTIVE_STUDENTS_PATH: &str = "/analytics/analytics/students/active_last_7_days";

/// A student record as the backend reports it
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Student {
    /// Numeric id, when assigned
    #[serde(default)]
    pub id: Option<i64>,
    /// Full name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Age in years
    #[serde(default)]
    pub age: Option<i64>,
    /// Department name
    #[serde(default)]
    pub department: Option<String>,
    /// ISO-8601 enrollment time
    #[serde(default)]
    pub created_at: Option<String>,
    /// ISO-8601 last activity time
    #[serde(default)]
    pub last_active: Option<String>,
}

/// Response shape for `total_students`
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TotalStudentsResponse {
    /// Roster size
    pub total_students: u64,
    /// Snapshot time
    pub as_of: String,
}

/// One department bucket
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DepartmentCount {
    /// Department name
    pub department: String,
    /// Students in the department
    pub count: u64,
}

/// Response shape for `students_by_department`
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StudentsByDepartmentResponse {
    /// Per-department buckets
    pub results: Vec<DepartmentCount>,
    /// Number of distinct departments
    pub total_departments: u64,
    /// Roster size
    pub total_students: u64,
    /// Snapshot time
    pub as_of: String,
}

/// Response shape for `recent_students`
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecentStudentsResponse {
    /// Number of records returned
    pub count: u64,
    /// The most recently enrolled students
    pub students: Vec<Student>,
}

/// Response shape for `active_students_last_7_days`
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ActiveStudentsResponse {
    /// Number of records returned
    pub count: u64,
    /// Students active in the last seven days
    pub students: Vec<Student>,
}

/// Gateway for the analytics domain
#[derive(Clone)]
pub struct AnalyticsGateway {
    transport: Arc<dyn Transport>,
}

impl AnalyticsGateway {
    /// Create a gateway over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Total roster size
    pub async fn total_students(&self) -> Result<TotalStudentsResponse, ApiError> {
        let payload = self
            .transport
            .send(&ApiRequest::get(TOTAL_STUDENTS_PATH))
            .await?;
        decode(TOTAL_STUDENTS_PATH, payload)
    }

    /// Roster broken down by department
    pub async fn students_by_department(&self) -> Result<StudentsByDepartmentResponse, ApiError> {
        let payload = self
            .transport
            .send(&ApiRequest::get(BY_DEPARTMENT_PATH))
            .await?;
        decode(BY_DEPARTMENT_PATH, payload)
    }

    /// The `limit` most recently enrolled students
    pub async fn recent_students(&self, limit: u32) -> Result<RecentStudentsResponse, ApiError> {
        let path = format!("{RECENT_STUDENTS_PATH}?limit={limit}");
        let payload = self.transport.send(&ApiRequest::get(&path)).await?;
        decode(&path, payload)
    }

    /// Students active within the last seven days
    pub async fn active_students_last_7_days(&self) -> Result<ActiveStudentsResponse, ApiError> {
        let payload = self
            .transport
            .send(&ApiRequest::get(ACTIVE_STUDENTS_PATH))
            .await?;
        decode(ACTIVE_STUDENTS_PATH, payload)
    }
}
