use crate::schema::{assignments, performances, submissions, teaching_points};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = assignments)]
pub struct NewAssignment {
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub created_by: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Reviewed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Reviewed => "reviewed",
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = submissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub file_url: String,
    pub file_name: String,
    pub status: String,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = submissions)]
pub struct NewSubmission {
    pub assignment_id: i64,
    pub student_id: i64,
    pub file_url: String,
    pub file_name: String,
    pub status: String,
    pub feedback: String,
    // submitted_at has a DB default (CURRENT_TIMESTAMP), reviewed_at NULL
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = performances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Performance {
    pub id: i64,
    pub student_id: i64,
    pub assignment_rating: f64,
    pub case_study_rating: f64,
    /// Mean of the two ratings, recomputed on every write.
    pub total_rating: f64,
    pub assignment_count: i32,
    pub case_study_count: i32,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = performances)]
pub struct NewPerformance {
    pub student_id: i64,
    pub assignment_rating: f64,
    pub case_study_rating: f64,
    pub total_rating: f64,
    pub assignment_count: i32,
    pub case_study_count: i32,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = teaching_points)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TeachingPoint {
    pub id: i64,
    pub instructor_id: i64,
    pub date: NaiveDate,
    /// Array of `{title, description, visibility}` objects.
    pub points: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = teaching_points)]
pub struct NewTeachingPoint {
    pub instructor_id: i64,
    pub date: NaiveDate,
    pub points: JsonValue,
}
