use crate::model::course::{Course, TopicContent};
use crate::schema::{enrollments, progress_records};
use crate::structure::WatchState;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// Cached course-level percentage, refreshed by the progress writer.
    /// May lag the freshly computed rollup between writes.
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = enrollments)]
pub struct NewEnrollment {
    pub student_id: i64,
    pub course_id: i64,
    pub progress: i32,
    // enrolled_at has a DB default (CURRENT_TIMESTAMP), completed_at NULL
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = progress_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressRecord {
    pub id: i64,
    pub student_id: i64,
    pub content_id: i64,
    pub topic_id: i64,
    pub module_id: i64,
    pub course_id: i64,
    /// Percentage of the content duration watched, in [0, 100].
    pub video_position: f64,
    pub is_completed: bool,
    pub last_accessed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A visible course the student is enrolled in, with the cached
/// enrollment-level numbers.
#[derive(Serialize, Debug)]
pub struct EnrolledCourse {
    pub course: Course,
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
pub struct CourseProgressSummary {
    pub enrollment: Enrollment,
    pub content_progress: Vec<ProgressRecord>,
}

#[derive(Serialize, Debug)]
pub struct ContentDetail {
    pub content: TopicContent,
    pub progress: Option<WatchState>,
}

/// Watch state for a single content item; zeros when the student has not
/// touched it yet.
#[derive(Serialize, Debug)]
pub struct ContentWatchStatus {
    pub video_position: f64,
    pub is_completed: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = progress_records)]
pub struct NewProgressRecord {
    pub student_id: i64,
    pub content_id: i64,
    pub topic_id: i64,
    pub module_id: i64,
    pub course_id: i64,
    pub video_position: f64,
    pub is_completed: bool,
    pub last_accessed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
