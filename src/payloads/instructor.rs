use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Deserialize, Debug)]
pub struct CreateCoursePayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Deserialize, Debug)]
pub struct UpdateCoursePayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct ModulePayload {
    pub title: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Deserialize, Debug)]
pub struct TopicPayload {
    pub title: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Deserialize, Debug)]
pub struct TopicContentPayload {
    pub title: String,
    pub content_type: String,
    pub content_data: String,
    /// Video length in seconds; 0 for non-video content.
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub order: i32,
}

#[derive(Deserialize, Debug)]
pub struct AssignmentPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ReviewSubmissionPayload {
    #[serde(default)]
    pub feedback: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdatePerformancePayload {
    pub assignment_rating: Option<f64>,
    pub case_study_rating: Option<f64>,
    pub assignment_count: Option<i32>,
    pub case_study_count: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct TeachingPointsPayload {
    /// Array of `{title, description, visibility}` objects.
    pub teaching_points: JsonValue,
}
