use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct SaveProgressPayload {
    pub content_id: i64,
    pub topic_id: i64,
    pub module_id: i64,
    pub course_id: i64,
    /// Percentage of the content duration watched, clamped to [0, 100].
    pub video_position: f64,
    pub is_completed: bool,
}

#[derive(Deserialize, Debug)]
pub struct SubmitAssignmentPayload {
    pub file_url: String,
    pub file_name: String,
}
