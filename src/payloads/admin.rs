use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ListStudentsParams {
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct EnrollStudentPayload {
    pub course_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct AssignCoursesPayload {
    pub course_ids: Vec<i64>,
}
