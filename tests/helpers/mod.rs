use chrono::{DateTime, TimeZone, Utc};
use lms_server::model::course::{Course, Module, Topic, TopicContent};
use lms_server::model::student::{Enrollment, ProgressRecord};
use lms_server::session::JwtConfig;

// Fixed base instant so ordering assertions are reproducible.
pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        expiry_hours: 1,
    }
}

pub fn make_course(id: i64, instructor_id: i64) -> Course {
    Course {
        id,
        title: format!("Course {id}"),
        description: "Test Desc".to_string(),
        instructor_id,
        is_visible: true,
        created_at: ts(0),
        updated_at: ts(0),
    }
}

pub fn make_module(id: i64, course_id: i64, order: i32, created_offset: i64) -> Module {
    Module {
        id,
        course_id,
        title: format!("Module {id}"),
        order,
        created_at: ts(created_offset),
        updated_at: ts(created_offset),
    }
}

pub fn make_topic(id: i64, module_id: i64, order: i32, created_offset: i64) -> Topic {
    Topic {
        id,
        module_id,
        title: format!("Topic {id}"),
        order,
        created_at: ts(created_offset),
        updated_at: ts(created_offset),
    }
}

pub fn make_content(
    id: i64,
    topic_id: i64,
    content_type: &str,
    order: i32,
    created_offset: i64,
) -> TopicContent {
    TopicContent {
        id,
        topic_id,
        title: format!("Content {id}"),
        content_type: content_type.to_string(),
        content_data: match content_type {
            "video" => format!("stream/{id}"),
            "ppt" => format!("https://files.example/{id}.pptx"),
            _ => "Lesson notes".to_string(),
        },
        duration: if content_type == "video" { 600 } else { 0 },
        order,
        created_at: ts(created_offset),
        updated_at: ts(created_offset),
    }
}

pub fn make_enrollment(student_id: i64, course_id: i64) -> Enrollment {
    Enrollment {
        id: 1,
        student_id,
        course_id,
        progress: 0,
        enrolled_at: ts(0),
        completed_at: None,
    }
}

pub fn make_progress(
    student_id: i64,
    content: &TopicContent,
    module_id: i64,
    course_id: i64,
    video_position: f64,
    is_completed: bool,
) -> ProgressRecord {
    ProgressRecord {
        id: content.id * 100 + student_id,
        student_id,
        content_id: content.id,
        topic_id: content.topic_id,
        module_id,
        course_id,
        video_position,
        is_completed,
        last_accessed_at: ts(500),
        updated_at: ts(500),
    }
}
