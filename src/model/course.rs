use crate::schema::{course_assignments, courses, modules, topic_contents, topics};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor_id: i64,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = courses)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor_id: i64,
    pub is_visible: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = course_assignments)]
pub struct NewCourseAssignment {
    pub course_id: i64,
    pub user_id: i64,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = modules)]
pub struct NewModule {
    pub course_id: i64,
    pub title: String,
    pub order: i32,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = topics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Topic {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = topics)]
pub struct NewTopic {
    pub module_id: i64,
    pub title: String,
    pub order: i32,
}

#[derive(Serialize, Debug)]
pub struct ModuleWithTopics {
    pub module: Module,
    pub topics: Vec<Topic>,
}

/// What a `topic_contents.content_data` string means depends on this:
/// a stream reference for videos, a file URL for slides, literal text
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Video,
    Ppt,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Ppt => "ppt",
            ContentType::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<ContentType> {
        match s {
            "video" => Some(ContentType::Video),
            "ppt" => Some(ContentType::Ppt),
            "text" => Some(ContentType::Text),
            _ => None,
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = topic_contents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TopicContent {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub content_type: String,
    pub content_data: String,
    pub duration: i32,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = topic_contents)]
pub struct NewTopicContent {
    pub topic_id: i64,
    pub title: String,
    pub content_type: String,
    pub content_data: String,
    pub duration: i32,
    pub order: i32,
}
