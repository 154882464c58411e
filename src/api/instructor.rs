use super::helper;
use crate::AppState;
use crate::errors::AppError;
use crate::gate::Actor;
use crate::model::assignment::{
    Assignment, NewAssignment, NewPerformance, NewTeachingPoint, Performance, Submission,
    SubmissionStatus, TeachingPoint,
};
use crate::model::course::{
    ContentType, Course, Module, ModuleWithTopics, NewCourse, NewModule, NewTopic,
    NewTopicContent, Topic, TopicContent,
};
use crate::payloads::instructor::{
    AssignmentPayload, CreateCoursePayload, ModulePayload, ReviewSubmissionPayload,
    TeachingPointsPayload, TopicContentPayload, TopicPayload, UpdateCoursePayload,
    UpdatePerformancePayload,
};
use crate::response::ApiResponse;
use crate::schema::{
    assignments::dsl as asg_dsl, course_assignments::dsl as ca_dsl, courses::dsl as courses_dsl,
    enrollments::dsl as enr_dsl, modules::dsl as modules_dsl, performances::dsl as perf_dsl,
    progress_records::dsl as prog_dsl, submissions::dsl as sub_dsl,
    teaching_points::dsl as tp_dsl, topic_contents::dsl as tc_dsl, topics::dsl as topics_dsl,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use diesel::prelude::*;
use tracing::{info, instrument};

// courses

/// Creates a course owned by the requesting instructor.
///
/// Request Body: `CreateCoursePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Course` (201 Created).
/// * `400 Bad Request`: If the title is empty.
/// * `403 Forbidden`: If the caller is not an instructor role.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateCoursePayload>,
) -> Result<ApiResponse<Course>, AppError> {
    helper::require_instructor(&actor)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Course title is required".to_string()));
    }

    let new_course = NewCourse {
        title,
        description: payload.description,
        instructor_id: actor.id,
        is_visible: payload.is_visible,
    };

    let course = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(courses_dsl::courses)
            .values(&new_course)
            .returning(Course::as_returning())
            .get_result::<Course>(conn)
    })
    .await?;

    info!("Instructor {} created course {}", actor.id, course.id);
    Ok(ApiResponse::success(StatusCode::CREATED, course))
}

/// Lists the courses the instructor owns or is assigned to, newest first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<Course>` (200 OK).
/// * `403 Forbidden`: If the caller is not an instructor role.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Vec<Course>>, AppError> {
    helper::require_instructor(&actor)?;

    let instructor_id = actor.id;
    let assigned = actor.assigned_courses.clone();
    let courses = helper::run_query(&state.pool, move |conn| {
        courses_dsl::courses
            .filter(
                courses_dsl::instructor_id
                    .eq(instructor_id)
                    .or(courses_dsl::id.eq_any(assigned)),
            )
            .order(courses_dsl::created_at.desc())
            .select(Course::as_select())
            .load::<Course>(conn)
    })
    .await?;

    info!(
        "Found {} courses for instructor {}",
        courses.len(),
        instructor_id
    );
    Ok(ApiResponse::ok(courses))
}

/// Returns one course the instructor can see (owned or assigned).
#[instrument(skip(state, actor))]
pub async fn get_course(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_view_permission(&actor, &course, false)?;
    Ok(ApiResponse::ok(course))
}

/// Updates a course's title and description. Owner-only.
///
/// Request Body: `UpdateCoursePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Course`: The updated course (200 OK).
/// * `400 Bad Request`: If the title is empty.
/// * `403 Forbidden`: If the caller does not own the course.
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
    Json(payload): Json<UpdateCoursePayload>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Course title is required".to_string()));
    }

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(courses_dsl::courses.find(course_id))
            .set((
                courses_dsl::title.eq(title),
                courses_dsl::description.eq(payload.description),
                courses_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Course::as_returning())
            .get_result::<Course>(conn)
    })
    .await?;

    info!("Course {} updated by instructor {}", course_id, actor.id);
    Ok(ApiResponse::ok(updated))
}

/// Deletes a course and everything underneath it. Owner-only.
///
/// The cascade (content, topics, modules, assignments, submissions,
/// progress, enrollments, assignment links) runs as one transaction so a
/// partial failure never leaves dangling children.
///
/// Returns (wrapped in `ApiResponse`)
/// * `()` (200 OK).
/// * `403 Forbidden`: If the caller does not own the course.
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn delete_course(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let conn = state.pool.get().await.map_err(AppError::from)?;
    let result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                let module_ids = modules_dsl::modules
                    .filter(modules_dsl::course_id.eq(course_id))
                    .select(modules_dsl::id)
                    .load::<i64>(tx)?;

                let topic_ids = topics_dsl::topics
                    .filter(topics_dsl::module_id.eq_any(module_ids.clone()))
                    .select(topics_dsl::id)
                    .load::<i64>(tx)?;

                let assignment_ids = asg_dsl::assignments
                    .filter(asg_dsl::course_id.eq(course_id))
                    .select(asg_dsl::id)
                    .load::<i64>(tx)?;

                diesel::delete(
                    prog_dsl::progress_records.filter(prog_dsl::course_id.eq(course_id)),
                )
                .execute(tx)?;
                diesel::delete(tc_dsl::topic_contents.filter(tc_dsl::topic_id.eq_any(topic_ids)))
                    .execute(tx)?;
                diesel::delete(
                    topics_dsl::topics.filter(topics_dsl::module_id.eq_any(module_ids)),
                )
                .execute(tx)?;
                diesel::delete(modules_dsl::modules.filter(modules_dsl::course_id.eq(course_id)))
                    .execute(tx)?;
                diesel::delete(
                    sub_dsl::submissions.filter(sub_dsl::assignment_id.eq_any(assignment_ids)),
                )
                .execute(tx)?;
                diesel::delete(asg_dsl::assignments.filter(asg_dsl::course_id.eq(course_id)))
                    .execute(tx)?;
                diesel::delete(enr_dsl::enrollments.filter(enr_dsl::course_id.eq(course_id)))
                    .execute(tx)?;
                diesel::delete(
                    ca_dsl::course_assignments.filter(ca_dsl::course_id.eq(course_id)),
                )
                .execute(tx)?;
                diesel::delete(courses_dsl::courses.find(course_id)).execute(tx)?;

                Ok::<(), diesel::result::Error>(())
            })
        })
        .await;

    match result {
        Ok(Ok(())) => {
            info!("Course {} deleted by instructor {}", course_id, actor.id);
            Ok(ApiResponse::ok(()))
        }
        Ok(Err(diesel_err)) => Err(AppError::from(diesel_err)),
        Err(interact_err) => Err(AppError::from(interact_err)),
    }
}

/// Flips a course's visibility. Owner-only.
#[instrument(skip(state, actor))]
pub async fn toggle_course_visibility(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let next = !course.is_visible;
    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(courses_dsl::courses.find(course_id))
            .set((
                courses_dsl::is_visible.eq(next),
                courses_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Course::as_returning())
            .get_result::<Course>(conn)
    })
    .await?;

    info!(
        "Course {} visibility set to {} by instructor {}",
        course_id, next, actor.id
    );
    Ok(ApiResponse::ok(updated))
}

// modules

/// Adds a module to a course. Owner-only: assignment to a course does not
/// grant structural edits.
///
/// Request Body: `ModulePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Module` (201 Created).
/// * `400 Bad Request`: If the title is empty.
/// * `403 Forbidden`: If the caller does not own the course.
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn create_module(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
    Json(payload): Json<ModulePayload>,
) -> Result<ApiResponse<Module>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Module title is required".to_string()));
    }

    let new_module = NewModule {
        course_id,
        title,
        order: payload.order,
    };

    let module = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(modules_dsl::modules)
            .values(&new_module)
            .returning(Module::as_returning())
            .get_result::<Module>(conn)
    })
    .await?;

    info!(
        "Module {} created under course {} by instructor {}",
        module.id, course_id, actor.id
    );
    Ok(ApiResponse::success(StatusCode::CREATED, module))
}

/// Lists a course's modules in display order.
#[instrument(skip(state, actor))]
pub async fn get_modules(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<Vec<Module>>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_view_permission(&actor, &course, false)?;

    let modules = helper::run_query(&state.pool, move |conn| {
        modules_dsl::modules
            .filter(modules_dsl::course_id.eq(course_id))
            .order((
                modules_dsl::order.asc(),
                modules_dsl::created_at.asc(),
                modules_dsl::id.asc(),
            ))
            .select(Module::as_select())
            .load::<Module>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(modules))
}

/// Returns one module with its topics in display order.
#[instrument(skip(state, actor))]
pub async fn get_module(
    State(state): State<AppState>,
    actor: Actor,
    Path(module_id): Path<i64>,
) -> Result<ApiResponse<ModuleWithTopics>, AppError> {
    let module = helper::load_module(&state.pool, module_id).await?;
    let course = helper::load_course(&state.pool, module.course_id).await?;
    helper::check_view_permission(&actor, &course, false)?;

    let topics = helper::run_query(&state.pool, move |conn| {
        topics_dsl::topics
            .filter(topics_dsl::module_id.eq(module_id))
            .order((
                topics_dsl::order.asc(),
                topics_dsl::created_at.asc(),
                topics_dsl::id.asc(),
            ))
            .select(Topic::as_select())
            .load::<Topic>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(ModuleWithTopics { module, topics }))
}

/// Updates a module's title and order. Owner-only.
#[instrument(skip(state, actor, payload))]
pub async fn update_module(
    State(state): State<AppState>,
    actor: Actor,
    Path(module_id): Path<i64>,
    Json(payload): Json<ModulePayload>,
) -> Result<ApiResponse<Module>, AppError> {
    let module = helper::load_module(&state.pool, module_id).await?;
    let course = helper::load_course(&state.pool, module.course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Module title is required".to_string()));
    }

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(modules_dsl::modules.find(module_id))
            .set((
                modules_dsl::title.eq(title),
                modules_dsl::order.eq(payload.order),
                modules_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Module::as_returning())
            .get_result::<Module>(conn)
    })
    .await?;

    info!("Module {} updated by instructor {}", module_id, actor.id);
    Ok(ApiResponse::ok(updated))
}

/// Deletes a module, its topics and their content in one transaction.
/// Owner-only.
#[instrument(skip(state, actor))]
pub async fn delete_module(
    State(state): State<AppState>,
    actor: Actor,
    Path(module_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let module = helper::load_module(&state.pool, module_id).await?;
    let course = helper::load_course(&state.pool, module.course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let conn = state.pool.get().await.map_err(AppError::from)?;
    let result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                let topic_ids = topics_dsl::topics
                    .filter(topics_dsl::module_id.eq(module_id))
                    .select(topics_dsl::id)
                    .load::<i64>(tx)?;

                diesel::delete(tc_dsl::topic_contents.filter(tc_dsl::topic_id.eq_any(topic_ids)))
                    .execute(tx)?;
                diesel::delete(topics_dsl::topics.filter(topics_dsl::module_id.eq(module_id)))
                    .execute(tx)?;
                diesel::delete(modules_dsl::modules.find(module_id)).execute(tx)?;

                Ok::<(), diesel::result::Error>(())
            })
        })
        .await;

    match result {
        Ok(Ok(())) => {
            info!("Module {} deleted by instructor {}", module_id, actor.id);
            Ok(ApiResponse::ok(()))
        }
        Ok(Err(diesel_err)) => Err(AppError::from(diesel_err)),
        Err(interact_err) => Err(AppError::from(interact_err)),
    }
}

// topics

/// Adds a topic to a module. Owner-only.
#[instrument(skip(state, actor, payload))]
pub async fn create_topic(
    State(state): State<AppState>,
    actor: Actor,
    Path(module_id): Path<i64>,
    Json(payload): Json<TopicPayload>,
) -> Result<ApiResponse<Topic>, AppError> {
    let module = helper::load_module(&state.pool, module_id).await?;
    let course = helper::load_course(&state.pool, module.course_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Topic title is required".to_string()));
    }

    let new_topic = NewTopic {
        module_id,
        title,
        order: payload.order,
    };

    let topic = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(topics_dsl::topics)
            .values(&new_topic)
            .returning(Topic::as_returning())
            .get_result::<Topic>(conn)
    })
    .await?;

    info!(
        "Topic {} created under module {} by instructor {}",
        topic.id, module_id, actor.id
    );
    Ok(ApiResponse::success(StatusCode::CREATED, topic))
}

/// Lists a module's topics in display order.
#[instrument(skip(state, actor))]
pub async fn get_topics(
    State(state): State<AppState>,
    actor: Actor,
    Path(module_id): Path<i64>,
) -> Result<ApiResponse<Vec<Topic>>, AppError> {
    let module = helper::load_module(&state.pool, module_id).await?;
    let course = helper::load_course(&state.pool, module.course_id).await?;
    helper::check_view_permission(&actor, &course, false)?;

    let topics = helper::run_query(&state.pool, move |conn| {
        topics_dsl::topics
            .filter(topics_dsl::module_id.eq(module_id))
            .order((
                topics_dsl::order.asc(),
                topics_dsl::created_at.asc(),
                topics_dsl::id.asc(),
            ))
            .select(Topic::as_select())
            .load::<Topic>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(topics))
}

/// Updates a topic's title and order. Owner-only.
#[instrument(skip(state, actor, payload))]
pub async fn update_topic(
    State(state): State<AppState>,
    actor: Actor,
    Path(topic_id): Path<i64>,
    Json(payload): Json<TopicPayload>,
) -> Result<ApiResponse<Topic>, AppError> {
    let course = helper::course_of_topic(&state.pool, topic_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Topic title is required".to_string()));
    }

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(topics_dsl::topics.find(topic_id))
            .set((
                topics_dsl::title.eq(title),
                topics_dsl::order.eq(payload.order),
                topics_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Topic::as_returning())
            .get_result::<Topic>(conn)
    })
    .await?;

    info!("Topic {} updated by instructor {}", topic_id, actor.id);
    Ok(ApiResponse::ok(updated))
}

/// Deletes a topic and its content in one transaction. Owner-only.
#[instrument(skip(state, actor))]
pub async fn delete_topic(
    State(state): State<AppState>,
    actor: Actor,
    Path(topic_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let course = helper::course_of_topic(&state.pool, topic_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let conn = state.pool.get().await.map_err(AppError::from)?;
    let result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                diesel::delete(tc_dsl::topic_contents.filter(tc_dsl::topic_id.eq(topic_id)))
                    .execute(tx)?;
                diesel::delete(topics_dsl::topics.find(topic_id)).execute(tx)?;
                Ok::<(), diesel::result::Error>(())
            })
        })
        .await;

    match result {
        Ok(Ok(())) => {
            info!("Topic {} deleted by instructor {}", topic_id, actor.id);
            Ok(ApiResponse::ok(()))
        }
        Ok(Err(diesel_err)) => Err(AppError::from(diesel_err)),
        Err(interact_err) => Err(AppError::from(interact_err)),
    }
}

// topic content

/// Adds a content item to a topic. Owner-only.
///
/// Request Body: `TopicContentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `TopicContent` (201 Created).
/// * `400 Bad Request`: If the title or data is empty or the content type
///   is not one of `video`, `ppt`, `text`.
/// * `403 Forbidden`: If the caller does not own the course.
/// * `404 Not Found`: If the topic does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn create_content(
    State(state): State<AppState>,
    actor: Actor,
    Path(topic_id): Path<i64>,
    Json(payload): Json<TopicContentPayload>,
) -> Result<ApiResponse<TopicContent>, AppError> {
    let course = helper::course_of_topic(&state.pool, topic_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let content_type = validate_content_payload(&payload)?;

    let new_content = NewTopicContent {
        topic_id,
        title: payload.title.trim().to_string(),
        content_type: content_type.as_str().to_string(),
        content_data: payload.content_data,
        duration: payload.duration.max(0),
        order: payload.order,
    };

    let content = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(tc_dsl::topic_contents)
            .values(&new_content)
            .returning(TopicContent::as_returning())
            .get_result::<TopicContent>(conn)
    })
    .await?;

    info!(
        "Content {} ({}) created under topic {} by instructor {}",
        content.id, content.content_type, topic_id, actor.id
    );
    Ok(ApiResponse::success(StatusCode::CREATED, content))
}

/// Lists a topic's content in display order.
#[instrument(skip(state, actor))]
pub async fn get_contents(
    State(state): State<AppState>,
    actor: Actor,
    Path(topic_id): Path<i64>,
) -> Result<ApiResponse<Vec<TopicContent>>, AppError> {
    let course = helper::course_of_topic(&state.pool, topic_id).await?;
    helper::check_view_permission(&actor, &course, false)?;

    let contents = helper::run_query(&state.pool, move |conn| {
        tc_dsl::topic_contents
            .filter(tc_dsl::topic_id.eq(topic_id))
            .order((
                tc_dsl::order.asc(),
                tc_dsl::created_at.asc(),
                tc_dsl::id.asc(),
            ))
            .select(TopicContent::as_select())
            .load::<TopicContent>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(contents))
}

/// Updates a content item. Owner-only.
#[instrument(skip(state, actor, payload))]
pub async fn update_content(
    State(state): State<AppState>,
    actor: Actor,
    Path(content_id): Path<i64>,
    Json(payload): Json<TopicContentPayload>,
) -> Result<ApiResponse<TopicContent>, AppError> {
    let course = helper::course_of_content(&state.pool, content_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    let content_type = validate_content_payload(&payload)?;

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(tc_dsl::topic_contents.find(content_id))
            .set((
                tc_dsl::title.eq(payload.title.trim().to_string()),
                tc_dsl::content_type.eq(content_type.as_str()),
                tc_dsl::content_data.eq(payload.content_data),
                tc_dsl::duration.eq(payload.duration.max(0)),
                tc_dsl::order.eq(payload.order),
                tc_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(TopicContent::as_returning())
            .get_result::<TopicContent>(conn)
    })
    .await?;

    info!("Content {} updated by instructor {}", content_id, actor.id);
    Ok(ApiResponse::ok(updated))
}

/// Deletes a content item. Owner-only.
#[instrument(skip(state, actor))]
pub async fn delete_content(
    State(state): State<AppState>,
    actor: Actor,
    Path(content_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let course = helper::course_of_content(&state.pool, content_id).await?;
    helper::check_structure_permission(&actor, &course)?;

    helper::run_query(&state.pool, move |conn| {
        diesel::delete(tc_dsl::topic_contents.find(content_id)).execute(conn)
    })
    .await?;

    info!("Content {} deleted by instructor {}", content_id, actor.id);
    Ok(ApiResponse::ok(()))
}

fn validate_content_payload(payload: &TopicContentPayload) -> Result<ContentType, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Content title is required".to_string(),
        ));
    }
    if payload.content_data.trim().is_empty() {
        return Err(AppError::BadRequest("Content data is required".to_string()));
    }
    ContentType::parse(&payload.content_type)
        .ok_or_else(|| AppError::BadRequest("Invalid content type".to_string()))
}

// assignments

/// Creates an assignment on a course. Open to the owner and to assigned
/// instructors (the collaborative surface).
#[instrument(skip(state, actor, payload))]
pub async fn create_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
    Json(payload): Json<AssignmentPayload>,
) -> Result<ApiResponse<Assignment>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_content_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest(
            "Assignment title is required".to_string(),
        ));
    }

    let new_assignment = NewAssignment {
        course_id,
        title,
        description: payload.description,
        due_date: payload.due_date,
        attachment_url: payload.attachment_url,
        attachment_name: payload.attachment_name,
        created_by: actor.id,
    };

    let assignment = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(asg_dsl::assignments)
            .values(&new_assignment)
            .returning(Assignment::as_returning())
            .get_result::<Assignment>(conn)
    })
    .await?;

    info!(
        "Assignment {} created on course {} by instructor {}",
        assignment.id, course_id, actor.id
    );
    Ok(ApiResponse::success(StatusCode::CREATED, assignment))
}

/// Lists a course's assignments, newest first.
#[instrument(skip(state, actor))]
pub async fn get_course_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<Vec<Assignment>>, AppError> {
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_view_permission(&actor, &course, false)?;

    let assignments = helper::run_query(&state.pool, move |conn| {
        asg_dsl::assignments
            .filter(asg_dsl::course_id.eq(course_id))
            .order(asg_dsl::created_at.desc())
            .select(Assignment::as_select())
            .load::<Assignment>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(assignments))
}

/// Updates an assignment. Owner or assigned.
#[instrument(skip(state, actor, payload))]
pub async fn update_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(assignment_id): Path<i64>,
    Json(payload): Json<AssignmentPayload>,
) -> Result<ApiResponse<Assignment>, AppError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    let course = helper::load_course(&state.pool, assignment.course_id).await?;
    helper::check_content_permission(&actor, &course)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest(
            "Assignment title is required".to_string(),
        ));
    }

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(asg_dsl::assignments.find(assignment_id))
            .set((
                asg_dsl::title.eq(title),
                asg_dsl::description.eq(payload.description),
                asg_dsl::due_date.eq(payload.due_date),
                asg_dsl::attachment_url.eq(payload.attachment_url),
                asg_dsl::attachment_name.eq(payload.attachment_name),
                asg_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Assignment::as_returning())
            .get_result::<Assignment>(conn)
    })
    .await?;

    info!(
        "Assignment {} updated by instructor {}",
        assignment_id, actor.id
    );
    Ok(ApiResponse::ok(updated))
}

/// Deletes an assignment and its submissions in one transaction. Owner or
/// assigned.
#[instrument(skip(state, actor))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(assignment_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    let course = helper::load_course(&state.pool, assignment.course_id).await?;
    helper::check_content_permission(&actor, &course)?;

    let conn = state.pool.get().await.map_err(AppError::from)?;
    let result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                diesel::delete(
                    sub_dsl::submissions.filter(sub_dsl::assignment_id.eq(assignment_id)),
                )
                .execute(tx)?;
                diesel::delete(asg_dsl::assignments.find(assignment_id)).execute(tx)?;
                Ok::<(), diesel::result::Error>(())
            })
        })
        .await;

    match result {
        Ok(Ok(())) => {
            info!(
                "Assignment {} deleted by instructor {}",
                assignment_id, actor.id
            );
            Ok(ApiResponse::ok(()))
        }
        Ok(Err(diesel_err)) => Err(AppError::from(diesel_err)),
        Err(interact_err) => Err(AppError::from(interact_err)),
    }
}

/// Lists submissions for an assignment, newest first. Owner or assigned.
#[instrument(skip(state, actor))]
pub async fn get_submissions(
    State(state): State<AppState>,
    actor: Actor,
    Path(assignment_id): Path<i64>,
) -> Result<ApiResponse<Vec<Submission>>, AppError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    let course = helper::load_course(&state.pool, assignment.course_id).await?;
    helper::check_content_permission(&actor, &course)?;

    let submissions = helper::run_query(&state.pool, move |conn| {
        sub_dsl::submissions
            .filter(sub_dsl::assignment_id.eq(assignment_id))
            .order(sub_dsl::submitted_at.desc())
            .select(Submission::as_select())
            .load::<Submission>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(submissions))
}

/// Marks a submission reviewed with feedback. Owner or assigned.
#[instrument(skip(state, actor, payload))]
pub async fn review_submission(
    State(state): State<AppState>,
    actor: Actor,
    Path(submission_id): Path<i64>,
    Json(payload): Json<ReviewSubmissionPayload>,
) -> Result<ApiResponse<Submission>, AppError> {
    let submission: Option<Submission> = helper::run_query(&state.pool, move |conn| {
        sub_dsl::submissions
            .find(submission_id)
            .select(Submission::as_select())
            .first::<Submission>(conn)
            .optional()
    })
    .await?;

    let Some(submission) = submission else {
        return Err(AppError::NotFound(format!(
            "Submission with ID {} not found.",
            submission_id
        )));
    };

    let assignment = load_assignment(&state, submission.assignment_id).await?;
    let course = helper::load_course(&state.pool, assignment.course_id).await?;
    helper::check_content_permission(&actor, &course)?;

    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(sub_dsl::submissions.find(submission_id))
            .set((
                sub_dsl::status.eq(SubmissionStatus::Reviewed.as_str()),
                sub_dsl::feedback.eq(payload.feedback),
                sub_dsl::reviewed_at.eq(Utc::now()),
            ))
            .returning(Submission::as_returning())
            .get_result::<Submission>(conn)
    })
    .await?;

    info!(
        "Submission {} reviewed by instructor {}",
        submission_id, actor.id
    );
    Ok(ApiResponse::ok(updated))
}

async fn load_assignment(state: &AppState, assignment_id: i64) -> Result<Assignment, AppError> {
    helper::run_query(&state.pool, move |conn| {
        asg_dsl::assignments
            .find(assignment_id)
            .select(Assignment::as_select())
            .first::<Assignment>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("Assignment with ID {} not found.", assignment_id))
    })
}

// performance ratings

/// Upserts a student's performance ratings and recomputes the total as the
/// mean of the assignment and case-study ratings.
///
/// Request Body: `UpdatePerformancePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Performance` (200 OK).
/// * `400 Bad Request`: If a rating is outside [0, 5].
/// * `403 Forbidden`: If the caller is not an instructor role.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn update_performance(
    State(state): State<AppState>,
    actor: Actor,
    Path(student_id): Path<i64>,
    Json(payload): Json<UpdatePerformancePayload>,
) -> Result<ApiResponse<Performance>, AppError> {
    helper::require_instructor(&actor)?;

    for rating in [payload.assignment_rating, payload.case_study_rating]
        .into_iter()
        .flatten()
    {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::BadRequest(
                "Ratings must be between 0 and 5".to_string(),
            ));
        }
    }

    let existing: Option<Performance> = helper::run_query(&state.pool, move |conn| {
        perf_dsl::performances
            .filter(perf_dsl::student_id.eq(student_id))
            .select(Performance::as_select())
            .first::<Performance>(conn)
            .optional()
    })
    .await?;

    let (current_assignment, current_case_study, current_asg_count, current_cs_count) =
        match &existing {
            Some(p) => (
                p.assignment_rating,
                p.case_study_rating,
                p.assignment_count,
                p.case_study_count,
            ),
            None => (0.0, 0.0, 0, 0),
        };

    let assignment_rating = payload.assignment_rating.unwrap_or(current_assignment);
    let case_study_rating = payload.case_study_rating.unwrap_or(current_case_study);
    let total_rating = (assignment_rating + case_study_rating) / 2.0;
    let assignment_count = payload.assignment_count.unwrap_or(current_asg_count);
    let case_study_count = payload.case_study_count.unwrap_or(current_cs_count);
    let updated_by = actor.id;

    let performance = helper::run_query(&state.pool, move |conn| {
        let record = NewPerformance {
            student_id,
            assignment_rating,
            case_study_rating,
            total_rating,
            assignment_count,
            case_study_count,
            updated_by: Some(updated_by),
            updated_at: Utc::now(),
        };
        diesel::insert_into(perf_dsl::performances)
            .values(&record)
            .on_conflict(perf_dsl::student_id)
            .do_update()
            .set((
                perf_dsl::assignment_rating.eq(assignment_rating),
                perf_dsl::case_study_rating.eq(case_study_rating),
                perf_dsl::total_rating.eq(total_rating),
                perf_dsl::assignment_count.eq(assignment_count),
                perf_dsl::case_study_count.eq(case_study_count),
                perf_dsl::updated_by.eq(Some(updated_by)),
                perf_dsl::updated_at.eq(Utc::now()),
            ))
            .returning(Performance::as_returning())
            .get_result::<Performance>(conn)
    })
    .await?;

    info!(
        "Performance for student {} updated by instructor {} (total: {:.2})",
        student_id, actor.id, performance.total_rating
    );
    Ok(ApiResponse::ok(performance))
}

// teaching points

/// Replaces today's teaching-point list for the requesting instructor.
///
/// Request Body: `TeachingPointsPayload`
#[instrument(skip(state, actor, payload))]
pub async fn update_today_teaching_points(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<TeachingPointsPayload>,
) -> Result<ApiResponse<TeachingPoint>, AppError> {
    helper::require_instructor(&actor)?;

    if !payload.teaching_points.is_array() {
        return Err(AppError::BadRequest(
            "Teaching points must be an array".to_string(),
        ));
    }

    let instructor_id = actor.id;
    let today = Utc::now().date_naive();
    let points = payload.teaching_points;

    let record = helper::run_query(&state.pool, move |conn| {
        let existing = tp_dsl::teaching_points
            .filter(tp_dsl::instructor_id.eq(instructor_id))
            .filter(tp_dsl::date.eq(today))
            .select(TeachingPoint::as_select())
            .first::<TeachingPoint>(conn)
            .optional()?;

        match existing {
            Some(found) => diesel::update(tp_dsl::teaching_points.find(found.id))
                .set((
                    tp_dsl::points.eq(points),
                    tp_dsl::updated_at.eq(Utc::now()),
                ))
                .returning(TeachingPoint::as_returning())
                .get_result::<TeachingPoint>(conn),
            None => {
                let new_record = NewTeachingPoint {
                    instructor_id,
                    date: today,
                    points,
                };
                diesel::insert_into(tp_dsl::teaching_points)
                    .values(&new_record)
                    .returning(TeachingPoint::as_returning())
                    .get_result::<TeachingPoint>(conn)
            }
        }
    })
    .await?;

    info!("Teaching points updated for instructor {}", instructor_id);
    Ok(ApiResponse::ok(record))
}

/// Returns today's teaching-point list for the requesting instructor, if
/// one exists.
#[instrument(skip(state, actor))]
pub async fn get_today_teaching_points(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Option<TeachingPoint>>, AppError> {
    helper::require_instructor(&actor)?;

    let instructor_id = actor.id;
    let today = Utc::now().date_naive();
    let record = helper::run_query(&state.pool, move |conn| {
        tp_dsl::teaching_points
            .filter(tp_dsl::instructor_id.eq(instructor_id))
            .filter(tp_dsl::date.eq(today))
            .select(TeachingPoint::as_select())
            .first::<TeachingPoint>(conn)
            .optional()
    })
    .await?;

    Ok(ApiResponse::ok(record))
}
