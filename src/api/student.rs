use super::helper;
use crate::AppState;
use crate::errors::AppError;
use crate::gate::{Actor, Role};
use crate::model::assignment::{Assignment, NewSubmission, Submission, SubmissionStatus};
use crate::model::course::Course;
use crate::model::student::{
    ContentDetail, ContentWatchStatus, CourseProgressSummary, EnrolledCourse, Enrollment,
    NewProgressRecord, ProgressRecord,
};
use crate::payloads::student::{SaveProgressPayload, SubmitAssignmentPayload};
use crate::response::ApiResponse;
use crate::schema::{
    assignments::dsl as asg_dsl, courses::dsl as courses_dsl, enrollments::dsl as enr_dsl,
    modules::dsl as modules_dsl, progress_records::dsl as prog_dsl, submissions::dsl as sub_dsl,
    topic_contents::dsl as tc_dsl, topics::dsl as topics_dsl,
};
use crate::structure::{self, CourseProgressReport, WatchState};
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use diesel::prelude::*;
use tracing::log::warn;
use tracing::{debug, info, instrument};

/// Lists the visible courses the student is enrolled in, most recent
/// enrollment first, with the cached enrollment progress.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<EnrolledCourse>` (200 OK).
/// * `403 Forbidden`: If the caller is not a student.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_my_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Vec<EnrolledCourse>>, AppError> {
    helper::require_role(&actor, Role::Student)?;
    let student_id = actor.id;

    info!("Fetching enrolled courses for student {}", student_id);

    let rows: Vec<(Enrollment, Course)> = helper::run_query(&state.pool, move |conn| {
        enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .inner_join(courses_dsl::courses)
            .filter(courses_dsl::is_visible.eq(true))
            .order(enr_dsl::enrolled_at.desc())
            .select((Enrollment::as_select(), Course::as_select()))
            .load::<(Enrollment, Course)>(conn)
    })
    .await?;

    let courses = rows
        .into_iter()
        .map(|(enrollment, course)| EnrolledCourse {
            course,
            progress: enrollment.progress,
            enrolled_at: enrollment.enrolled_at,
            completed_at: enrollment.completed_at,
        })
        .collect::<Vec<_>>();

    info!(
        "Found {} enrolled courses for student {}",
        courses.len(),
        student_id
    );
    Ok(ApiResponse::ok(courses))
}

/// Returns the full course structure annotated with the student's
/// progress: the ordered Course→Module→Topic→Content tree, per-level
/// completion rollups and the cached enrollment numbers.
///
/// The freshly computed course percentage and the cached
/// `enrollment.progress` may diverge until the next write-triggered
/// recompute; callers must not assume they are equal.
///
/// Returns (wrapped in `ApiResponse`)
/// * `CourseProgressReport` (200 OK).
/// * `403 Forbidden`: If the caller is not a student, is not enrolled, or
///   the course is hidden.
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_course_structure(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<CourseProgressReport>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    info!(
        "Assembling course structure for course {} and student {}",
        course_id, actor.id
    );

    let enrollment = helper::require_enrollment(&state.pool, actor.id, course_id).await?;
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_view_permission(&actor, &course, true)?;

    let tree = helper::load_course_tree(&state.pool, course).await?;
    let progress_rows =
        helper::load_progress_for_contents(&state.pool, actor.id, tree.content_ids()).await?;

    let report = structure::join_progress(tree, &progress_rows, &enrollment);

    info!(
        "Course {} for student {}: {}/{} content items completed ({}%)",
        course_id,
        actor.id,
        report.course.completed_count,
        report.course.total_count,
        report.course.progress
    );
    Ok(ApiResponse::ok(report))
}

/// Returns the enrollment record plus the student's raw progress rows for
/// a course.
///
/// Returns (wrapped in `ApiResponse`)
/// * `CourseProgressSummary` (200 OK).
/// * `403 Forbidden`: If the caller is not a student or not enrolled.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_course_progress(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<CourseProgressSummary>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    let enrollment = helper::require_enrollment(&state.pool, actor.id, course_id).await?;

    let student_id = actor.id;
    let content_progress = helper::run_query(&state.pool, move |conn| {
        prog_dsl::progress_records
            .filter(prog_dsl::student_id.eq(student_id))
            .filter(prog_dsl::course_id.eq(course_id))
            .select(ProgressRecord::as_select())
            .load::<ProgressRecord>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(CourseProgressSummary {
        enrollment,
        content_progress,
    }))
}

/// Lists a course's assignments for an enrolled student, newest first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<Assignment>` (200 OK).
/// * `403 Forbidden`: If the caller is not a student, is not enrolled, or
///   the course is hidden.
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<ApiResponse<Vec<Assignment>>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    helper::require_enrollment(&state.pool, actor.id, course_id).await?;
    let course = helper::load_course(&state.pool, course_id).await?;
    helper::check_view_permission(&actor, &course, true)?;

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

/// Returns a single content item with the student's watch state, gated by
/// enrollment in the owning course.
///
/// Returns (wrapped in `ApiResponse`)
/// * `ContentDetail` (200 OK).
/// * `403 Forbidden`: If the caller is not a student, is not enrolled, or
///   the owning course is hidden.
/// * `404 Not Found`: If the content does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_content(
    State(state): State<AppState>,
    actor: Actor,
    Path(content_id): Path<i64>,
) -> Result<ApiResponse<ContentDetail>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    let course = helper::course_of_content(&state.pool, content_id).await?;
    let enrollment = helper::find_enrollment(&state.pool, actor.id, course.id).await?;
    helper::check_view_permission(&actor, &course, enrollment.is_some())?;

    let content = helper::load_content(&state.pool, content_id).await?;

    let student_id = actor.id;
    let progress: Option<ProgressRecord> = helper::run_query(&state.pool, move |conn| {
        prog_dsl::progress_records
            .filter(prog_dsl::student_id.eq(student_id))
            .filter(prog_dsl::content_id.eq(content_id))
            .select(ProgressRecord::as_select())
            .first::<ProgressRecord>(conn)
            .optional()
    })
    .await?;

    Ok(ApiResponse::ok(ContentDetail {
        content,
        progress: progress.as_ref().map(WatchState::from),
    }))
}

/// Returns the student's watch state for one content item; zeros when no
/// progress has been recorded yet.
///
/// Returns (wrapped in `ApiResponse`)
/// * `ContentWatchStatus` (200 OK).
/// * `403 Forbidden`: If the caller is not a student.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_content_progress(
    State(state): State<AppState>,
    actor: Actor,
    Path(content_id): Path<i64>,
) -> Result<ApiResponse<ContentWatchStatus>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    let student_id = actor.id;
    let progress: Option<ProgressRecord> = helper::run_query(&state.pool, move |conn| {
        prog_dsl::progress_records
            .filter(prog_dsl::student_id.eq(student_id))
            .filter(prog_dsl::content_id.eq(content_id))
            .select(ProgressRecord::as_select())
            .first::<ProgressRecord>(conn)
            .optional()
    })
    .await?;

    let status = match progress {
        Some(record) => ContentWatchStatus {
            video_position: record.video_position,
            is_completed: record.is_completed,
            last_accessed_at: Some(record.last_accessed_at),
        },
        None => ContentWatchStatus {
            video_position: 0.0,
            is_completed: false,
            last_accessed_at: None,
        },
    };

    Ok(ApiResponse::ok(status))
}

/// Records a content-watch update and refreshes the enrollment's cached
/// course percentage.
///
/// Upserts the `(student, content)` progress row (last write wins), then
/// recomputes the course-level completion over the full content set and
/// persists it on the enrollment, stamping `completed_at` the first time
/// the percentage reaches 100. The upsert and the recompute run in one
/// transaction.
///
/// Request Body: `SaveProgressPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `ProgressRecord`: The stored row (200 OK).
/// * `400 Bad Request`: If `video_position` is not a finite number.
/// * `403 Forbidden`: If the caller is not a student or not enrolled in
///   the course.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn save_video_progress(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<SaveProgressPayload>,
) -> Result<ApiResponse<ProgressRecord>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    if !payload.video_position.is_finite() {
        return Err(AppError::BadRequest(
            "video_position must be a finite number".to_string(),
        ));
    }

    let student_id = actor.id;
    let course_id = payload.course_id;

    info!(
        "Recording progress for student {} on content {} (completed: {})",
        student_id, payload.content_id, payload.is_completed
    );
    debug!("Save progress payload: {:?}", payload);

    helper::require_enrollment(&state.pool, student_id, course_id).await?;

    let video_position = payload.video_position.clamp(0.0, 100.0);

    let conn = state.pool.get().await.map_err(AppError::from)?;

    let transaction_result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                let now = Utc::now();

                let new_record = NewProgressRecord {
                    student_id,
                    content_id: payload.content_id,
                    topic_id: payload.topic_id,
                    module_id: payload.module_id,
                    course_id,
                    video_position,
                    is_completed: payload.is_completed,
                    last_accessed_at: now,
                    updated_at: now,
                };

                let record = diesel::insert_into(prog_dsl::progress_records)
                    .values(&new_record)
                    .on_conflict((prog_dsl::student_id, prog_dsl::content_id))
                    .do_update()
                    .set((
                        prog_dsl::video_position.eq(video_position),
                        prog_dsl::is_completed.eq(payload.is_completed),
                        prog_dsl::last_accessed_at.eq(now),
                        prog_dsl::updated_at.eq(now),
                    ))
                    .returning(ProgressRecord::as_returning())
                    .get_result::<ProgressRecord>(tx)
                    .map_err(AppError::from)?;

                // Course-level recompute over the full content set: the
                // same bounded module -> topic -> content id walk the
                // assembler does, reduced to counts.
                let module_ids = modules_dsl::modules
                    .filter(modules_dsl::course_id.eq(course_id))
                    .select(modules_dsl::id)
                    .load::<i64>(tx)
                    .map_err(AppError::from)?;

                let topic_ids = topics_dsl::topics
                    .filter(topics_dsl::module_id.eq_any(module_ids))
                    .select(topics_dsl::id)
                    .load::<i64>(tx)
                    .map_err(AppError::from)?;

                let content_ids = tc_dsl::topic_contents
                    .filter(tc_dsl::topic_id.eq_any(topic_ids))
                    .select(tc_dsl::id)
                    .load::<i64>(tx)
                    .map_err(AppError::from)?;

                let total = content_ids.len();
                let completed = prog_dsl::progress_records
                    .filter(prog_dsl::student_id.eq(student_id))
                    .filter(prog_dsl::is_completed.eq(true))
                    .filter(prog_dsl::content_id.eq_any(content_ids))
                    .count()
                    .get_result::<i64>(tx)
                    .map_err(AppError::from)? as usize;

                let percent = structure::completion_percent(completed, total);

                diesel::update(
                    enr_dsl::enrollments
                        .filter(enr_dsl::student_id.eq(student_id))
                        .filter(enr_dsl::course_id.eq(course_id)),
                )
                .set(enr_dsl::progress.eq(percent))
                .execute(tx)
                .map_err(AppError::from)?;

                if percent == 100 {
                    // Stamped once; a later identical write never resets it.
                    diesel::update(
                        enr_dsl::enrollments
                            .filter(enr_dsl::student_id.eq(student_id))
                            .filter(enr_dsl::course_id.eq(course_id))
                            .filter(enr_dsl::completed_at.is_null()),
                    )
                    .set(enr_dsl::completed_at.eq(now))
                    .execute(tx)
                    .map_err(AppError::from)?;
                }

                Ok::<(ProgressRecord, i32), AppError>((record, percent))
            })
        })
        .await;

    let (record, percent) = match transaction_result {
        Ok(Ok(result)) => result,
        Ok(Err(app_err)) => return Err(app_err),
        Err(interact_err) => return Err(AppError::from(interact_err)),
    };

    info!(
        "Progress recorded for student {} on content {}; course {} now at {}%",
        student_id, record.content_id, course_id, percent
    );
    Ok(ApiResponse::ok(record))
}

/// Submits a file reference for an assignment.
///
/// Request Body: `SubmitAssignmentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Submission`: The stored submission (200 OK).
/// * `400 Bad Request`: If the file reference is missing.
/// * `403 Forbidden`: If the caller is not a student or not enrolled in
///   the assignment's course.
/// * `404 Not Found`: If the assignment does not exist.
/// * `409 Conflict`: If the student already submitted for this assignment.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn submit_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(assignment_id): Path<i64>,
    Json(payload): Json<SubmitAssignmentPayload>,
) -> Result<ApiResponse<Submission>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    if payload.file_url.trim().is_empty() || payload.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("File URL is required".to_string()));
    }

    let assignment: Option<Assignment> = helper::run_query(&state.pool, move |conn| {
        asg_dsl::assignments
            .find(assignment_id)
            .select(Assignment::as_select())
            .first::<Assignment>(conn)
            .optional()
    })
    .await?;

    let Some(assignment) = assignment else {
        return Err(AppError::NotFound(format!(
            "Assignment with ID {} not found.",
            assignment_id
        )));
    };

    helper::require_enrollment(&state.pool, actor.id, assignment.course_id).await?;

    let new_submission = NewSubmission {
        assignment_id,
        student_id: actor.id,
        file_url: payload.file_url,
        file_name: payload.file_name,
        status: SubmissionStatus::Pending.as_str().to_string(),
        feedback: String::new(),
    };

    let insert_result = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(sub_dsl::submissions)
            .values(&new_submission)
            .returning(Submission::as_returning())
            .get_result::<Submission>(conn)
    })
    .await;

    match insert_result {
        Ok(submission) => {
            info!(
                "Student {} submitted for assignment {}",
                actor.id, assignment_id
            );
            Ok(ApiResponse::ok(submission))
        }
        Err(err) if helper::is_unique_violation(&err) => {
            warn!(
                "Duplicate submission by student {} for assignment {}",
                actor.id, assignment_id
            );
            Err(AppError::Conflict(
                "Assignment already submitted".to_string(),
            ))
        }
        Err(err) => Err(err),
    }
}

/// Lists the student's own submissions, newest first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<Submission>` (200 OK).
/// * `403 Forbidden`: If the caller is not a student.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn get_my_submissions(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Vec<Submission>>, AppError> {
    helper::require_role(&actor, Role::Student)?;

    let student_id = actor.id;
    let submissions = helper::run_query(&state.pool, move |conn| {
        sub_dsl::submissions
            .filter(sub_dsl::student_id.eq(student_id))
            .order(sub_dsl::submitted_at.desc())
            .select(Submission::as_select())
            .load::<Submission>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(submissions))
}
