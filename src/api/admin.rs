use super::helper;
use crate::AppState;
use crate::errors::AppError;
use crate::gate::{Actor, Role};
use crate::model::course::{Course, NewCourseAssignment};
use crate::model::student::{EnrolledCourse, Enrollment, NewEnrollment};
use crate::model::user::{User, UserSummary};
use crate::payloads::admin::{AssignCoursesPayload, EnrollStudentPayload, ListStudentsParams};
use crate::response::ApiResponse;
use crate::schema::{
    course_assignments::dsl as ca_dsl, courses::dsl as courses_dsl, enrollments::dsl as enr_dsl,
    users::dsl as users_dsl,
};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use diesel::prelude::*;
use tracing::log::warn;
use tracing::{info, instrument};

/// Lists student accounts, optionally filtered by active state, newest
/// first.
///
/// Query Parameters:
/// * `is_active`: Optional filter.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<UserSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an admin.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, params))]
pub async fn get_students(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<ListStudentsParams>,
) -> Result<ApiResponse<Vec<UserSummary>>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    let students = helper::run_query(&state.pool, move |conn| {
        let mut query = users_dsl::users
            .filter(users_dsl::role.eq(Role::Student.as_str()))
            .select(User::as_select())
            .into_boxed();
        if let Some(is_active) = params.is_active {
            query = query.filter(users_dsl::is_active.eq(is_active));
        }
        query
            .order(users_dsl::created_at.desc())
            .load::<User>(conn)
    })
    .await?;

    info!("Admin {} listed {} students", actor.id, students.len());
    Ok(ApiResponse::ok(
        students.into_iter().map(UserSummary::from).collect(),
    ))
}

/// Flips a student account between active and deactivated. Deactivation
/// takes effect on the student's next request, since verification rejects
/// inactive accounts.
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserSummary`: The updated account (200 OK).
/// * `403 Forbidden`: If the caller is not an admin.
/// * `404 Not Found`: If no student with the given ID exists.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn toggle_student_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(student_id): Path<i64>,
) -> Result<ApiResponse<UserSummary>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    let student = load_student(&state, student_id).await?;

    let next = !student.is_active;
    let updated = helper::run_query(&state.pool, move |conn| {
        diesel::update(users_dsl::users.find(student_id))
            .set(users_dsl::is_active.eq(next))
            .returning(User::as_returning())
            .get_result::<User>(conn)
    })
    .await?;

    info!(
        "Admin {} set student {} active={}",
        actor.id, student_id, next
    );
    Ok(ApiResponse::ok(UserSummary::from(updated)))
}

/// Enrolls a student in a course.
///
/// Request Body: `EnrollStudentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Enrollment`: The new enrollment (200 OK).
/// * `403 Forbidden`: If the caller is not an admin.
/// * `404 Not Found`: If the student or course does not exist.
/// * `409 Conflict`: If the student is already enrolled in the course.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn enroll_student(
    State(state): State<AppState>,
    actor: Actor,
    Path(student_id): Path<i64>,
    Json(payload): Json<EnrollStudentPayload>,
) -> Result<ApiResponse<Enrollment>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    load_student(&state, student_id).await?;
    helper::load_course(&state.pool, payload.course_id).await?;

    let new_enrollment = NewEnrollment {
        student_id,
        course_id: payload.course_id,
        progress: 0,
    };

    let insert_result = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(enr_dsl::enrollments)
            .values(&new_enrollment)
            .returning(Enrollment::as_returning())
            .get_result::<Enrollment>(conn)
    })
    .await;

    match insert_result {
        Ok(enrollment) => {
            info!(
                "Admin {} enrolled student {} in course {}",
                actor.id, student_id, payload.course_id
            );
            Ok(ApiResponse::ok(enrollment))
        }
        Err(err) if helper::is_unique_violation(&err) => {
            warn!(
                "Student {} is already enrolled in course {}",
                student_id, payload.course_id
            );
            Err(AppError::Conflict(
                "Student already enrolled in this course".to_string(),
            ))
        }
        Err(err) => Err(err),
    }
}

/// Lists a student's enrollments with their courses (hidden ones
/// included), newest first.
#[instrument(skip(state, actor))]
pub async fn get_student_enrollments(
    State(state): State<AppState>,
    actor: Actor,
    Path(student_id): Path<i64>,
) -> Result<ApiResponse<Vec<EnrolledCourse>>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    load_student(&state, student_id).await?;

    let rows: Vec<(Enrollment, Course)> = helper::run_query(&state.pool, move |conn| {
        enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .inner_join(courses_dsl::courses)
            .order(enr_dsl::enrolled_at.desc())
            .select((Enrollment::as_select(), Course::as_select()))
            .load::<(Enrollment, Course)>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(
        rows.into_iter()
            .map(|(enrollment, course)| EnrolledCourse {
                course,
                progress: enrollment.progress,
                enrolled_at: enrollment.enrolled_at,
                completed_at: enrollment.completed_at,
            })
            .collect(),
    ))
}

/// Lists instructor-family accounts, newest first.
#[instrument(skip(state, actor))]
pub async fn get_faculty(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Vec<UserSummary>>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    let faculty = helper::run_query(&state.pool, move |conn| {
        users_dsl::users
            .filter(users_dsl::role.eq_any(vec![
                Role::Instructor.as_str(),
                Role::SuperInstructor.as_str(),
            ]))
            .order(users_dsl::created_at.desc())
            .select(User::as_select())
            .load::<User>(conn)
    })
    .await?;

    Ok(ApiResponse::ok(
        faculty.into_iter().map(UserSummary::from).collect(),
    ))
}

/// Replaces an instructor's assigned-course set.
///
/// Request Body: `AssignCoursesPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<i64>`: The course IDs now assigned (200 OK).
/// * `400 Bad Request`: If the target user is not an instructor role.
/// * `403 Forbidden`: If the caller is not an admin.
/// * `404 Not Found`: If the user or any referenced course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor, payload))]
pub async fn assign_courses(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
    Json(payload): Json<AssignCoursesPayload>,
) -> Result<ApiResponse<Vec<i64>>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    let user: Option<User> = helper::run_query(&state.pool, move |conn| {
        users_dsl::users
            .find(user_id)
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    })
    .await?;

    let Some(user) = user else {
        return Err(AppError::NotFound(format!(
            "User with ID {} not found.",
            user_id
        )));
    };

    let is_instructor = Role::parse(&user.role).is_some_and(|r| r.is_instructor());
    if !is_instructor {
        return Err(AppError::BadRequest(
            "Courses can only be assigned to instructor accounts".to_string(),
        ));
    }

    let requested = payload.course_ids.clone();
    let found = helper::run_query(&state.pool, {
        let requested = requested.clone();
        move |conn| {
            courses_dsl::courses
                .filter(courses_dsl::id.eq_any(requested))
                .select(courses_dsl::id)
                .load::<i64>(conn)
        }
    })
    .await?;

    if found.len() != requested.len() {
        let missing: Vec<i64> = requested
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect();
        return Err(AppError::NotFound(format!(
            "Courses not found: {:?}",
            missing
        )));
    }

    let assigned = requested.clone();
    let conn = state.pool.get().await.map_err(AppError::from)?;
    let result = conn
        .interact(move |conn_sync| {
            conn_sync.transaction(|tx| {
                diesel::delete(ca_dsl::course_assignments.filter(ca_dsl::user_id.eq(user_id)))
                    .execute(tx)?;
                let rows: Vec<NewCourseAssignment> = assigned
                    .iter()
                    .map(|course_id| NewCourseAssignment {
                        course_id: *course_id,
                        user_id,
                    })
                    .collect();
                diesel::insert_into(ca_dsl::course_assignments)
                    .values(&rows)
                    .execute(tx)?;
                Ok::<(), diesel::result::Error>(())
            })
        })
        .await;

    match result {
        Ok(Ok(())) => {
            info!(
                "Admin {} assigned {} courses to user {}",
                actor.id,
                requested.len(),
                user_id
            );
            Ok(ApiResponse::ok(requested))
        }
        Ok(Err(diesel_err)) => Err(AppError::from(diesel_err)),
        Err(interact_err) => Err(AppError::from(interact_err)),
    }
}

/// Lists every course, hidden ones included, newest first.
#[instrument(skip(state, actor))]
pub async fn get_all_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<Vec<Course>>, AppError> {
    helper::require_role(&actor, Role::Admin)?;

    let courses = helper::run_query(&state.pool, move |conn| {
        courses_dsl::courses
            .order(courses_dsl::created_at.desc())
            .select(Course::as_select())
            .load::<Course>(conn)
    })
    .await?;

    info!("Admin {} listed {} courses", actor.id, courses.len());
    Ok(ApiResponse::ok(courses))
}

async fn load_student(state: &AppState, student_id: i64) -> Result<User, AppError> {
    let user: Option<User> = helper::run_query(&state.pool, move |conn| {
        users_dsl::users
            .find(student_id)
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    })
    .await?;

    match user {
        Some(user) if user.role == Role::Student.as_str() => Ok(user),
        _ => Err(AppError::NotFound(format!(
            "Student with ID {} not found.",
            student_id
        ))),
    }
}
