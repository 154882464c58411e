use crate::errors::AppError;
use crate::gate::{self, Actor};
use crate::model::course::{Course, Module, Topic, TopicContent};
use crate::model::student::{Enrollment, ProgressRecord};
use crate::schema::{
    courses::dsl as courses_dsl, enrollments::dsl as enr_dsl, modules::dsl as modules_dsl,
    progress_records::dsl as prog_dsl, topic_contents::dsl as tc_dsl, topics::dsl as topics_dsl,
};
use crate::structure::{self, CourseTree};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::log::{debug, error};

pub(crate) async fn run_query<T, F>(
    pool: &deadpool_diesel::postgres::Pool,
    query: F,
) -> Result<T, AppError>
where
    F: FnOnce(&mut diesel::PgConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await.map_err(|pool_err| {
        error!(
            "Failed to get DB connection object from pool: {:?}",
            pool_err
        );
        AppError::from(pool_err)
    })?;
    debug!("DB connection object obtained from pool for interaction");

    let res = conn.interact(query).await;

    match res {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(diesel_err)) => {
            error!("Diesel query failed within interaction: {:?}", diesel_err);
            Err(AppError::from(diesel_err))
        }
        Err(interact_err) => {
            error!("Deadpool interact error: {:?}", interact_err);
            Err(AppError::from(interact_err))
        }
    }
}

/// True when an error wraps a unique-constraint violation, so callers can
/// surface 409 instead of 500 for duplicate-key inserts.
pub(crate) fn is_unique_violation(err: &AppError) -> bool {
    if let AppError::InternalServerError(source) = err {
        if let Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) =
            source.downcast_ref::<DieselError>()
        {
            return true;
        }
    }
    false
}

// entity loaders (404 with an entity-specific message when absent)

pub(crate) async fn load_course(
    pool: &deadpool_diesel::postgres::Pool,
    course_id: i64,
) -> Result<Course, AppError> {
    run_query(pool, move |conn| {
        courses_dsl::courses
            .find(course_id)
            .select(Course::as_select())
            .first::<Course>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Course with ID {} not found.", course_id)))
}

pub(crate) async fn load_module(
    pool: &deadpool_diesel::postgres::Pool,
    module_id: i64,
) -> Result<Module, AppError> {
    run_query(pool, move |conn| {
        modules_dsl::modules
            .find(module_id)
            .select(Module::as_select())
            .first::<Module>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Module with ID {} not found.", module_id)))
}

pub(crate) async fn load_content(
    pool: &deadpool_diesel::postgres::Pool,
    content_id: i64,
) -> Result<TopicContent, AppError> {
    run_query(pool, move |conn| {
        tc_dsl::topic_contents
            .find(content_id)
            .select(TopicContent::as_select())
            .first::<TopicContent>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Content with ID {} not found.", content_id)))
}

/// Resolves the course a topic belongs to in one joined query.
pub(crate) async fn course_of_topic(
    pool: &deadpool_diesel::postgres::Pool,
    topic_id: i64,
) -> Result<Course, AppError> {
    run_query(pool, move |conn| {
        topics_dsl::topics
            .filter(topics_dsl::id.eq(topic_id))
            .inner_join(modules_dsl::modules.inner_join(courses_dsl::courses))
            .select(Course::as_select())
            .first::<Course>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Topic with ID {} not found.", topic_id)))
}

/// Resolves the course a content item belongs to in one joined query.
pub(crate) async fn course_of_content(
    pool: &deadpool_diesel::postgres::Pool,
    content_id: i64,
) -> Result<Course, AppError> {
    run_query(pool, move |conn| {
        tc_dsl::topic_contents
            .filter(tc_dsl::id.eq(content_id))
            .inner_join(
                topics_dsl::topics.inner_join(modules_dsl::modules.inner_join(courses_dsl::courses)),
            )
            .select(Course::as_select())
            .first::<Course>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Content with ID {} not found.", content_id)))
}

pub(crate) async fn find_enrollment(
    pool: &deadpool_diesel::postgres::Pool,
    student_id: i64,
    course_id: i64,
) -> Result<Option<Enrollment>, AppError> {
    run_query(pool, move |conn| {
        enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .filter(enr_dsl::course_id.eq(course_id))
            .select(Enrollment::as_select())
            .first::<Enrollment>(conn)
            .optional()
    })
    .await
}

pub(crate) async fn require_enrollment(
    pool: &deadpool_diesel::postgres::Pool,
    student_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    find_enrollment(pool, student_id, course_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not enrolled in this course".to_string()))
}

// gate wrappers: deny becomes the externally visible 403

pub(crate) fn require_role(actor: &Actor, role: crate::gate::Role) -> Result<(), AppError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role '{}' is not authorized to access this route",
            actor.role.as_str()
        )))
    }
}

pub(crate) fn require_instructor(actor: &Actor) -> Result<(), AppError> {
    if actor.role.is_instructor() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role '{}' is not authorized to access this route",
            actor.role.as_str()
        )))
    }
}

pub(crate) fn check_structure_permission(actor: &Actor, course: &Course) -> Result<(), AppError> {
    if gate::can_edit_structure(actor, course) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to manage course {}",
            course.id
        )))
    }
}

pub(crate) fn check_content_permission(actor: &Actor, course: &Course) -> Result<(), AppError> {
    if gate::can_manage_course_content(actor, course) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to manage content for course {}",
            course.id
        )))
    }
}

pub(crate) fn check_view_permission(
    actor: &Actor,
    course: &Course,
    enrolled: bool,
) -> Result<(), AppError> {
    if gate::can_view_course(actor, course, enrolled) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to view course {}",
            course.id
        )))
    }
}

// bounded structure loading: course -> modules -> topics -> contents is
// always exactly these queries, never one per node

pub(crate) async fn load_course_tree(
    pool: &deadpool_diesel::postgres::Pool,
    course: Course,
) -> Result<CourseTree, AppError> {
    let course_id = course.id;
    let modules = run_query(pool, move |conn| {
        modules_dsl::modules
            .filter(modules_dsl::course_id.eq(course_id))
            .select(Module::as_select())
            .load::<Module>(conn)
    })
    .await?;

    let module_ids: Vec<i64> = modules.iter().map(|m| m.id).collect();
    let topics = run_query(pool, move |conn| {
        topics_dsl::topics
            .filter(topics_dsl::module_id.eq_any(module_ids))
            .select(Topic::as_select())
            .load::<Topic>(conn)
    })
    .await?;

    let topic_ids: Vec<i64> = topics.iter().map(|t| t.id).collect();
    let contents = run_query(pool, move |conn| {
        tc_dsl::topic_contents
            .filter(tc_dsl::topic_id.eq_any(topic_ids))
            .select(TopicContent::as_select())
            .load::<TopicContent>(conn)
    })
    .await?;

    Ok(structure::assemble(course, modules, topics, contents))
}

pub(crate) async fn load_progress_for_contents(
    pool: &deadpool_diesel::postgres::Pool,
    student_id: i64,
    content_ids: Vec<i64>,
) -> Result<Vec<ProgressRecord>, AppError> {
    run_query(pool, move |conn| {
        prog_dsl::progress_records
            .filter(prog_dsl::student_id.eq(student_id))
            .filter(prog_dsl::content_id.eq_any(content_ids))
            .select(ProgressRecord::as_select())
            .load::<ProgressRecord>(conn)
    })
    .await
}
