use crate::cli::Args;
use crate::session::JwtConfig;
use anyhow::Context;
use axum::Router;
use axum::routing::{get, patch, post, put};
use deadpool_diesel::Runtime;
use deadpool_diesel::postgres::{Manager, Pool};
use tracing::log::info;

pub mod cli;
pub mod errors;
pub mod gate;
pub mod model;
pub mod payloads;
pub mod response;
pub mod schema;
pub mod session;
pub mod structure;

mod api;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub jwt: JwtConfig,
}

pub fn init_router(args: &Args) -> anyhow::Result<Router> {
    info!("Initializing database pool...");
    let pool = init_pool(&args.connection_str, args.db_pool_max_size)
        .context("Failed to initialize database pool")?;

    let jwt = JwtConfig {
        secret: args.jwt_secret.clone(),
        expiry_hours: args.jwt_expiry_hours,
    };

    info!("Initializing router...");
    Ok(init_router_internal(AppState { pool, jwt }))
}

pub fn init_test_router(pool: Pool, jwt: JwtConfig) -> Router {
    init_router_internal(AppState { pool, jwt })
}

fn init_router_internal(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/student", student_routes())
        .nest("/instructor", instructor_routes())
        .nest("/admin", admin_routes())
        .with_state(state)
}

fn init_pool(conn_str: &str, max_size: u32) -> anyhow::Result<Pool> {
    let manager = Manager::new(conn_str, Runtime::Tokio1);
    let pool = Pool::builder(manager).max_size(max_size as usize).build()?;
    Ok(pool)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        // public routes
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        // protected routes (credential checked in the handler extractor)
        .route("/logout", post(api::auth::logout))
        .route("/me", get(api::auth::me))
}

fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(api::student::get_my_courses))
        .route(
            "/courses/{course_id}/structure",
            get(api::student::get_course_structure),
        )
        .route(
            "/courses/{course_id}/progress",
            get(api::student::get_course_progress),
        )
        .route(
            "/courses/{course_id}/assignments",
            get(api::student::get_assignments),
        )
        .route("/content/{content_id}", get(api::student::get_content))
        .route(
            "/content/{content_id}/progress",
            get(api::student::get_content_progress),
        )
        .route("/content/progress", post(api::student::save_video_progress))
        .route(
            "/assignments/{assignment_id}/submit",
            post(api::student::submit_assignment),
        )
        .route("/submissions", get(api::student::get_my_submissions))
}

fn instructor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses",
            get(api::instructor::get_courses).post(api::instructor::create_course),
        )
        .route(
            "/courses/{course_id}",
            get(api::instructor::get_course)
                .put(api::instructor::update_course)
                .delete(api::instructor::delete_course),
        )
        .route(
            "/courses/{course_id}/visibility",
            patch(api::instructor::toggle_course_visibility),
        )
        .route(
            "/courses/{course_id}/modules",
            get(api::instructor::get_modules).post(api::instructor::create_module),
        )
        .route(
            "/modules/{module_id}",
            get(api::instructor::get_module)
                .put(api::instructor::update_module)
                .delete(api::instructor::delete_module),
        )
        .route(
            "/modules/{module_id}/topics",
            get(api::instructor::get_topics).post(api::instructor::create_topic),
        )
        .route(
            "/topics/{topic_id}",
            put(api::instructor::update_topic).delete(api::instructor::delete_topic),
        )
        .route(
            "/topics/{topic_id}/content",
            get(api::instructor::get_contents).post(api::instructor::create_content),
        )
        .route(
            "/content/{content_id}",
            put(api::instructor::update_content).delete(api::instructor::delete_content),
        )
        .route(
            "/courses/{course_id}/assignments",
            get(api::instructor::get_course_assignments).post(api::instructor::create_assignment),
        )
        .route(
            "/assignments/{assignment_id}",
            put(api::instructor::update_assignment).delete(api::instructor::delete_assignment),
        )
        .route(
            "/assignments/{assignment_id}/submissions",
            get(api::instructor::get_submissions),
        )
        .route(
            "/submissions/{submission_id}/review",
            patch(api::instructor::review_submission),
        )
        .route(
            "/students/{student_id}/performance",
            put(api::instructor::update_performance),
        )
        .route(
            "/teaching-points/today",
            get(api::instructor::get_today_teaching_points)
                .put(api::instructor::update_today_teaching_points),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(api::admin::get_students))
        .route(
            "/students/{student_id}/toggle-status",
            patch(api::admin::toggle_student_status),
        )
        .route(
            "/students/{student_id}/enroll",
            post(api::admin::enroll_student),
        )
        .route(
            "/students/{student_id}/enrollments",
            get(api::admin::get_student_enrollments),
        )
        .route("/faculty", get(api::admin::get_faculty))
        .route(
            "/faculty/{user_id}/assign-courses",
            post(api::admin::assign_courses),
        )
        .route("/courses", get(api::admin::get_all_courses))
}
