//! Role and ownership decisions for every course-scoped operation.
//!
//! The gate is a pure function of the acting user and the target course;
//! callers supply enrollment state where it matters and translate a deny
//! into the HTTP error they want. Nothing in here touches the database.

use crate::model::course::Course;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperInstructor,
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperInstructor => "super_instructor",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "super_instructor" => Some(Role::SuperInstructor),
            "instructor" => Some(Role::Instructor),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Instructor-family roles: the ones that can own or be assigned courses.
    pub fn is_instructor(&self) -> bool {
        matches!(self, Role::Instructor | Role::SuperInstructor)
    }
}

/// The authenticated caller, threaded explicitly through every core call.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    /// Course IDs this user is assigned to collaborate on. Only populated
    /// for instructor-family roles; empty otherwise.
    pub assigned_courses: Vec<i64>,
}

impl Actor {
    pub fn is_owner_of(&self, course: &Course) -> bool {
        self.role.is_instructor() && course.instructor_id == self.id
    }

    pub fn is_assigned_to(&self, course: &Course) -> bool {
        self.role.is_instructor() && self.assigned_courses.contains(&course.id)
    }
}

/// Read access to a course and its structure.
///
/// Students need an enrollment row and a visible course; owners, assigned
/// instructors and admins always pass.
pub fn can_view_course(actor: &Actor, course: &Course, enrolled: bool) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::SuperInstructor | Role::Instructor => {
            actor.is_owner_of(course) || actor.is_assigned_to(course)
        }
        Role::Student => enrolled && course.is_visible,
    }
}

/// Collaborative write access: assignments and the shared-content workflow.
///
/// "Assigned" is a narrower grant than "owned": it opens this surface but
/// not [`can_edit_structure`].
pub fn can_manage_course_content(actor: &Actor, course: &Course) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::SuperInstructor | Role::Instructor => {
            actor.is_owner_of(course) || actor.is_assigned_to(course)
        }
        Role::Student => false,
    }
}

/// Structural write access: course edit/delete/visibility and all
/// module/topic/content management underneath it. Owner-only (plus admin).
pub fn can_edit_structure(actor: &Actor, course: &Course) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::SuperInstructor | Role::Instructor => actor.is_owner_of(course),
        Role::Student => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn course(id: i64, instructor_id: i64, is_visible: bool) -> Course {
        Course {
            id,
            title: "Course".to_string(),
            description: String::new(),
            instructor_id,
            is_visible,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn actor(id: i64, role: Role, assigned: Vec<i64>) -> Actor {
        Actor {
            id,
            role,
            assigned_courses: assigned,
        }
    }

    #[test]
    fn admin_passes_everything() {
        let c = course(1, 99, false);
        let a = actor(5, Role::Admin, vec![]);
        assert!(can_view_course(&a, &c, false));
        assert!(can_manage_course_content(&a, &c));
        assert!(can_edit_structure(&a, &c));
    }

    #[test]
    fn owner_passes_everything() {
        let c = course(1, 7, true);
        let a = actor(7, Role::Instructor, vec![]);
        assert!(can_view_course(&a, &c, false));
        assert!(can_manage_course_content(&a, &c));
        assert!(can_edit_structure(&a, &c));
    }

    #[test]
    fn assigned_instructor_collaborates_but_cannot_edit_structure() {
        let c = course(3, 7, true);
        let a = actor(8, Role::SuperInstructor, vec![3]);
        assert!(can_view_course(&a, &c, false));
        assert!(can_manage_course_content(&a, &c));
        assert!(!can_edit_structure(&a, &c));
    }

    #[test]
    fn unrelated_instructor_is_denied() {
        let c = course(3, 7, true);
        let a = actor(8, Role::Instructor, vec![4]);
        assert!(!can_view_course(&a, &c, false));
        assert!(!can_manage_course_content(&a, &c));
        assert!(!can_edit_structure(&a, &c));
    }

    #[test]
    fn student_view_requires_enrollment_and_visibility() {
        let c = course(3, 7, true);
        let s = actor(20, Role::Student, vec![]);
        assert!(can_view_course(&s, &c, true));
        assert!(!can_view_course(&s, &c, false));

        let hidden = course(4, 7, false);
        assert!(!can_view_course(&s, &hidden, true));
    }

    #[test]
    fn student_never_mutates_course_material() {
        let c = course(3, 7, true);
        let s = actor(20, Role::Student, vec![3]);
        assert!(!can_manage_course_content(&s, &c));
        assert!(!can_edit_structure(&s, &c));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            Role::Admin,
            Role::SuperInstructor,
            Role::Instructor,
            Role::Student,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("moderator"), None);
    }
}
