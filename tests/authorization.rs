mod helpers;

use helpers::make_course;
use lms_server::gate::{
    Actor, Role, can_edit_structure, can_manage_course_content, can_view_course,
};

fn instructor(id: i64, assigned: Vec<i64>) -> Actor {
    Actor {
        id,
        role: Role::Instructor,
        assigned_courses: assigned,
    }
}

fn student(id: i64) -> Actor {
    Actor {
        id,
        role: Role::Student,
        assigned_courses: vec![],
    }
}

#[test]
fn unrelated_instructor_cannot_edit_modules() {
    // The instructor neither owns course 1 nor appears in its assigned
    // set: every structural edit is denied.
    let course = make_course(1, 10);
    let outsider = instructor(99, vec![2, 3]);

    assert!(!can_edit_structure(&outsider, &course));
    assert!(!can_manage_course_content(&outsider, &course));
    assert!(!can_view_course(&outsider, &course, false));
}

#[test]
fn owner_has_full_control() {
    let course = make_course(1, 10);
    let owner = instructor(10, vec![]);

    assert!(can_view_course(&owner, &course, false));
    assert!(can_manage_course_content(&owner, &course));
    assert!(can_edit_structure(&owner, &course));
}

#[test]
fn assignment_grants_collaboration_not_structure() {
    let course = make_course(1, 10);
    let assigned = instructor(20, vec![1]);

    assert!(can_view_course(&assigned, &course, false));
    assert!(can_manage_course_content(&assigned, &course));
    // Module/topic/content management stays with the owner.
    assert!(!can_edit_structure(&assigned, &course));
}

#[test]
fn super_instructor_assignment_follows_the_same_rules() {
    let course = make_course(1, 10);
    let assigned = Actor {
        id: 21,
        role: Role::SuperInstructor,
        assigned_courses: vec![1],
    };

    assert!(can_manage_course_content(&assigned, &course));
    assert!(!can_edit_structure(&assigned, &course));
}

#[test]
fn student_access_hinges_on_enrollment() {
    let course = make_course(1, 10);
    let s = student(50);

    // Enrolled and visible: read-only access.
    assert!(can_view_course(&s, &course, true));
    // Not enrolled: denied even though the course is visible.
    assert!(!can_view_course(&s, &course, false));
    // Students never mutate course material.
    assert!(!can_manage_course_content(&s, &course));
    assert!(!can_edit_structure(&s, &course));
}

#[test]
fn hidden_course_blocks_enrolled_students_but_not_staff() {
    let mut course = make_course(1, 10);
    course.is_visible = false;

    assert!(!can_view_course(&student(50), &course, true));
    assert!(can_view_course(&instructor(10, vec![]), &course, false));

    let admin = Actor {
        id: 1,
        role: Role::Admin,
        assigned_courses: vec![],
    };
    assert!(can_view_course(&admin, &course, false));
    assert!(can_edit_structure(&admin, &course));
}

#[test]
fn ownership_requires_an_instructor_role() {
    // A student id that happens to match the course's instructor field
    // must not be treated as an owner.
    let course = make_course(1, 50);
    let s = student(50);
    assert!(!can_edit_structure(&s, &course));
    assert!(!can_manage_course_content(&s, &course));
}
