mod helpers;

use helpers::{
    make_content, make_course, make_enrollment, make_module, make_progress, make_topic,
};
use lms_server::structure::{assemble, completion_percent, join_progress};

// A course with one module (order 0) holding one topic (order 0) with a
// video and a text item; the enrolled student has no progress yet.
fn scenario_fixture() -> (
    lms_server::structure::CourseTree,
    lms_server::model::student::Enrollment,
) {
    let course = make_course(1, 10);
    let m1 = make_module(100, 1, 0, 0);
    let t1 = make_topic(200, 100, 0, 0);
    let v1 = make_content(300, 200, "video", 0, 0);
    let v2 = make_content(301, 200, "text", 1, 1);

    let tree = assemble(course, vec![m1], vec![t1], vec![v1, v2]);
    let enrollment = make_enrollment(50, 1);
    (tree, enrollment)
}

#[test]
fn untouched_course_reports_zero_everywhere() {
    let (tree, enrollment) = scenario_fixture();
    let report = join_progress(tree, &[], &enrollment);

    assert_eq!(report.course.progress, 0);
    assert_eq!(report.course.completed_count, 0);
    assert_eq!(report.course.total_count, 2);
    assert_eq!(report.modules[0].progress, 0);
    assert_eq!(report.modules[0].topics[0].progress, 0);
    assert_eq!(report.modules[0].topics[0].total_count, 2);
    assert!(report.modules[0].topics[0].content[0].progress.is_none());
}

#[test]
fn completing_one_of_two_items_reports_fifty_percent() {
    let (tree, enrollment) = scenario_fixture();
    let v1 = tree.modules[0].topics[0].contents[0].clone();
    let rows = vec![make_progress(50, &v1, 100, 1, 100.0, true)];

    let report = join_progress(tree, &rows, &enrollment);

    assert_eq!(report.modules[0].topics[0].progress, 50);
    assert_eq!(report.modules[0].progress, 50);
    assert_eq!(report.course.progress, 50);
    assert_eq!(report.course.completed_count, 1);

    // The cached enrollment numbers ride alongside untouched; they are
    // refreshed by the writer, not by the join.
    assert_eq!(report.enrollment.progress, 0);
    assert!(report.enrollment.completed_at.is_none());
}

#[test]
fn completing_everything_reports_exactly_one_hundred() {
    let (tree, enrollment) = scenario_fixture();
    let v1 = tree.modules[0].topics[0].contents[0].clone();
    let v2 = tree.modules[0].topics[0].contents[1].clone();
    let rows = vec![
        make_progress(50, &v1, 100, 1, 100.0, true),
        make_progress(50, &v2, 100, 1, 100.0, true),
    ];

    let report = join_progress(tree, &rows, &enrollment);

    assert_eq!(report.modules[0].topics[0].progress, 100);
    assert_eq!(report.modules[0].progress, 100);
    assert_eq!(report.course.progress, 100);
    assert_eq!(report.course.completed_count, 2);
    assert_eq!(report.course.total_count, 2);
}

#[test]
fn assembler_output_is_stable_across_repeated_calls() {
    let course = make_course(1, 10);
    let modules = vec![
        make_module(3, 1, 2, 0),
        make_module(1, 1, 0, 5),
        make_module(2, 1, 0, 5),
    ];
    let topics = vec![
        make_topic(30, 3, 0, 0),
        make_topic(10, 1, 1, 0),
        make_topic(11, 1, 0, 0),
    ];
    let contents = vec![
        make_content(100, 10, "video", 0, 0),
        make_content(101, 11, "text", 0, 0),
        make_content(102, 30, "ppt", 0, 0),
        make_content(103, 11, "video", 0, 1),
    ];

    let first = assemble(
        course.clone(),
        modules.clone(),
        topics.clone(),
        contents.clone(),
    );
    let second = assemble(course, modules, topics, contents);

    assert_eq!(first.content_ids(), second.content_ids());

    // Modules 1 and 2 share order 0 and creation time; id breaks the tie.
    let module_ids: Vec<i64> = first.modules.iter().map(|m| m.module.id).collect();
    assert_eq!(module_ids, vec![1, 2, 3]);

    // Within module 1, topic 11 (order 0) precedes topic 10 (order 1).
    let topic_ids: Vec<i64> = first.modules[0].topics.iter().map(|t| t.topic.id).collect();
    assert_eq!(topic_ids, vec![11, 10]);
}

#[test]
fn empty_levels_never_divide_by_zero() {
    // A module with a content-less topic and a course with an empty module.
    let course = make_course(1, 10);
    let tree = assemble(
        course,
        vec![make_module(1, 1, 0, 0), make_module(2, 1, 1, 0)],
        vec![make_topic(10, 1, 0, 0)],
        vec![],
    );
    let enrollment = make_enrollment(50, 1);
    let report = join_progress(tree, &[], &enrollment);

    assert_eq!(report.course.progress, 0);
    assert_eq!(report.modules[0].progress, 0);
    assert_eq!(report.modules[0].topics[0].progress, 0);
    assert_eq!(report.modules[1].progress, 0);
    assert_eq!(report.modules[1].total_count, 0);
}

#[test]
fn mixed_completion_rounds_half_up_consistently() {
    // Three items, one completed: every level shows 33; two completed: 67.
    let course = make_course(1, 10);
    let t1 = make_topic(10, 1, 0, 0);
    let contents = vec![
        make_content(100, 10, "video", 0, 0),
        make_content(101, 10, "video", 1, 0),
        make_content(102, 10, "video", 2, 0),
    ];
    let tree = assemble(course, vec![make_module(1, 1, 0, 0)], vec![t1], contents);
    let enrollment = make_enrollment(50, 1);

    let one = vec![make_progress(
        50,
        &tree.modules[0].topics[0].contents[0],
        1,
        1,
        100.0,
        true,
    )];
    let report = join_progress(tree.clone(), &one, &enrollment);
    assert_eq!(report.course.progress, 33);
    assert_eq!(report.modules[0].progress, 33);

    let two = vec![
        make_progress(50, &tree.modules[0].topics[0].contents[0], 1, 1, 100.0, true),
        make_progress(50, &tree.modules[0].topics[0].contents[1], 1, 1, 100.0, true),
    ];
    let report = join_progress(tree, &two, &enrollment);
    assert_eq!(report.course.progress, 67);
}

#[test]
fn percent_helper_matches_the_writer_rule() {
    assert_eq!(completion_percent(0, 0), 0);
    assert_eq!(completion_percent(1, 2), 50);
    assert_eq!(completion_percent(2, 2), 100);
    assert_eq!(completion_percent(1, 6), 17);
    assert_eq!(completion_percent(5, 6), 83);
}

#[test]
fn partially_watched_video_does_not_count_as_completed() {
    let (tree, enrollment) = scenario_fixture();
    let v1 = tree.modules[0].topics[0].contents[0].clone();
    let rows = vec![make_progress(50, &v1, 100, 1, 85.0, false)];

    let report = join_progress(tree, &rows, &enrollment);

    let leaf = &report.modules[0].topics[0].content[0];
    let watch = leaf.progress.as_ref().expect("watch state present");
    assert!(float_cmp::approx_eq!(f64, watch.video_position, 85.0));
    assert!(!watch.is_completed);
    assert_eq!(report.course.progress, 0);
}
