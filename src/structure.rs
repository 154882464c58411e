//! Course structure assembly and per-student progress rollups.
//!
//! Everything here is pure: rows go in, an ordered tree (optionally joined
//! against progress records) comes out. Loading the rows stays with the
//! callers so the whole aggregation remains a bounded, fixed number of
//! queries per request regardless of course depth.

use crate::model::course::{Course, Module, Topic, TopicContent};
use crate::model::student::{Enrollment, ProgressRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CourseTree {
    pub course: Course,
    pub modules: Vec<ModuleNode>,
}

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub module: Module,
    pub topics: Vec<TopicNode>,
}

#[derive(Debug, Clone)]
pub struct TopicNode {
    pub topic: Topic,
    pub contents: Vec<TopicContent>,
}

impl CourseTree {
    pub fn content_ids(&self) -> Vec<i64> {
        self.modules
            .iter()
            .flat_map(|m| m.topics.iter())
            .flat_map(|t| t.contents.iter())
            .map(|c| c.id)
            .collect()
    }

    pub fn content_count(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| m.topics.iter())
            .map(|t| t.contents.len())
            .sum()
    }
}

/// Builds the Course→Module→Topic→Content tree from independently loaded
/// row sets.
///
/// Sibling ordering is `(order, created_at, id)` at every level, so the
/// output is stable across calls against unchanged data. Rows whose parent
/// is not among the loaded parents (a module deleted between the module and
/// topic reads, for instance) are dropped rather than failing the whole
/// assembly.
pub fn assemble(
    course: Course,
    mut modules: Vec<Module>,
    mut topics: Vec<Topic>,
    mut contents: Vec<TopicContent>,
) -> CourseTree {
    modules.sort_by_key(|m| (m.order, m.created_at, m.id));
    topics.sort_by_key(|t| (t.order, t.created_at, t.id));
    contents.sort_by_key(|c| (c.order, c.created_at, c.id));

    let mut contents_by_topic: HashMap<i64, Vec<TopicContent>> = HashMap::new();
    for content in contents {
        contents_by_topic
            .entry(content.topic_id)
            .or_default()
            .push(content);
    }

    let mut topics_by_module: HashMap<i64, Vec<TopicNode>> = HashMap::new();
    for topic in topics {
        let node = TopicNode {
            contents: contents_by_topic.remove(&topic.id).unwrap_or_default(),
            topic,
        };
        topics_by_module
            .entry(node.topic.module_id)
            .or_default()
            .push(node);
    }

    let module_nodes = modules
        .into_iter()
        .map(|module| ModuleNode {
            topics: topics_by_module.remove(&module.id).unwrap_or_default(),
            module,
        })
        .collect();

    CourseTree {
        course,
        modules: module_nodes,
    }
}

/// The raw watch state surfaced on a leaf content node.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WatchState {
    pub video_position: f64,
    pub is_completed: bool,
    pub last_accessed_at: DateTime<Utc>,
}

impl From<&ProgressRecord> for WatchState {
    fn from(record: &ProgressRecord) -> Self {
        WatchState {
            video_position: record.video_position,
            is_completed: record.is_completed,
            last_accessed_at: record.last_accessed_at,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ContentWithProgress {
    #[serde(flatten)]
    pub content: TopicContent,
    pub progress: Option<WatchState>,
}

#[derive(Serialize, Debug, Clone)]
pub struct TopicRollup {
    #[serde(flatten)]
    pub topic: Topic,
    pub content: Vec<ContentWithProgress>,
    pub progress: i32,
    pub completed_count: usize,
    pub total_count: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct ModuleRollup {
    #[serde(flatten)]
    pub module: Module,
    pub topics: Vec<TopicRollup>,
    pub progress: i32,
    pub completed_count: usize,
    pub total_count: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseRollup {
    #[serde(flatten)]
    pub course: Course,
    pub progress: i32,
    pub completed_count: usize,
    pub total_count: usize,
}

/// The cached enrollment-level numbers returned alongside the fresh
/// computation. The two may legitimately diverge until the next
/// write-triggered recompute.
#[derive(Serialize, Debug, Clone)]
pub struct EnrollmentSnapshot {
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Enrollment> for EnrollmentSnapshot {
    fn from(enrollment: &Enrollment) -> Self {
        EnrollmentSnapshot {
            progress: enrollment.progress,
            enrolled_at: enrollment.enrolled_at,
            completed_at: enrollment.completed_at,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseProgressReport {
    pub course: CourseRollup,
    pub modules: Vec<ModuleRollup>,
    pub enrollment: EnrollmentSnapshot,
}

/// Completion percentage with the uniform rounding rule: round-half-up to
/// the nearest integer, and 0 whenever the denominator is 0.
pub fn completion_percent(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i32
}

/// Merges a student's progress records into an assembled tree and computes
/// the bottom-up rollups. Content nodes carry the raw watch state; every
/// level above carries `{completed_count, total_count, progress}` derived
/// from leaf completion flags with [`completion_percent`].
pub fn join_progress(
    tree: CourseTree,
    progress_rows: &[ProgressRecord],
    enrollment: &Enrollment,
) -> CourseProgressReport {
    let by_content: HashMap<i64, &ProgressRecord> =
        progress_rows.iter().map(|p| (p.content_id, p)).collect();

    let mut course_completed = 0usize;
    let mut course_total = 0usize;

    let modules = tree
        .modules
        .into_iter()
        .map(|module_node| {
            let mut module_completed = 0usize;
            let mut module_total = 0usize;

            let topics = module_node
                .topics
                .into_iter()
                .map(|topic_node| {
                    let content: Vec<ContentWithProgress> = topic_node
                        .contents
                        .into_iter()
                        .map(|c| {
                            let progress = by_content.get(&c.id).map(|p| WatchState::from(*p));
                            ContentWithProgress { content: c, progress }
                        })
                        .collect();

                    let completed = content
                        .iter()
                        .filter(|c| c.progress.as_ref().is_some_and(|p| p.is_completed))
                        .count();
                    let total = content.len();
                    module_completed += completed;
                    module_total += total;

                    TopicRollup {
                        topic: topic_node.topic,
                        progress: completion_percent(completed, total),
                        completed_count: completed,
                        total_count: total,
                        content,
                    }
                })
                .collect();

            course_completed += module_completed;
            course_total += module_total;

            ModuleRollup {
                module: module_node.module,
                topics,
                progress: completion_percent(module_completed, module_total),
                completed_count: module_completed,
                total_count: module_total,
            }
        })
        .collect();

    CourseProgressReport {
        course: CourseRollup {
            course: tree.course,
            progress: completion_percent(course_completed, course_total),
            completed_count: course_completed,
            total_count: course_total,
        },
        modules,
        enrollment: EnrollmentSnapshot::from(enrollment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn course(id: i64) -> Course {
        Course {
            id,
            title: format!("Course {id}"),
            description: String::new(),
            instructor_id: 1,
            is_visible: true,
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn module(id: i64, course_id: i64, order: i32, created: i64) -> Module {
        Module {
            id,
            course_id,
            title: format!("Module {id}"),
            order,
            created_at: ts(created),
            updated_at: ts(created),
        }
    }

    fn topic(id: i64, module_id: i64, order: i32, created: i64) -> Topic {
        Topic {
            id,
            module_id,
            title: format!("Topic {id}"),
            order,
            created_at: ts(created),
            updated_at: ts(created),
        }
    }

    fn content(id: i64, topic_id: i64, order: i32, created: i64) -> TopicContent {
        TopicContent {
            id,
            topic_id,
            title: format!("Content {id}"),
            content_type: "video".to_string(),
            content_data: "stream-ref".to_string(),
            duration: 300,
            order,
            created_at: ts(created),
            updated_at: ts(created),
        }
    }

    #[test]
    fn siblings_sort_by_order_then_creation_then_id() {
        let tree = assemble(
            course(1),
            vec![
                module(10, 1, 1, 5),
                module(11, 1, 0, 9),
                module(12, 1, 1, 2),
            ],
            vec![],
            vec![],
        );
        let ids: Vec<i64> = tree.modules.iter().map(|m| m.module.id).collect();
        assert_eq!(ids, vec![11, 12, 10]);

        // Equal order and creation time falls back to id.
        let tree = assemble(
            course(1),
            vec![module(21, 1, 0, 3), module(20, 1, 0, 3)],
            vec![],
            vec![],
        );
        let ids: Vec<i64> = tree.modules.iter().map(|m| m.module.id).collect();
        assert_eq!(ids, vec![20, 21]);
    }

    #[test]
    fn assembly_is_deterministic_across_input_permutations() {
        let modules = vec![module(1, 1, 0, 0), module(2, 1, 1, 1)];
        let topics = vec![topic(10, 1, 0, 0), topic(11, 1, 1, 1), topic(12, 2, 0, 2)];
        let contents = vec![
            content(100, 10, 1, 0),
            content(101, 10, 0, 1),
            content(102, 12, 0, 2),
        ];

        let first = assemble(
            course(1),
            modules.clone(),
            topics.clone(),
            contents.clone(),
        );

        let mut shuffled_contents = contents.clone();
        shuffled_contents.reverse();
        let mut shuffled_topics = topics.clone();
        shuffled_topics.reverse();
        let second = assemble(course(1), modules, shuffled_topics, shuffled_contents);

        assert_eq!(first.content_ids(), second.content_ids());
        assert_eq!(first.content_ids(), vec![101, 100, 102]);
    }

    #[test]
    fn orphaned_rows_are_dropped_not_fatal() {
        // Topic 99 references a module that vanished mid-assembly; its
        // content goes with it.
        let tree = assemble(
            course(1),
            vec![module(1, 1, 0, 0)],
            vec![topic(10, 1, 0, 0), topic(99, 777, 0, 0)],
            vec![content(100, 10, 0, 0), content(200, 99, 0, 0)],
        );
        assert_eq!(tree.content_ids(), vec![100]);
        assert_eq!(tree.modules.len(), 1);
        assert_eq!(tree.modules[0].topics.len(), 1);
    }

    #[test]
    fn percent_has_no_divide_by_zero() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(0, 3), 0);
        assert_eq!(completion_percent(3, 3), 100);
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        // Round-half-up.
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(1, 2), 50);
    }

    fn enrollment(student_id: i64, course_id: i64) -> Enrollment {
        Enrollment {
            id: 1,
            student_id,
            course_id,
            progress: 0,
            enrolled_at: ts(0),
            completed_at: None,
        }
    }

    fn progress_row(content_id: i64, topic_id: i64, module_id: i64, completed: bool) -> ProgressRecord {
        ProgressRecord {
            id: content_id * 10,
            student_id: 50,
            content_id,
            topic_id,
            module_id,
            course_id: 1,
            video_position: if completed { 100.0 } else { 40.0 },
            is_completed: completed,
            last_accessed_at: ts(100),
            updated_at: ts(100),
        }
    }

    #[test]
    fn empty_course_rolls_up_to_zero() {
        let tree = assemble(course(1), vec![module(1, 1, 0, 0)], vec![topic(10, 1, 0, 0)], vec![]);
        let report = join_progress(tree, &[], &enrollment(50, 1));
        assert_eq!(report.course.progress, 0);
        assert_eq!(report.course.total_count, 0);
        assert_eq!(report.modules[0].progress, 0);
        assert_eq!(report.modules[0].topics[0].progress, 0);
    }

    #[test]
    fn all_completed_is_exactly_100_and_none_is_0() {
        let tree = assemble(
            course(1),
            vec![module(1, 1, 0, 0)],
            vec![topic(10, 1, 0, 0), topic(11, 1, 1, 1)],
            vec![content(100, 10, 0, 0), content(101, 10, 1, 1), content(102, 11, 0, 2)],
        );

        let none = join_progress(tree.clone(), &[], &enrollment(50, 1));
        assert_eq!(none.modules[0].progress, 0);

        let rows = vec![
            progress_row(100, 10, 1, true),
            progress_row(101, 10, 1, true),
            progress_row(102, 11, 1, true),
        ];
        let all = join_progress(tree, &rows, &enrollment(50, 1));
        assert_eq!(all.modules[0].progress, 100);
        assert_eq!(all.course.progress, 100);
        assert_eq!(all.course.completed_count, 3);
    }

    #[test]
    fn leaf_surfaces_raw_watch_state_not_a_percent() {
        let tree = assemble(
            course(1),
            vec![module(1, 1, 0, 0)],
            vec![topic(10, 1, 0, 0)],
            vec![content(100, 10, 0, 0), content(101, 10, 1, 1)],
        );
        let rows = vec![progress_row(100, 10, 1, false)];
        let report = join_progress(tree, &rows, &enrollment(50, 1));

        let contents = &report.modules[0].topics[0].content;
        let watched = contents[0].progress.as_ref().unwrap();
        assert!(float_cmp::approx_eq!(f64, watched.video_position, 40.0));
        assert!(!watched.is_completed);
        assert!(contents[1].progress.is_none());

        // Partial watching does not count toward rollups.
        assert_eq!(report.modules[0].topics[0].progress, 0);
    }

    #[test]
    fn rollups_are_mutually_consistent() {
        // One module, one topic, two contents, one completed: every level
        // that covers the same content set reports the same percent.
        let tree = assemble(
            course(1),
            vec![module(1, 1, 0, 0)],
            vec![topic(10, 1, 0, 0)],
            vec![content(100, 10, 0, 0), content(101, 10, 1, 1)],
        );
        let rows = vec![progress_row(100, 10, 1, true)];
        let report = join_progress(tree, &rows, &enrollment(50, 1));

        assert_eq!(report.modules[0].topics[0].progress, 50);
        assert_eq!(report.modules[0].progress, 50);
        assert_eq!(report.course.progress, 50);
    }

    #[test]
    fn progress_for_unknown_content_is_ignored() {
        let tree = assemble(
            course(1),
            vec![module(1, 1, 0, 0)],
            vec![topic(10, 1, 0, 0)],
            vec![content(100, 10, 0, 0)],
        );
        // A record for content that is no longer part of the tree.
        let rows = vec![progress_row(100, 10, 1, true), progress_row(999, 10, 1, true)];
        let report = join_progress(tree, &rows, &enrollment(50, 1));
        assert_eq!(report.course.completed_count, 1);
        assert_eq!(report.course.total_count, 1);
        assert_eq!(report.course.progress, 100);
    }
}
