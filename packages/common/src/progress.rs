//! Learning-path progress: per-task availability and aggregate completion.
//!
//! This is a pure read-time projection over task and submission data. It
//! never mutates anything; callers re-run it after every status change so a
//! review is always observed before the next task's unlock check.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::status::SubmissionStatus;

/// Availability of a task for one user, in precedence order: a locked task
/// is never reported overdue, an overdue task is never reported pending, and
/// so on down the list. Overdue is never evaluated for a completed task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskAvailability {
    /// Predecessor task not yet approved.
    Locked,
    /// Deadline passed without an approved submission.
    Overdue,
    /// Submission waiting for review.
    Pending,
    /// Submission sent back for rework.
    RequiresChanges,
    /// Submission approved.
    Completed,
    /// Submission rejected with no resubmission path.
    Rejected,
    /// Open for submission.
    Available,
}

/// The slice of a task the evaluator needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskMeta {
    pub id: i32,
    /// 1-based, contiguous within a learning path.
    pub position: i32,
    /// Days from the internship start date; `None` means no deadline.
    pub deadline_offset_days: Option<i32>,
}

/// Evaluated state of one task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct TaskProgress {
    pub task_id: i32,
    pub position: i32,
    pub availability: TaskAvailability,
    pub deadline: Option<DateTime<Utc>>,
}

/// Aggregate completion over a learning path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressSummary {
    pub completed_tasks: u32,
    pub total_tasks: u32,
    /// `round(100 * completed / total)`; 0 when the path has no tasks.
    pub progress_percentage: u32,
}

/// Evaluate every task's availability for one user.
///
/// `submissions` maps task id to the user's submission status. Tasks are
/// evaluated in position order; the task at position 1 is always unlockable
/// and each later task unlocks only when its immediate predecessor holds an
/// approved submission.
pub fn evaluate(
    tasks: &[TaskMeta],
    submissions: &HashMap<i32, SubmissionStatus>,
    start_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<TaskProgress> {
    let mut ordered: Vec<&TaskMeta> = tasks.iter().collect();
    ordered.sort_by_key(|t| t.position);

    let mut states = Vec::with_capacity(ordered.len());
    let mut prev_approved = true; // no predecessor ahead of position 1

    for task in ordered {
        let submission = submissions.get(&task.id).copied();
        let deadline = task
            .deadline_offset_days
            .map(|days| start_date + Duration::days(days as i64));

        let locked = submission.is_none() && !prev_approved;
        let past_deadline = deadline.is_some_and(|d| now > d);
        let approved = submission.is_some_and(|s| s.is_approved());

        let availability = if locked {
            TaskAvailability::Locked
        } else if !approved && past_deadline {
            TaskAvailability::Overdue
        } else {
            match submission {
                Some(SubmissionStatus::Pending) => TaskAvailability::Pending,
                Some(SubmissionStatus::RequiresChanges) => TaskAvailability::RequiresChanges,
                Some(SubmissionStatus::Approved) => TaskAvailability::Completed,
                Some(SubmissionStatus::Rejected) => TaskAvailability::Rejected,
                None => TaskAvailability::Available,
            }
        };

        states.push(TaskProgress {
            task_id: task.id,
            position: task.position,
            availability,
            deadline,
        });
        prev_approved = approved;
    }

    states
}

/// Aggregate completion percentage. Recomputed from scratch on every call;
/// nothing here is cached.
pub fn summarize(
    tasks: &[TaskMeta],
    submissions: &HashMap<i32, SubmissionStatus>,
) -> ProgressSummary {
    let total = tasks.len() as u32;
    let completed = tasks
        .iter()
        .filter(|t| submissions.get(&t.id).is_some_and(|s| s.is_approved()))
        .count() as u32;

    let progress_percentage = if total == 0 {
        0
    } else {
        ((100.0 * completed as f64) / total as f64).round() as u32
    };

    ProgressSummary {
        completed_tasks: completed,
        total_tasks: total,
        progress_percentage,
    }
}
