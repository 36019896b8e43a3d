//! Routing of events onto per-task timelines.
//!
//! [`TaskHandler`] owns every [`Task`] built during a run. Events are routed by
//! the task keys they carry:
//!
//! - scheduler and worker transitions name exactly one task;
//! - a worker transfer names one or more tasks, and each of them receives the
//!   whole transfer (fan-out, not split).
//!
//! Tasks are kept in first-seen order until [`TaskHandler::sort_tasks_by_time`]
//! reorders them for export.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;
use crate::tabular::TabularView;
use crate::task::Task;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A transfer that references no task cannot be attached anywhere.
    #[error("worker transfer references no task keys")]
    NoTaskKeys,

    /// A snapshot lists the same task twice.
    #[error("duplicate task {name:?} in snapshot")]
    DuplicateTask { name: String },
}

/// The map from task key to task timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Task>", into = "Vec<Task>")]
pub struct TaskHandler {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes an event to every task it references, creating tasks as needed.
    ///
    /// On error the handler is left untouched.
    pub fn add_event(&mut self, event: Event) -> Result<(), HandlerError> {
        match &event {
            Event::SchedulerTransition(transition) | Event::WorkerTransition(transition) => {
                let key = transition.key.clone();
                self.route(key, event);
            }
            Event::WorkerTransfer(transfer) => {
                let keys: Vec<String> = transfer.keys.names().map(str::to_string).collect();
                let Some((last, rest)) = keys.split_last() else {
                    return Err(HandlerError::NoTaskKeys);
                };
                for key in rest {
                    self.route(key.clone(), event.clone());
                }
                self.route(last.clone(), event);
            }
        }
        Ok(())
    }

    fn route(&mut self, key: String, event: Event) {
        if let Some(&idx) = self.index.get(&key) {
            self.tasks[idx].add_event(event);
        } else {
            tracing::trace!(task = %key, "creating task");
            self.index.insert(key.clone(), self.tasks.len());
            self.tasks.push(Task::with_event(key, event));
        }
    }

    /// Orders tasks by start bound, then by key.
    ///
    /// Tasks without a start bound go last, ordered by key among themselves.
    pub fn sort_tasks_by_time(&mut self) {
        self.tasks.sort_by(compare_by_start);
        self.rebuild_index();
    }

    /// Flat per-category tables of every event, in task order.
    pub fn to_tabular_view(&self) -> TabularView {
        TabularView::from_tasks(&self.tasks)
    }

    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&idx| &self.tasks[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Task keys in current order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(Task::name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Number of (task, event) attachments across all tasks.
    pub fn event_count(&self) -> usize {
        self.tasks.iter().map(Task::len).sum()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.name().to_string(), idx))
            .collect();
    }
}

fn compare_by_start(a: &Task, b: &Task) -> Ordering {
    match (a.t_start(), b.t_start()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name().cmp(b.name()))
}

impl TryFrom<Vec<Task>> for TaskHandler {
    type Error = HandlerError;

    fn try_from(tasks: Vec<Task>) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            if index.insert(task.name().to_string(), idx).is_some() {
                return Err(HandlerError::DuplicateTask {
                    name: task.name().to_string(),
                });
            }
        }
        Ok(Self { tasks, index })
    }
}

impl From<TaskHandler> for Vec<Task> {
    fn from(handler: TaskHandler) -> Self {
        handler.tasks
    }
}
