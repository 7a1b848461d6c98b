//! # Task Graph
//!
//! In-memory dependency graph for one campaign. Holds the task records,
//! answers readiness queries for the scheduler, applies status transitions
//! through the task transition table, and propagates abandonment to the
//! dependents of failed tasks.
//!
//! The graph is mutated only by the campaign coordinator (single writer per
//! campaign); the router and adapters only ever see cloned task records.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::models::{Task, TaskKind};
use crate::state_machine::events::TaskEvent;
use crate::state_machine::states::TaskStatus;
use crate::state_machine::task::task_target_status;

/// Terminal and outstanding task counts for campaign resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub outstanding: usize,
}

/// Dependency graph of one campaign's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: HashMap<Uuid, Task>,
    /// Insertion order; the planner inserts in layer order.
    order: Vec<Uuid>,
    dependents: HashMap<Uuid, Vec<Uuid>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, indexing it under each of its dependencies.
    pub fn insert(&mut self, task: Task) {
        for dep in &task.depends_on {
            self.dependents.entry(*dep).or_default().push(task.task_id);
        }
        self.order.push(task.task_id);
        self.tasks.insert(task.task_id, task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, task_id: &Uuid) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// Task ids in planner layer order.
    pub fn task_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.order.iter()
    }

    /// Tasks in planner layer order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Direct dependents of a task.
    pub fn dependents_of(&self, task_id: &Uuid) -> &[Uuid] {
        self.dependents
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first dependency of `task_id` with the given kind, for wiring
    /// dependency outputs into dispatch inputs.
    pub fn dependency_of_kind(&self, task_id: &Uuid, kind: TaskKind) -> Option<Uuid> {
        let task = self.tasks.get(task_id)?;
        task.depends_on
            .iter()
            .find(|dep| self.tasks.get(dep).map(|t| t.kind) == Some(kind))
            .copied()
    }

    fn dependencies_satisfied(&self, task: &Task) -> bool {
        task.depends_on.iter().all(|dep| {
            self.tasks
                .get(dep)
                .map(|t| t.status.satisfies_dependencies())
                .unwrap_or(false)
        })
    }

    /// Tasks eligible for dispatch at `now`: pending or retrying, due per
    /// their clock constraints, with every dependency succeeded.
    pub fn ready_task_ids(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|task| {
                matches!(task.status, TaskStatus::Pending | TaskStatus::Retrying)
                    && task.is_due(now)
                    && self.dependencies_satisfied(task)
            })
            .map(|task| task.task_id)
            .collect()
    }

    /// Apply a task event through the transition table, updating attempt
    /// counts and failure reasons as a side effect.
    pub fn apply_event(&mut self, task_id: &Uuid, event: TaskEvent) -> OrchestrationResult<TaskStatus> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestrationError::Internal(format!("unknown task {task_id}")))?;

        let target = task_target_status(task.status, &event).map_err(|e| {
            OrchestrationError::StateTransitionFailed {
                entity_type: "task".to_string(),
                entity_id: *task_id,
                reason: e.to_string(),
            }
        })?;

        match &event {
            TaskEvent::Dispatch => {
                task.attempts += 1;
                task.next_attempt_at = None;
            }
            TaskEvent::Fail(reason) | TaskEvent::Abandon(reason) => {
                task.failure_reason = Some(reason.clone());
            }
            TaskEvent::Succeed | TaskEvent::ScheduleRetry => {}
        }

        task.status = target;
        task.updated_at = Utc::now();
        Ok(target)
    }

    /// Record the backoff deadline for a retrying task.
    pub fn schedule_retry_at(
        &mut self,
        task_id: &Uuid,
        next_attempt_at: DateTime<Utc>,
    ) -> OrchestrationResult<()> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestrationError::Internal(format!("unknown task {task_id}")))?;
        task.next_attempt_at = Some(next_attempt_at);
        Ok(())
    }

    /// Abandon every non-terminal task downstream of `task_id`
    /// (transitively). Returns the abandoned task ids.
    pub fn abandon_dependents_of(&mut self, task_id: &Uuid) -> OrchestrationResult<Vec<Uuid>> {
        let mut abandoned = Vec::new();
        let mut queue: VecDeque<Uuid> = self.dependents_of(task_id).to_vec().into();

        while let Some(dependent_id) = queue.pop_front() {
            let Some(task) = self.tasks.get(&dependent_id) else {
                continue;
            };
            if task.status.is_terminal() {
                continue;
            }
            let reason = format!("dependency task {task_id} did not succeed");
            self.apply_event(&dependent_id, TaskEvent::Abandon(reason))?;
            abandoned.push(dependent_id);
            queue.extend(self.dependents_of(&dependent_id).iter().copied());
        }

        Ok(abandoned)
    }

    /// Abandon every outstanding task, e.g. on campaign cancellation.
    /// In-flight adapter calls are left to finish; their outcomes are
    /// discarded by the coordinator.
    pub fn abandon_outstanding(&mut self, reason: &str) -> OrchestrationResult<Vec<Uuid>> {
        let outstanding: Vec<Uuid> = self
            .order
            .iter()
            .filter(|id| {
                self.tasks
                    .get(id)
                    .map(|t| t.status.is_outstanding())
                    .unwrap_or(false)
            })
            .copied()
            .collect();

        for task_id in &outstanding {
            self.apply_event(task_id, TaskEvent::Abandon(reason.to_string()))?;
        }
        Ok(outstanding)
    }

    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    pub fn any_in_flight(&self) -> bool {
        self.tasks.values().any(|t| t.status.is_in_flight())
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Succeeded => counts.succeeded += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Abandoned => counts.abandoned += 1,
                _ => counts.outstanding += 1,
            }
        }
        counts
    }

    /// Kahn's algorithm over the dependency edges; rejects cycles and
    /// references to tasks outside the graph. The planner emits strictly
    /// layered graphs by construction, so a violation here means planner
    /// breakage rather than bad user input.
    pub fn validate_acyclic(&self) -> OrchestrationResult<()> {
        let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
        for task in self.tasks.values() {
            in_degree.entry(task.task_id).or_insert(0);
            for dep in &task.depends_on {
                if !self.tasks.contains_key(dep) {
                    return Err(OrchestrationError::Internal(format!(
                        "task {} depends on unknown task {dep}",
                        task.task_id
                    )));
                }
                *in_degree.entry(task.task_id).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<Uuid> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;

        while let Some(id) = queue.pop_front() {
            visited += 1;
            for dependent in self.dependents_of(&id).to_vec() {
                let deg = in_degree
                    .get_mut(&dependent)
                    .ok_or_else(|| OrchestrationError::Internal("degree bookkeeping".into()))?;
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if visited != self.tasks.len() {
            return Err(OrchestrationError::Internal(
                "task graph contains a dependency cycle".to_string(),
            ));
        }
        Ok(())
    }
}

/// Convenience for building `not_before` deadlines.
pub fn delay_from_now(seconds: u64) -> DateTime<Utc> {
    Utc::now() + ChronoDuration::seconds(seconds as i64)
}
