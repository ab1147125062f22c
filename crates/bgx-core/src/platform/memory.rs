//! In-process platform that records every OS call.
//!
//! Also lets the caller play the OS side by hand: fire pending expiration
//! handlers, refuse grants, script the permission answer and deliver
//! interaction events to whatever delegate is installed.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ExecutionHost, ExpirationHandler, NotificationCenter, NotificationRequest, PermissionPrompt,
    TaskId,
};
use crate::error::BgxError;
use crate::notification::{Disposition, NotificationEvent, NotificationHandler};
use crate::permission::PermissionOutcome;

#[derive(Default)]
struct MemoryState {
    next_task: u64,
    /// Outstanding tasks; the handler is taken once it has fired.
    tasks: BTreeMap<TaskId, Option<ExpirationHandler>>,
    refuse_grants: bool,
    grants_begun: u64,
    grants_ended: u64,
    unknown_ends: u64,

    posts: Vec<NotificationRequest>,
    visible: BTreeMap<String, NotificationRequest>,
    removals: u64,
    delegate: Option<Arc<dyn NotificationHandler>>,
    delegate_installs: u64,

    status: PermissionOutcome,
    answer: Option<PermissionOutcome>,
    prompts: u64,
}

/// Records grants, posts, delegate installs and prompts.
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// When set, every `begin_background_task` fails with `GrantUnavailable`.
    pub fn set_refuse_grants(&self, refuse: bool) {
        self.lock().refuse_grants = refuse;
    }

    /// Answer returned by the next (and only) prompt. Defaults to `Granted`.
    pub fn set_permission_answer(&self, answer: PermissionOutcome) {
        self.lock().answer = Some(answer);
    }

    /// Answer already on record before any prompt (e.g. from a previous launch).
    pub fn set_authorization_status(&self, status: PermissionOutcome) {
        self.lock().status = status;
    }

    /// Number of tasks begun and not yet ended.
    pub fn outstanding_grants(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn grants_begun(&self) -> u64 {
        self.lock().grants_begun
    }

    pub fn grants_ended(&self) -> u64 {
        self.lock().grants_ended
    }

    /// `end_background_task` calls for tasks that were not outstanding.
    pub fn unknown_ends(&self) -> u64 {
        self.lock().unknown_ends
    }

    /// Fire every pending expiration handler, as the OS does when the budget
    /// runs out. Returns how many fired.
    pub fn fire_expiration(&self) -> usize {
        let handlers: Vec<ExpirationHandler> = self
            .lock()
            .tasks
            .values_mut()
            .filter_map(Option::take)
            .collect();
        let fired = handlers.len();
        for handler in handlers {
            handler();
        }
        fired
    }

    /// Every request posted so far, in order.
    pub fn posts(&self) -> Vec<NotificationRequest> {
        self.lock().posts.clone()
    }

    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    /// What the notification surface currently shows under `identifier`.
    pub fn visible(&self, identifier: &str) -> Option<NotificationRequest> {
        self.lock().visible.get(identifier).cloned()
    }

    pub fn removals(&self) -> u64 {
        self.lock().removals
    }

    pub fn delegate_installs(&self) -> u64 {
        self.lock().delegate_installs
    }

    pub fn prompt_count(&self) -> u64 {
        self.lock().prompts
    }

    /// Hand an interaction event to the installed delegate, as the OS would.
    /// With no delegate the OS default applies (`PassThrough`).
    pub fn deliver(&self, event: &NotificationEvent) -> Disposition {
        let delegate = self.lock().delegate.clone();
        match delegate {
            Some(delegate) => delegate.handle(event),
            None => Disposition::PassThrough,
        }
    }
}

impl ExecutionHost for MemoryPlatform {
    fn begin_background_task(&self, on_expire: ExpirationHandler) -> Result<TaskId, BgxError> {
        let mut state = self.lock();
        if state.refuse_grants {
            return Err(BgxError::GrantUnavailable(
                "background time budget exhausted".to_string(),
            ));
        }
        state.next_task += 1;
        let task = TaskId(state.next_task);
        state.tasks.insert(task, Some(on_expire));
        state.grants_begun += 1;
        tracing::trace!(?task, "memory platform: background task begun");
        Ok(task)
    }

    fn end_background_task(&self, task: TaskId) {
        let mut state = self.lock();
        if state.tasks.remove(&task).is_some() {
            state.grants_ended += 1;
            tracing::trace!(?task, "memory platform: background task ended");
        } else {
            state.unknown_ends += 1;
            tracing::warn!(?task, "memory platform: end for unknown background task");
        }
    }
}

impl NotificationCenter for MemoryPlatform {
    fn post(&self, request: &NotificationRequest) -> Result<(), BgxError> {
        let mut state = self.lock();
        state.posts.push(request.clone());
        state
            .visible
            .insert(request.identifier.clone(), request.clone());
        Ok(())
    }

    fn remove(&self, identifier: &str) {
        let mut state = self.lock();
        state.visible.remove(identifier);
        state.removals += 1;
    }

    fn delegate(&self) -> Option<Arc<dyn NotificationHandler>> {
        self.lock().delegate.clone()
    }

    fn set_delegate(&self, delegate: Arc<dyn NotificationHandler>) {
        let mut state = self.lock();
        state.delegate = Some(delegate);
        state.delegate_installs += 1;
    }
}

impl PermissionPrompt for MemoryPlatform {
    fn authorization_status(&self) -> PermissionOutcome {
        self.lock().status
    }

    fn prompt(&self) -> PermissionOutcome {
        let mut state = self.lock();
        state.prompts += 1;
        let answer = state.answer.unwrap_or(PermissionOutcome::Granted);
        state.status = answer;
        answer
    }
}
