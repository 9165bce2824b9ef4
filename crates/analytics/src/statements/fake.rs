use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::errors::Error;

use super::{StatementHandle, StatementRequest, StatementService, StatementState, StatementStatus};

/// Replays scripted statuses. Each submission takes the next script in order;
/// a script's last status repeats once the earlier ones are used up.
/// Submissions with no script left finish on the first poll.
#[derive(Default)]
pub struct FakeStatementService {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    scripts: VecDeque<Vec<StatementStatus>>,
    reject_submission: Option<usize>,
    attempts: usize,
    submitted: Vec<StatementRequest>,
    running: HashMap<String, VecDeque<StatementStatus>>,
    polls: HashMap<String, u32>,
}

impl FakeStatementService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, statuses: Vec<StatementStatus>) -> Self {
        self.inner.lock().unwrap().scripts.push_back(statuses);
        self
    }

    /// Rejects the n-th submission attempt (zero based) at the transport level.
    pub fn reject_submission(self, index: usize) -> Self {
        self.inner.lock().unwrap().reject_submission = Some(index);
        self
    }

    /// Every `execute_statement` call, rejected ones included
    pub fn submission_attempts(&self) -> usize {
        self.inner.lock().unwrap().attempts
    }

    /// Accepted submissions only
    pub fn submitted(&self) -> Vec<StatementRequest> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub fn submitted_sql(&self) -> Vec<String> {
        self.submitted().into_iter().map(|r| r.sql).collect()
    }

    pub fn polls(&self, handle: &StatementHandle) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .polls
            .get(handle.id())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_polls(&self) -> u32 {
        self.inner.lock().unwrap().polls.values().sum()
    }
}

#[async_trait]
impl StatementService for FakeStatementService {
    async fn execute_statement(
        &self,
        request: &StatementRequest,
    ) -> Result<StatementHandle, Error> {
        let mut inner = self.inner.lock().unwrap();
        let index = inner.attempts;
        inner.attempts += 1;
        if inner.reject_submission == Some(index) {
            return Err(Error::Submission {
                message: "connection reset".to_string(),
            });
        }

        let id = format!("stmt-{}", index);
        let script = inner
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec![StatementStatus::new(StatementState::Finished)]);
        inner.running.insert(id.clone(), script.into());
        inner.submitted.push(request.clone());

        Ok(StatementHandle(id))
    }

    async fn describe_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementStatus, Error> {
        let mut inner = self.inner.lock().unwrap();
        *inner.polls.entry(handle.id().to_string()).or_default() += 1;

        let script = inner.running.get_mut(handle.id()).ok_or_else(|| Error::Describe {
            id: handle.to_string(),
            message: "unknown statement".to_string(),
        })?;

        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        status.ok_or_else(|| Error::Describe {
            id: handle.to_string(),
            message: "empty script".to_string(),
        })
    }
}
