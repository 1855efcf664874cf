use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

use crate::errors::{AgentError, AgentResult};

/// Notice returned to the caller whenever a request is handed to the implementation side
pub const DELEGATION_NOTICE: &str =
    "Delegating to Implementation Agent to implement the milestone.";

/// A request handed off to the implementation agent
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationTask {
    pub request: String,
    pub created: i64,
}

impl DelegationTask {
    pub fn new<S: Into<String>>(request: S) -> Self {
        Self {
            request: request.into(),
            created: Utc::now().timestamp(),
        }
    }
}

/// The seam between the planning agent and whatever implements milestones
#[async_trait]
pub trait Delegate: Send + Sync {
    /// Hand the task off and return the reply to show the user
    async fn hand_off(&self, task: DelegationTask) -> AgentResult<String>;
}

/// Acknowledges the hand-off without forwarding it anywhere
#[derive(Debug, Default, Clone)]
pub struct NoticeDelegate;

#[async_trait]
impl Delegate for NoticeDelegate {
    async fn hand_off(&self, _task: DelegationTask) -> AgentResult<String> {
        Ok(DELEGATION_NOTICE.to_string())
    }
}

/// Enqueues tasks for a consumer holding the other end of the channel
#[derive(Debug, Clone)]
pub struct QueueDelegate {
    sender: mpsc::UnboundedSender<DelegationTask>,
}

impl QueueDelegate {
    pub fn new(sender: mpsc::UnboundedSender<DelegationTask>) -> Self {
        Self { sender }
    }

    /// Create a delegate along with the receiving end of its queue
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DelegationTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl Delegate for QueueDelegate {
    async fn hand_off(&self, task: DelegationTask) -> AgentResult<String> {
        self.sender
            .send(task)
            .map_err(|_| AgentError::Delegation("implementation queue is closed".to_string()))?;
        info!("queued request for the implementation agent");
        Ok(DELEGATION_NOTICE.to_string())
    }
}
