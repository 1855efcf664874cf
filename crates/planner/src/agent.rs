use tracing::{debug, info, warn};

use crate::delegation::{Delegate, DelegationTask, NoticeDelegate};
use crate::errors::AgentResult;
use crate::models::message::{Message, MessageHistory};
use crate::models::tool::ToolRequest;
use crate::prompt_template::planning_prompt;
use crate::providers::base::Provider;
use crate::providers::configs::GenerationConfig;
use crate::router::{latest_user_message, route, Intent};
use crate::tools::{decode_arguments, ToolHandler, ToolOutcome, ToolRegistry};

/// PlanningAgent turns the latest user request into a project plan, or hands it off to
/// the implementation side when the user asks for a milestone to be built.
///
/// Each call to [`PlanningAgent::reply`] is independent: the model only ever sees the
/// planning instructions and the latest user turn, never the earlier history.
pub struct PlanningAgent {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    delegate: Box<dyn Delegate>,
    system_prompt: String,
    generation: GenerationConfig,
}

impl PlanningAgent {
    /// Create a new agent with the built-in planning prompt and no tools
    pub fn new(provider: Box<dyn Provider>, generation: GenerationConfig) -> AgentResult<Self> {
        generation.validate()?;
        Ok(Self {
            provider,
            tools: ToolRegistry::new(),
            delegate: Box::new(NoticeDelegate),
            system_prompt: planning_prompt()?,
            generation,
        })
    }

    /// Declare a tool to the model and handle its calls
    pub fn add_tool(&mut self, handler: Box<dyn ToolHandler>) -> AgentResult<()> {
        self.tools.register(handler)
    }

    /// Replace where delegated requests are sent
    pub fn set_delegate(&mut self, delegate: Box<dyn Delegate>) {
        self.delegate = delegate;
    }

    /// Replace the planning instructions sent as the system message
    pub fn set_system_prompt<S: Into<String>>(&mut self, system_prompt: S) {
        self.system_prompt = system_prompt.into();
    }

    /// The messages sent to the model: the instructions, then the latest user turn verbatim
    pub fn build_request(&self, latest: &Message) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.as_str()),
            Message::user(latest.content.as_str()),
        ]
    }

    /// Handle the latest user message in `history` and return the reply for the user.
    ///
    /// When the model asks for an artifact update, the write and its system-role
    /// acknowledgment in `history` both happen before this returns. The reply is the
    /// model's text verbatim, which is empty when it only called a tool.
    pub async fn reply(&self, history: &mut MessageHistory) -> AgentResult<String> {
        let intent = route(history)?;
        let latest = latest_user_message(history)?.clone();

        if intent == Intent::Delegate {
            info!("handing request off to the implementation agent");
            return self
                .delegate
                .hand_off(DelegationTask::new(latest.content))
                .await;
        }

        let request = self.build_request(&latest);
        let tools = self.tools.tools();
        let (response, usage) = self
            .provider
            .complete(&request, &tools, &self.generation)
            .await?;
        debug!(
            input_tokens = ?usage.input_tokens,
            output_tokens = ?usage.output_tokens,
            tool_request = response.tool_request.is_some(),
            "received completion"
        );

        if let Some(tool_request) = &response.tool_request {
            if let Some(notice) = self.dispatch_tool_request(tool_request).await? {
                history.push(Message::system(notice));
            }
        }

        Ok(response.content.unwrap_or_default())
    }

    /// Run the requested tool, returning the notice to record when it took effect.
    ///
    /// Arguments are decoded before the tool is looked up, so a malformed payload is an
    /// error even when it names a tool the agent does not have.
    async fn dispatch_tool_request(&self, request: &ToolRequest) -> AgentResult<Option<String>> {
        let arguments = decode_arguments(&request.name, &request.arguments)?;
        let Some(handler) = self.tools.get(&request.name) else {
            warn!(tool = %request.name, "ignoring request for an unknown tool");
            return Ok(None);
        };

        match handler.call(&arguments).await? {
            ToolOutcome::Applied { notice } => Ok(Some(notice)),
            ToolOutcome::Skipped { reason } => {
                debug!(tool = %request.name, %reason, "tool call had no effect");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::{QueueDelegate, DELEGATION_NOTICE};
    use crate::errors::AgentError;
    use crate::models::role::Role;
    use crate::providers::base::CompletionResponse;
    use crate::providers::mock::MockProvider;
    use crate::tools::tests::RecordingStore;
    use crate::tools::{IncompleteCallPolicy, UpdateArtifact};
    use std::sync::Arc;

    fn update_plan(arguments: &str) -> ToolRequest {
        ToolRequest::new("call_1", "updateArtifact", arguments)
    }

    fn agent_with(provider: &MockProvider) -> (PlanningAgent, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        let mut agent =
            PlanningAgent::new(Box::new(provider.clone()), GenerationConfig::default()).unwrap();
        agent
            .add_tool(Box::new(UpdateArtifact::new(store.clone())))
            .unwrap();
        (agent, store)
    }

    #[tokio::test]
    async fn test_delegation_skips_model() {
        let provider = MockProvider::new(vec![]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![
            Message::user("Here is the page"),
            Message::user("Please Implement Milestone 1"),
        ];
        let before = history.clone();

        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, DELEGATION_NOTICE);
        assert!(provider.calls().is_empty());
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history, before);
    }

    #[tokio::test]
    async fn test_delegation_enqueues_task() {
        let provider = MockProvider::new(vec![]);
        let (mut agent, _) = agent_with(&provider);
        let (delegate, mut receiver) = QueueDelegate::channel();
        agent.set_delegate(Box::new(delegate));

        let mut history = vec![Message::user("implement milestone 2")];
        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, DELEGATION_NOTICE);
        assert_eq!(receiver.try_recv().unwrap().request, "implement milestone 2");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_request_shape() {
        let provider = MockProvider::new(vec![CompletionResponse::text("# Overview")]);
        let (agent, _) = agent_with(&provider);
        let mut history = vec![
            Message::user("An earlier turn that must not be replayed"),
            Message::assistant("An earlier reply"),
            Message::user("A landing page with a hero image and three cards"),
        ];

        agent.reply(&mut history).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, planning_prompt().unwrap());
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "A landing page with a hero image and three cards"
        );
        assert_eq!(calls[0].tools.len(), 1);
        assert_eq!(calls[0].tools[0].name, "updateArtifact");
        assert_eq!(calls[0].generation, GenerationConfig::default());
    }

    #[tokio::test]
    async fn test_text_reply_leaves_history() {
        let provider = MockProvider::new(vec![CompletionResponse::text(
            "# Overview\n...\n# Milestones\n - [ ] 1. Skeleton",
        )]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Plan this page")];

        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, "# Overview\n...\n# Milestones\n - [ ] 1. Skeleton");
        assert_eq!(history.len(), 1);
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_writes_and_acknowledges() {
        let provider = MockProvider::new(vec![CompletionResponse::default()
            .with_tool_request(update_plan(r##"{"filename": "plan.md", "contents": "# Plan"}"##))]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Looks good, save it")];

        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, "");
        assert_eq!(
            *store.writes.lock().unwrap(),
            vec![("plan.md".to_string(), "# Plan".to_string())]
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::System);
        assert_eq!(history[1].content, "The artifact 'plan.md' was updated.");
    }

    #[tokio::test]
    async fn test_text_and_tool_call_together() {
        let provider = MockProvider::new(vec![CompletionResponse::text("Saved the plan.")
            .with_tool_request(update_plan(r##"{"filename": "plan.md", "contents": "# Plan"}"##))]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Save it")];

        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, "Saved the plan.");
        assert_eq!(store.writes.lock().unwrap().len(), 1);
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_tool_call_ignored() {
        let provider = MockProvider::new(vec![
            CompletionResponse::default().with_tool_request(update_plan(r#"{"filename": "plan.md"}"#)),
            CompletionResponse::default()
                .with_tool_request(update_plan(r#"{"filename": "plan.md", "contents": ""}"#)),
        ]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Save it")];

        assert_eq!(agent.reply(&mut history).await.unwrap(), "");
        assert_eq!(agent.reply(&mut history).await.unwrap(), "");

        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_tool_call_rejected() {
        let provider = MockProvider::new(vec![CompletionResponse::default()
            .with_tool_request(update_plan(r#"{"filename": "plan.md"}"#))]);
        let store = Arc::new(RecordingStore::default());
        let mut agent =
            PlanningAgent::new(Box::new(provider), GenerationConfig::default()).unwrap();
        agent
            .add_tool(Box::new(
                UpdateArtifact::new(store.clone()).with_policy(IncompleteCallPolicy::Reject),
            ))
            .unwrap();
        let mut history = vec![Message::user("Save it")];

        let error = agent.reply(&mut history).await.unwrap_err();

        assert!(matches!(error, AgentError::IncompleteToolCall { .. }));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_arguments() {
        let provider = MockProvider::new(vec![CompletionResponse::text("Saving")
            .with_tool_request(update_plan("{\"filename\": \"plan.md\", "))]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Save it")];

        let error = agent.reply(&mut history).await.unwrap_err();

        assert!(matches!(error, AgentError::MalformedToolArguments { .. }));
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_ignored() {
        let provider = MockProvider::new(vec![CompletionResponse::text("Done").with_tool_request(
            ToolRequest::new("call_1", "deleteArtifact", r#"{"filename": "plan.md"}"#),
        )]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Remove the plan")];

        let reply = agent.reply(&mut history).await.unwrap();

        assert_eq!(reply, "Done");
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_malformed_arguments() {
        let provider = MockProvider::new(vec![CompletionResponse::text("Done").with_tool_request(
            ToolRequest::new("call_1", "deleteArtifact", "not even json"),
        )]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Remove the plan")];

        let error = agent.reply(&mut history).await.unwrap_err();

        assert!(
            matches!(error, AgentError::MalformedToolArguments { ref tool, .. } if tool == "deleteArtifact")
        );
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_positional_arguments_rejected() {
        let provider = MockProvider::new(vec![CompletionResponse::text("Saving")
            .with_tool_request(update_plan(r##"["plan.md", "# Plan"]"##))]);
        let (agent, store) = agent_with(&provider);
        let mut history = vec![Message::user("Save it")];

        let error = agent.reply(&mut history).await.unwrap_err();

        assert!(matches!(error, AgentError::MalformedToolArguments { .. }));
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let provider = MockProvider::failing("Server error: 503 Service Unavailable");
        let (agent, _) = agent_with(&provider);
        let mut history = vec![Message::user("Plan this page")];

        let error = agent.reply(&mut history).await.unwrap_err();

        assert!(matches!(error, AgentError::Client(_)));
        assert_eq!(error.to_string(), "Server error: 503 Service Unavailable");
        assert_eq!(provider.calls().len(), 1);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_history() {
        let provider = MockProvider::new(vec![]);
        let (agent, _) = agent_with(&provider);

        let error = agent.reply(&mut Vec::new()).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidHistory(_)));

        let mut history = vec![Message::assistant("Hello")];
        let error = agent.reply(&mut history).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidHistory(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_invocations_write_each_time() {
        let response = CompletionResponse::default()
            .with_tool_request(update_plan(r##"{"filename": "plan.md", "contents": "# Plan"}"##));
        let provider = MockProvider::new(vec![response.clone(), response]);
        let (agent, store) = agent_with(&provider);

        for _ in 0..2 {
            let mut history = vec![Message::user("Save it")];
            agent.reply(&mut history).await.unwrap();
            assert_eq!(history.len(), 2);
        }

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], writes[1]);
    }

    #[test]
    fn test_invalid_generation_config() {
        let result = PlanningAgent::new(
            Box::new(MockProvider::new(vec![])),
            GenerationConfig::new("gpt-4o").with_temperature(5.0),
        );
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }

    #[test]
    fn test_custom_system_prompt() {
        let mut agent =
            PlanningAgent::new(Box::new(MockProvider::new(vec![])), GenerationConfig::default())
                .unwrap();
        agent.set_system_prompt("Plan briefly.");

        let request = agent.build_request(&Message::user("A pricing page"));
        assert_eq!(request[0].content, "Plan briefly.");
        assert_eq!(request[1].content, "A pricing page");
    }
}
