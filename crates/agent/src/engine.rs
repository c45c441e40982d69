//! The decision stage — one completion per round.
//!
//! Each round the engine shows the model the full bounded memory view plus
//! a transient decision instruction (the serialized plan and the knowledge
//! sources it may consult). The instruction is appended to the outgoing
//! request only and never recorded into memory, so repeated rounds do not
//! accumulate scaffolding text.

use crate::model::ModelSettings;
use mindloop_core::error::Error;
use mindloop_core::knowledge::KnowledgeBase;
use mindloop_core::message::Message;
use mindloop_core::plan::Plan;
use mindloop_core::tool::ToolRegistry;
use tracing::debug;

/// Proposes the next action given memory and the plan.
pub struct DecisionEngine {
    settings: ModelSettings,
}

/// The raw outcome of one decision round.
pub struct Decision {
    /// The assistant message as proposed, tool calls included.
    pub message: Message,

    /// Whether the message proposes actionable tool calls. When false the
    /// round is a no-op at the execution stage, but the step counter still
    /// advances — that is how the loop naturally exhausts its budget when
    /// the model has nothing further to do.
    pub has_tool_calls: bool,
}

fn decision_instruction(plan: &Plan, knowledge_bases: &[KnowledgeBase]) -> String {
    format!(
        "You are this agent's decision module. A global task plan already \
         exists; consult it and, given the current conversation context, \
         decide the next action.\n\
         \n\
         Additional information:\n\
         - Knowledge bases available to you:\n{}\n\
         - Global task plan:\n{}\n\
         Output requirements:\n\
         - Explain the reasoning behind your tool choice in natural language.\n\
         - If you intend to call tools, propose them one at a time where possible.\n\
         - If every task in the plan has been completed, call the `terminate` tool.\n",
        KnowledgeBase::render_list(knowledge_bases),
        plan.render(),
    )
}

impl DecisionEngine {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    /// Issue one completion and report whether it proposes tool calls.
    ///
    /// The request keeps `internal_tool_execution` off: the model runtime
    /// must not auto-execute anything — execution is the dispatcher's
    /// explicit, separate step.
    pub async fn think(
        &self,
        memory: &[Message],
        plan: &Plan,
        knowledge_bases: &[KnowledgeBase],
        tools: &ToolRegistry,
    ) -> Result<Decision, Error> {
        let mut messages = memory.to_vec();
        messages.push(Message::user(decision_instruction(plan, knowledge_bases)));

        let mut request = self.settings.request(messages);
        request.tools = tools.definitions();

        let response = self.settings.provider.complete(request).await?;

        if response.has_tool_calls() {
            let proposed: Vec<String> = response
                .message
                .tool_calls
                .iter()
                .map(|tc| format!("{}({})", tc.name, tc.arguments))
                .collect();
            debug!(calls = %proposed.join(", "), "Decision proposed tool calls");
        } else {
            debug!("Decision proposed no tool calls");
        }

        Ok(Decision {
            has_tool_calls: response.has_tool_calls(),
            message: response.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use mindloop_core::plan::PlanStep;
    use mindloop_tools::fixed_registry;
    use std::sync::Arc;

    fn plan() -> Plan {
        Plan {
            steps: vec![PlanStep {
                id: 1,
                target: "Write the file".into(),
                detail: "Create hello.txt with a greeting".into(),
            }],
        }
    }

    fn kbs() -> Vec<KnowledgeBase> {
        vec![KnowledgeBase {
            id: "kb-1".into(),
            name: "Docs".into(),
            description: "Product docs".into(),
        }]
    }

    #[tokio::test]
    async fn reports_proposed_tool_calls() {
        let mock = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            vec![make_tool_call("file_write", serde_json::json!({"path": "a"}))],
            "I should write the file now",
        )]));
        let engine = DecisionEngine::new(ModelSettings::new(mock, "mock-model"));

        let decision = engine
            .think(
                &[Message::system("sys")],
                &plan(),
                &kbs(),
                &fixed_registry(),
            )
            .await
            .unwrap();
        assert!(decision.has_tool_calls);
        assert_eq!(decision.message.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn plain_text_means_no_op_round() {
        let mock = Arc::new(SequentialMockProvider::single_text("Nothing to do yet."));
        let engine = DecisionEngine::new(ModelSettings::new(mock, "mock-model"));

        let decision = engine
            .think(
                &[Message::system("sys")],
                &plan(),
                &kbs(),
                &fixed_registry(),
            )
            .await
            .unwrap();
        assert!(!decision.has_tool_calls);
    }

    #[tokio::test]
    async fn instruction_is_transient_and_execution_stays_manual() {
        let mock = Arc::new(SequentialMockProvider::single_text("ok"));
        let engine = DecisionEngine::new(ModelSettings::new(mock.clone(), "mock-model"));

        let memory = vec![Message::system("sys"), Message::user("do the thing")];
        engine
            .think(&memory, &plan(), &kbs(), &fixed_registry())
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(!request.internal_tool_execution);

        // Memory view + exactly one transient instruction at the end
        assert_eq!(request.messages.len(), memory.len() + 1);
        let last = request.messages.last().unwrap();
        assert!(last.content.contains("decision module"));
        assert!(last.content.contains("Write the file"));
        assert!(last.content.contains("kb-1"));
        assert!(request.tools.iter().any(|t| t.name == "terminate"));
    }
}
