//! Agent tool-use loop.

use std::collections::HashSet;
use std::sync::Arc;

use bon::Builder;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{AgentSettings, ServerConfig};
use crate::error::ToolmeshError;
use crate::mcp::{ConnectionRegistry, ToolAggregator};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::{RemoteTool, Tool, ToolArguments};
use crate::types::{ConversationTurn, GenerationSettings, ToolCallRequest, ToolCallResult};
use crate::util::retry::RetryPolicy;

use super::conversation::{ConversationMemory, InMemoryConversation};

/// Construction parameters for an [`Agent`].
#[derive(Builder)]
pub struct AgentConfig {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub description: String,
    /// Tool-servers launched by [`Agent::initialize`].
    #[builder(default)]
    pub server_configs: Vec<ServerConfig>,
    /// In-process function tools.
    #[builder(default)]
    pub functions: Vec<Arc<dyn Tool>>,
    pub llm: Arc<dyn ModelProvider>,
    #[builder(default = 10)]
    pub max_iterations: usize,
    /// Shared by completion requests and tool calls.
    #[builder(default = RetryPolicy::completion())]
    pub retry: RetryPolicy,
    /// Defaults to [`InMemoryConversation`].
    pub memory: Option<Arc<dyn ConversationMemory>>,
}

impl AgentConfig {
    /// Take iteration and retry bounds from loaded settings.
    pub fn with_settings(mut self, settings: &AgentSettings) -> Self {
        self.max_iterations = settings.max_iterations;
        self.retry = settings.completion_policy();
        self
    }
}

/// An agent that answers prompts by calling tools until the model stops
/// asking for them.
pub struct Agent {
    name: String,
    description: String,
    system_prompt: String,
    llm: Arc<dyn ModelProvider>,
    functions: Vec<Arc<dyn Tool>>,
    aggregator: Option<Arc<ToolAggregator>>,
    memory: Arc<dyn ConversationMemory>,
    max_iterations: usize,
    retry: RetryPolicy,
}

impl Agent {
    /// Build an agent, launching its tool-servers through `registry` when
    /// any are configured.
    pub async fn initialize(
        config: AgentConfig,
        registry: Arc<ConnectionRegistry>,
    ) -> Result<Self, ToolmeshError> {
        if config.server_configs.is_empty() {
            return Ok(Self::new(config));
        }

        let aggregator = ToolAggregator::load(registry, &config.server_configs).await?;
        Ok(Self::new(config).with_aggregator(Arc::new(aggregator)))
    }

    /// Build an agent without tool-servers. `server_configs` is not launched.
    pub fn new(config: AgentConfig) -> Self {
        let system_prompt = format!(
            "You are a {}. {} \n\n You have ability to use tools to help you complete the task.",
            config.name, config.description
        );

        Self {
            name: config.name,
            description: config.description,
            system_prompt,
            llm: config.llm,
            functions: config.functions,
            aggregator: None,
            memory: config
                .memory
                .unwrap_or_else(|| Arc::new(InMemoryConversation::new())),
            max_iterations: config.max_iterations,
            retry: config.retry,
        }
    }

    /// Route tool calls through an existing aggregator.
    pub fn with_aggregator(mut self, aggregator: Arc<ToolAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn aggregator(&self) -> Option<&Arc<ToolAggregator>> {
        self.aggregator.as_ref()
    }

    pub fn memory(&self) -> &Arc<dyn ConversationMemory> {
        &self.memory
    }

    /// Current tool set: aggregator tools first, then function tools.
    /// A function tool whose name is already taken is skipped.
    pub async fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        let mut seen = HashSet::new();

        if let Some(aggregator) = &self.aggregator {
            for descriptor in aggregator.get_all_tools().await {
                if seen.insert(descriptor.name.clone()) {
                    tools.push(Arc::new(RemoteTool::new(descriptor, Arc::clone(aggregator))));
                }
            }
        }

        for function in &self.functions {
            if seen.insert(function.name().to_string()) {
                tools.push(Arc::clone(function));
            } else {
                warn!(
                    agent = %self.name,
                    tool = function.name(),
                    "Function tool shadowed by a tool-server tool"
                );
            }
        }

        tools
    }

    /// Run the tool-use loop for one prompt and return the full history.
    ///
    /// Stops at the first response that does not request tools, or after
    /// `max_iterations` completions.
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        settings: Option<GenerationSettings>,
    ) -> Result<Vec<ConversationTurn>, ToolmeshError> {
        let prompt = prompt.into();
        let settings = settings.unwrap_or_default();

        info!(agent = %self.name, prompt = %prompt, "Agent working on task");
        self.memory.append(ConversationTurn::user(prompt)).await;

        let mut answered = false;
        for iteration in 0..self.max_iterations {
            let tools = self.list_tools().await;

            let mut messages = vec![ConversationTurn::system(self.system_prompt.clone())];
            messages.extend(self.memory.get().await);
            let request = ProviderRequest {
                messages,
                settings: settings.clone(),
                tools: tools.iter().map(|tool| tool.describe()).collect(),
            };

            debug!(
                agent = %self.name,
                iteration,
                tools = request.tools.len(),
                "Requesting completion"
            );
            let response = self
                .retry
                .execute(|| self.llm.generate_text(&request))
                .await?;

            self.memory.append(response.to_turn()).await;

            if !response.requests_tools() {
                info!(
                    agent = %self.name,
                    response = response.text.as_deref().unwrap_or_default(),
                    "Final response"
                );
                answered = true;
                break;
            }

            for call in &response.tool_calls {
                info!(agent = %self.name, tool = %call.name, arguments = %call.arguments, "Executing tool");

                let result = self
                    .retry
                    .execute_if(
                        || self.call_tool(&tools, call),
                        ToolmeshError::is_retryable_tool_failure,
                    )
                    .await?;

                let content = serde_json::to_string(&result)?;
                info!(agent = %self.name, tool = %call.name, result = %content, "Tool call result");
                self.memory
                    .append(ConversationTurn::tool(call.id.clone(), content))
                    .await;
            }
        }

        if !answered {
            warn!(
                agent = %self.name,
                max_iterations = self.max_iterations,
                "Iteration limit reached without a final response"
            );
        }

        Ok(self.memory.get().await)
    }

    /// Text of the final turn.
    pub async fn generate_str(
        &self,
        prompt: impl Into<String>,
        settings: Option<GenerationSettings>,
    ) -> Result<String, ToolmeshError> {
        let history = self.generate(prompt, settings).await?;
        Ok(history
            .last()
            .map(|turn| turn.text().to_string())
            .unwrap_or_default())
    }

    /// Final turn's text parsed as JSON.
    pub async fn generate_structured_result<T: DeserializeOwned>(
        &self,
        prompt: impl Into<String>,
        settings: Option<GenerationSettings>,
    ) -> Result<T, ToolmeshError> {
        let text = self.generate_str(prompt, settings).await?;
        serde_json::from_str(&text).map_err(|e| {
            ToolmeshError::StructuredOutput(format!("Final response is not valid JSON: {e}"))
        })
    }

    /// Disconnect this agent's tool-servers.
    pub async fn close(&mut self) {
        if let Some(aggregator) = self.aggregator.take() {
            info!(agent = %self.name, "Closing agent");
            aggregator.close().await;
        }
    }

    async fn call_tool(
        &self,
        tools: &[Arc<dyn Tool>],
        call: &ToolCallRequest,
    ) -> Result<ToolCallResult, ToolmeshError> {
        let tool = tools
            .iter()
            .find(|tool| tool.name() == call.name)
            .ok_or_else(|| ToolmeshError::ToolNotFound(call.name.clone()))?;

        let args = ToolArguments::parse(&call.name, &call.arguments)?;
        let result = tool.execute(&args).await?;
        if result.is_empty() {
            return Err(ToolmeshError::EmptyToolResult(call.name.clone()));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.llm.model_id())
            .field("functions", &self.functions.len())
            .field("aggregator", &self.aggregator)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}
