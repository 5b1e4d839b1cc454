//! Application wiring
//!
//! Builds the object graph shared by the CLI and the HTTP server: one event
//! bus, one governor (cache and rate limiter live as long as the process), the
//! chat service, and the lifecycle controller over the on-disk store.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::chat::ChatService;
use crate::config::Config;
use crate::events::{EventBus, create_event_bus};
use crate::governor::Governor;
use crate::lifecycle::LifecycleController;
use crate::llm::{GeminiClient, LlmClient, create_client};
use crate::progress::ProgressSimulator;
use crate::prompts::PromptLoader;
use crate::research::ResearchClient;
use crate::server::AppState;
use crate::state::StateManager;

pub struct App {
    pub config: Config,
    pub events: Arc<EventBus>,
    pub governor: Arc<Governor>,
    pub chat: Arc<ChatService>,
    pub controller: LifecycleController,
    pub state: StateManager,
}

impl App {
    /// Build with the configured provider
    ///
    /// With `needs_llm` false a missing API key is tolerated; only commands
    /// that never reach the model should pass false.
    pub async fn build(config: Config, needs_llm: bool) -> Result<Self> {
        debug!(needs_llm, "App::build: called");
        let llm: Arc<dyn LlmClient> = if needs_llm {
            config.validate()?;
            create_client(&config.llm).context("Failed to create LLM client")?
        } else {
            let key = config.llm.get_api_key().unwrap_or_default();
            Arc::new(GeminiClient::new(
                key,
                config.llm.model.clone(),
                config.llm.base_url.clone(),
                config.llm.timeout(),
            )?)
        };
        Self::with_llm(config, llm).await
    }

    /// Build around a caller-supplied model client
    pub async fn with_llm(config: Config, llm: Arc<dyn LlmClient>) -> Result<Self> {
        debug!(store = %config.storage.dir, identity = %config.storage.identity, "App::with_llm: called");
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let prompts = Arc::new(PromptLoader::new(root));
        let events = create_event_bus();

        let research = Arc::new(ResearchClient::new(llm.clone(), prompts.clone(), &config.llm));
        let governor = Arc::new(Governor::new(config.governor.clone(), research));
        let chat = Arc::new(ChatService::new(llm, prompts, &config.llm));
        let progress = ProgressSimulator::new(config.progress.tick(), events.clone());

        let state = StateManager::spawn(&config.storage.dir, &config.storage.identity)
            .context(format!("Failed to open task store in {}", config.storage.dir))?;
        let controller = LifecycleController::load(state.clone(), governor.clone(), progress, events.clone())
            .await
            .context("Failed to load tasks")?;

        info!(identity = %config.storage.identity, "todone ready");
        Ok(Self {
            config,
            events,
            governor,
            chat,
            controller,
            state,
        })
    }

    pub fn server_state(&self) -> AppState {
        AppState::new(self.governor.clone(), self.chat.clone())
    }

    /// Flush pending writes and stop the store
    pub async fn shutdown(&self) -> Result<()> {
        debug!("App::shutdown: called");
        self.controller.flush().await;
        self.state.shutdown().await?;
        Ok(())
    }
}
