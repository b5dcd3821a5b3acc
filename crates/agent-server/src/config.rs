use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Args;

use agent_llm::{ModelClient, OpenAIProvider, ScriptedModelClient, ScriptedReply};
use agent_loop::AgentLoopConfig;
use agent_policy::{pharmacy_rules, PolicyEnforcer};
use agent_tools::{pharmacy_registry, MemoryStore, PharmacyStore};

use crate::assistant::{medication_terms, Assistant};
use crate::prompt::DEFAULT_SYSTEM_PROMPT;

pub const OFFLINE_REPLY: &str = "The assistant is running offline, so no model is available to answer. Please ask one of our pharmacists for help.";

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct AssistantArgs {
    /// LLM API base URL
    #[arg(long, env = "LLM_BASE_URL", global = true)]
    pub llm_base_url: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o", global = true)]
    pub model: String,

    /// LLM API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Request timeout for the LLM backend, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "120", global = true)]
    pub timeout_secs: u64,

    /// Model invocations allowed per user turn
    #[arg(long, env = "AGENT_MAX_ROUNDS", default_value = "6", global = true)]
    pub max_rounds: usize,

    /// Extra policy rules (YAML or JSON) added to the built-in table
    #[arg(long, env = "AGENT_RULES", global = true)]
    pub rules: Option<PathBuf>,

    /// Customer and medication records (YAML or JSON) replacing the reference set
    #[arg(long, env = "AGENT_RECORDS", global = true)]
    pub records: Option<PathBuf>,

    /// File containing a system prompt to use instead of the built-in one
    #[arg(long, env = "AGENT_SYSTEM_PROMPT", global = true)]
    pub system_prompt: Option<PathBuf>,

    /// Answer with a canned reply instead of calling a model
    #[arg(long, env = "AGENT_OFFLINE", default_value = "false", global = true)]
    pub offline: bool,
}

impl Default for AssistantArgs {
    fn default() -> Self {
        Self {
            llm_base_url: None,
            model: "gpt-4o".to_string(),
            api_key: None,
            timeout_secs: 120,
            max_rounds: agent_loop::DEFAULT_MAX_ROUNDS,
            rules: None,
            records: None,
            system_prompt: None,
            offline: false,
        }
    }
}

impl AssistantArgs {
    pub async fn build(&self) -> anyhow::Result<Assistant> {
        let store: Arc<dyn PharmacyStore> = Arc::new(self.load_store()?);

        let medications = store
            .list_medications()
            .await
            .context("failed to list medications")?;
        let mut policy = pharmacy_rules(medication_terms(&medications))?;
        if let Some(path) = &self.rules {
            let extra = PolicyEnforcer::from_path(path)
                .with_context(|| format!("failed to load rules from {}", path.display()))?;
            policy.extend(extra)?;
        }

        let tools = pharmacy_registry(Arc::clone(&store))?;
        log::info!(
            "Loaded {} tool(s), {} medication(s), {} policy rule(s)",
            tools.len(),
            medications.len(),
            policy.rules().len()
        );

        let mut config = AgentLoopConfig::default().with_max_rounds(self.max_rounds);
        config.system_prompt = Some(self.load_system_prompt()?);

        let assistant = Assistant::new(
            self.model_client()?,
            Arc::new(tools),
            Arc::new(policy),
            store,
            config,
        )?;
        Ok(assistant)
    }

    fn load_store(&self) -> anyhow::Result<MemoryStore> {
        match &self.records {
            Some(path) => MemoryStore::from_path(path)
                .with_context(|| format!("failed to load records from {}", path.display())),
            None => Ok(MemoryStore::reference()?),
        }
    }

    fn load_system_prompt(&self) -> anyhow::Result<String> {
        match &self.system_prompt {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read system prompt from {}", path.display())),
            None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    fn model_client(&self) -> anyhow::Result<Arc<dyn ModelClient>> {
        if self.offline {
            log::warn!("Running offline: every answer is a canned reply");
            return Ok(Arc::new(
                ScriptedModelClient::new([ScriptedReply::text(OFFLINE_REPLY)])
                    .repeat_last()
                    .with_model("offline"),
            ));
        }

        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("no API key configured; set OPENAI_API_KEY or pass --offline"))?;

        let mut provider = OpenAIProvider::new(api_key)
            .with_model(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = &self.llm_base_url {
            provider = provider.with_base_url(base_url.clone());
        }

        log::info!("Using model {}", self.model);
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn offline() -> AssistantArgs {
        AssistantArgs {
            offline: true,
            ..AssistantArgs::default()
        }
    }

    #[tokio::test]
    async fn offline_assistant_uses_reference_records() {
        let assistant = offline().build().await.unwrap();

        assert_eq!(assistant.model_name(), "offline");
        assert_eq!(assistant.tools().len(), 6);
        assert_eq!(assistant.policy().rules().len(), 1);
        assert_eq!(
            assistant.config().system_prompt.as_deref(),
            Some(DEFAULT_SYSTEM_PROMPT)
        );

        let outcome = assistant.conversation().send("Hello").await.unwrap();
        assert_eq!(outcome.final_text, OFFLINE_REPLY);
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected() {
        let error = AssistantArgs::default().build().await.err().unwrap();
        assert!(error.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn extra_rules_are_added() {
        let mut rules = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            rules,
            "rules:\n  - name: interactions\n    trigger: {{kind: matches, pattern: \"(?i)together\"}}\n    required_tools: [check_active_ingredients_and_interactions]"
        )
        .unwrap();

        let args = AssistantArgs {
            rules: Some(rules.path().to_path_buf()),
            ..offline()
        };
        let assistant = args.build().await.unwrap();
        assert_eq!(assistant.policy().rules().len(), 2);
    }

    #[tokio::test]
    async fn rules_requiring_unknown_tools_fail_startup() {
        let mut rules = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            rules,
            r#"{{"rules":[{{"name":"weather","trigger":{{"kind":"always"}},"required_tools":["get_weather"]}}]}}"#
        )
        .unwrap();

        let args = AssistantArgs {
            rules: Some(rules.path().to_path_buf()),
            ..offline()
        };
        assert!(args.build().await.is_err());
    }

    #[tokio::test]
    async fn system_prompt_file_overrides_default() {
        let mut prompt = tempfile::NamedTempFile::new().unwrap();
        write!(prompt, "Answer in one sentence.").unwrap();

        let args = AssistantArgs {
            system_prompt: Some(prompt.path().to_path_buf()),
            ..offline()
        };
        let assistant = args.build().await.unwrap();
        assert_eq!(
            assistant.config().system_prompt.as_deref(),
            Some("Answer in one sentence.")
        );
    }

    #[tokio::test]
    async fn medication_terms_include_generic_names() {
        let medications = MemoryStore::reference()
            .unwrap()
            .list_medications()
            .await
            .unwrap();
        let terms = medication_terms(&medications);

        assert!(terms.contains(&"Aspirin".to_string()));
        assert!(terms.contains(&"Acetylsalicylic Acid".to_string()));
        assert_eq!(
            terms.iter().filter(|term| term.as_str() == "Amoxicillin").count(),
            1
        );
    }
}
