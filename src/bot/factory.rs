use super::agent::AgentOptions;
use super::{AgentBot, BotError, ChatBot, ModelSettings, PersonaBot, ScenarioBot};
use crate::config::{BotConfig, BotKind, Settings};
use crate::knowledge::KnowledgeBase;
use crate::persona::{PersonaCatalog, PersonaSelector};
use crate::provider::{build_chat_backend, CohereClient, OpenAiClient, ProviderKind};
use crate::scenario::{Extractor, ScenarioDefinition, StateMachine};
use crate::shared::logging::EventLog;
use crate::tools::{MediaTools, ToolKind};
use serde_json::Value;

/// Builds the named bot, falling back to the default bot for unknown names.
pub fn build_bot(
    settings: &Settings,
    requested: Option<&str>,
    log: &EventLog,
) -> Result<Box<dyn ChatBot>, BotError> {
    let (name, config) = settings.resolve_bot(requested, log)?;
    let backend = build_chat_backend(settings.endpoint(config.provider)?);
    let model = ModelSettings::from_config(config);

    let bot: Box<dyn ChatBot> = match config.kind {
        BotKind::Persona => {
            let personas = load_personas(settings, name, config, log)?;
            let mut bot = PersonaBot::new(
                name,
                backend,
                model,
                settings.global_instructions(),
                personas,
                log.clone(),
            );
            if config.use_knowledge {
                bot = bot.with_knowledge(open_knowledge_base(settings, name, log)?);
            }
            if config.speak_replies {
                bot = bot.with_voice(media_tools(settings, name)?, true);
            }
            Box::new(bot)
        }
        BotKind::Agent => {
            let personas = load_personas(settings, name, config, log)?;
            let options = AgentOptions {
                tools: config.tools.clone(),
                force_knowledge: config.force_knowledge,
                max_tool_rounds: config.max_tool_rounds,
                max_queries: settings.knowledge.max_queries,
            };
            let mut bot = AgentBot::new(
                name,
                backend,
                model,
                settings.global_instructions(),
                personas,
                options,
                log.clone(),
            );
            if config.needs_knowledge() {
                bot = bot.with_knowledge(open_knowledge_base(settings, name, log)?);
            }
            if config
                .tools
                .iter()
                .any(|tool| matches!(tool, ToolKind::GenerateImage | ToolKind::TextToSpeech))
            {
                bot = bot.with_media(media_tools(settings, name)?);
            }
            Box::new(bot)
        }
        BotKind::Scenario => {
            let path = settings
                .scenario_path(name, config)
                .ok_or_else(|| BotError::Misconfigured {
                    bot: name.to_string(),
                    reason: "scenario bots require `scenario_file`".to_string(),
                })?;
            let definition = ScenarioDefinition::from_path(&path, config.scenario.as_deref())?;
            let extractor = Extractor::new(config.extractor_model(), log.clone());
            Box::new(ScenarioBot::new(
                name,
                backend,
                model,
                StateMachine::new(definition),
                extractor,
                log.clone(),
            ))
        }
    };

    log.info(
        "bot.loaded",
        &[
            ("bot", Value::from(name)),
            ("kind", Value::from(config.kind.as_str())),
            ("provider", Value::from(config.provider.as_str())),
        ],
    );
    Ok(bot)
}

/// Opens the bot's knowledge store with Cohere embed and rerank clients.
pub fn open_knowledge_base(
    settings: &Settings,
    bot: &str,
    log: &EventLog,
) -> Result<KnowledgeBase, BotError> {
    let cohere = CohereClient::new(
        settings.endpoint(ProviderKind::Cohere)?,
        &settings.knowledge.embed_model,
        &settings.knowledge.rerank_model,
    );
    Ok(KnowledgeBase::open(
        &settings.knowledge_db_path(bot),
        Box::new(cohere.clone()),
        Box::new(cohere),
        settings.knowledge.clone(),
        log.clone(),
    )?)
}

fn media_tools(settings: &Settings, bot: &str) -> Result<MediaTools, BotError> {
    let client = OpenAiClient::new(settings.endpoint(ProviderKind::OpenAi)?);
    Ok(MediaTools::new(
        client,
        settings.images.clone(),
        settings.speech.clone(),
        &settings.uploads_dir(bot),
    ))
}

fn load_personas(
    settings: &Settings,
    bot: &str,
    config: &BotConfig,
    log: &EventLog,
) -> Result<PersonaCatalog, BotError> {
    let mut personas = PersonaCatalog::load(&settings.personas_path(bot))?;
    if let Some(slug) = config.initial_persona.as_deref() {
        if personas.select(PersonaSelector::Slug(slug)).is_err() {
            log.warn(
                "bot.initial_persona_missing",
                &[("bot", Value::from(bot)), ("persona", Value::from(slug))],
            );
        }
    }
    Ok(personas)
}
