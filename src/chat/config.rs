//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`] consumed by
//! [`GeminiChat`](crate::GeminiChat) and [`ChatSession`](crate::chat::ChatSession).

use std::path::Path;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::intent::GENERATE_IMAGE_ACTION;
use crate::types::{KnownModel, Model};

/// Greeting seeded as the first bot message of every session.
pub const DEFAULT_GREETING: &str = "Hey there! I'm AB Datasonic AI, developed by 'Anirban & AB Design and Edits'. I can chat, answer questions, and even generate images for you. How can I help?";

/// Builds the default system instruction.
///
/// The instruction teaches the model the image command format that
/// [`parse_intent`](crate::parse_intent) understands.
pub fn default_system_instruction() -> String {
    format!(
        "You are AB Datasonic AI, a helpful and friendly assistant developed by \
         'Anirban & AB Design and Edits'. Remember the user's previous messages and the \
         context of the current conversation, refer back to what the user said earlier, and \
         avoid asking for information the user has already given you. If asked about your \
         location, respond with this exact phrase: 'I'm from Belonia, a small city of South \
         Tripura!'. You can also generate images. If the user asks for an image, respond with \
         ONLY the following JSON and nothing else: \
         {{\"action\": \"{GENERATE_IMAGE_ACTION}\", \"textResponse\": \"A friendly, \
         conversational reply to the user about starting the image generation.\", \"prompt\": \
         \"A detailed, descriptive prompt for the image generation model based on the user's \
         request.\"}}. Use the user's text and any provided image context to create the \
         detailed prompt and conversational response. For all other conversation, reply in a \
         helpful and friendly tone."
    )
}

/// Command-line arguments for the datasonic-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Chat model to use.
    #[arrrg(optional, "Chat model (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// Image model to use.
    #[arrrg(optional, "Image model (default: imagen-3.0-generate-002)", "MODEL")]
    pub image_model: Option<String>,

    /// System instruction override.
    #[arrrg(optional, "System instruction for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML config file; flags override its values", "FILE")]
    pub config: Option<String>,

    /// Skip the greeting message.
    #[arrrg(flag, "Do not seed the transcript with a greeting")]
    pub no_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// The on-disk form of a configuration; every field is optional.
///
/// ```yaml
/// chat_model: gemini-2.5-pro
/// image_model: imagen-3.0-generate-002
/// system_instruction: You are terse.
/// greeting: Hi!
/// use_color: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfigFile {
    /// Chat model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<Model>,

    /// Image model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<Model>,

    /// System instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Greeting; an empty string disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,

    /// Whether to use ANSI styling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_color: Option<bool>,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model answering chat turns.
    pub chat_model: Model,

    /// The model generating images.
    pub image_model: Model,

    /// System instruction sent with every chat call.
    pub system_instruction: Option<String>,

    /// Bot greeting seeded into a new transcript.
    pub greeting: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Chat model: gemini-2.5-flash
    /// - Image model: imagen-3.0-generate-002
    /// - System instruction: [`default_system_instruction`]
    /// - Greeting: [`DEFAULT_GREETING`]
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            chat_model: Model::Known(KnownModel::Gemini25Flash),
            image_model: Model::Known(KnownModel::Imagen3Generate002),
            system_instruction: Some(default_system_instruction()),
            greeting: Some(DEFAULT_GREETING.to_string()),
            use_color: true,
        }
    }

    /// Sets the chat model.
    pub fn with_chat_model(mut self, model: Model) -> Self {
        self.chat_model = model;
        self
    }

    /// Sets the image model.
    pub fn with_image_model(mut self, model: Model) -> Self {
        self.image_model = model;
        self
    }

    /// Sets or clears the system instruction.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }

    /// Sets or clears the greeting.
    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        self.greeting = greeting;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Loads a YAML configuration file on top of the defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml_str(&content)
    }

    /// Parses YAML configuration text on top of the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ChatConfigFile = serde_yaml::from_str(content)?;
        Ok(Self::new().merge(file))
    }

    fn merge(mut self, file: ChatConfigFile) -> Self {
        if let Some(model) = file.chat_model {
            self.chat_model = model;
        }
        if let Some(model) = file.image_model {
            self.image_model = model;
        }
        if let Some(instruction) = file.system_instruction {
            self.system_instruction = Some(instruction);
        }
        if let Some(greeting) = file.greeting {
            self.greeting = Some(greeting).filter(|g| !g.is_empty());
        }
        if let Some(use_color) = file.use_color {
            self.use_color = use_color;
        }
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => ChatConfig::from_yaml_file(path)?,
            None => ChatConfig::new(),
        };
        if let Some(model) = args.model {
            config.chat_model = model.parse().unwrap_or(Model::Custom(model));
        }
        if let Some(model) = args.image_model {
            config.image_model = model.parse().unwrap_or(Model::Custom(model));
        }
        if let Some(system) = args.system {
            config.system_instruction = Some(system);
        }
        if args.no_greeting {
            config.greeting = None;
        }
        if args.no_color {
            config.use_color = false;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.chat_model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(
            config.image_model,
            Model::Known(KnownModel::Imagen3Generate002)
        );
        assert_eq!(config.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert!(config.use_color);
    }

    #[test]
    fn default_instruction_teaches_the_command() {
        let instruction = ChatConfig::new().system_instruction.unwrap();
        assert!(instruction.contains(r#""action": "generate_image""#));
        assert!(instruction.contains(r#""textResponse""#));
        assert!(instruction.contains(r#""prompt""#));
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            image_model: Some("imagen-4-preview".to_string()),
            system: Some("You are terse.".to_string()),
            config: None,
            no_greeting: true,
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.chat_model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(
            config.image_model,
            Model::Custom("imagen-4-preview".to_string())
        );
        assert_eq!(config.system_instruction.as_deref(), Some("You are terse."));
        assert!(config.greeting.is_none());
        assert!(!config.use_color);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let config = ChatConfig::from_yaml_str(
            "chat_model: gemini-2.0-flash\ngreeting: \"\"\nuse_color: false\n",
        )
        .unwrap();
        assert_eq!(config.chat_model, Model::Known(KnownModel::Gemini20Flash));
        assert!(config.greeting.is_none());
        assert!(!config.use_color);
        assert_eq!(config.system_instruction, Some(default_system_instruction()));
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        let err = ChatConfig::from_yaml_str("temperature: 0.2\n").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn flags_override_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.yaml");
        std::fs::write(&path, "chat_model: gemini-2.0-flash\ngreeting: Yo\n").unwrap();

        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            config: Some(path.to_string_lossy().into_owned()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.chat_model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(config.greeting.as_deref(), Some("Yo"));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_chat_model(Model::Known(KnownModel::Gemini20Flash))
            .with_image_model(Model::Custom("imagen-x".to_string()))
            .with_system_instruction(None)
            .with_greeting(Some("Hello!".to_string()))
            .without_color();
        assert_eq!(config.chat_model, Model::Known(KnownModel::Gemini20Flash));
        assert_eq!(config.image_model, Model::Custom("imagen-x".to_string()));
        assert!(config.system_instruction.is_none());
        assert_eq!(config.greeting.as_deref(), Some("Hello!"));
        assert!(!config.use_color);
    }
}
