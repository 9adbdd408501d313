//! Provider descriptors: static templates describing how to shape a
//! request and parse a response for one API family.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::path::FieldPath;
use crate::providers::template::BodyTemplate;

/// How a provider expects credentials to be supplied.
///
/// Informational only: the auth style is shown when listing providers so the
/// user knows what kind of header to configure. No header is ever injected
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStyle {
    ApiKey,
    Bearer,
    None,
}

impl std::fmt::Display for AuthStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ApiKey => "api-key",
            Self::Bearer => "bearer",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

/// One API family: request shape, reply path, defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable id endpoint configs reference, e.g. `gemini`.
    pub id: String,
    pub display_name: String,
    pub description: String,
    /// Endpoint URL filled in when the user picks this provider.
    pub default_url: String,
    pub default_auth: AuthStyle,
    /// Body template with the message placeholder.
    pub request_template: BodyTemplate,
    /// Where the reply text lives in a success body.
    pub reply_path: FieldPath,
    /// Where a human-readable message lives in an error body.
    pub error_path: FieldPath,
}

#[allow(clippy::too_many_arguments)]
fn descriptor(
    id: &str,
    display_name: &str,
    description: &str,
    default_url: &str,
    default_auth: AuthStyle,
    template: &str,
    reply_path: &str,
    error_path: &str,
) -> Result<ProviderDescriptor> {
    Ok(ProviderDescriptor {
        id: id.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        default_url: default_url.to_string(),
        default_auth,
        request_template: BodyTemplate::parse(template)
            .with_context(|| format!("provider {id}: bad request template"))?,
        reply_path: FieldPath::parse(reply_path)
            .with_context(|| format!("provider {id}: bad reply path"))?,
        error_path: FieldPath::parse(error_path)
            .with_context(|| format!("provider {id}: bad error path"))?,
    })
}

/// The set of known providers, looked up by id at send time.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    entries: Vec<ProviderDescriptor>,
}

impl ProviderCatalog {
    /// Build the builtin catalog.
    pub fn builtin() -> Result<Self> {
        let entries = vec![
            descriptor(
                "gemini",
                "Gemini",
                "Google Gemini API",
                "https://aiplatform.googleapis.com/v1/publishers/google/models/gemini-2.5-pro:generateContent",
                AuthStyle::ApiKey,
                r#"{"contents": [{"role": "user", "parts": [{"text": "{{message}}"}]}]}"#,
                "candidates[0].content.parts[0].text",
                "error.message",
            )?,
            descriptor(
                "openai",
                "OpenAI GPT",
                "OpenAI GPT API",
                "https://api.openai.com/v1/chat/completions",
                AuthStyle::Bearer,
                r#"{"messages": [{"role": "user", "content": "{{message}}"}], "model": "gpt-4"}"#,
                "choices[0].message.content",
                "error.message",
            )?,
            descriptor(
                "claude",
                "Claude",
                "Anthropic Claude API",
                "https://api.anthropic.com/v1/messages",
                AuthStyle::Bearer,
                r#"{"messages": [{"role": "user", "content": "{{message}}"}], "model": "claude-3-sonnet-20240229"}"#,
                "content[0].text",
                "error.message",
            )?,
        ];
        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    pub fn entries(&self) -> &[ProviderDescriptor] {
        &self.entries
    }

    /// Provider ids in catalog order, for prompts and error messages.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.id.as_str()).collect()
    }
}
