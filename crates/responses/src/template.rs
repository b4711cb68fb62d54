//! Response templates and template sets.

use std::collections::BTreeMap;

use dbot_core::{Activity, DbotError, InputHint, Result};
use serde::{Deserialize, Serialize};

/// One text/speech pair as handed to the reply-resolution helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speak: Option<String>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speak: None,
        }
    }

    pub fn with_speak(text: impl Into<String>, speak: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speak: Some(speak.into()),
        }
    }
}

/// A named response: text with `{token}` placeholders and an optional speech rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate {
    pub name: String,
    pub text: String,
    pub speak: Option<String>,
    pub input_hint: InputHint,
}

impl ResponseTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            speak: None,
            input_hint: InputHint::default(),
        }
    }

    pub fn with_speak(mut self, speak: impl Into<String>) -> Self {
        self.speak = Some(speak.into());
        self
    }

    pub fn with_input_hint(mut self, hint: InputHint) -> Self {
        self.input_hint = hint;
        self
    }

    pub fn reply(&self) -> Reply {
        Reply {
            text: self.text.clone(),
            speak: self.speak.clone(),
        }
    }

    /// Message activity for this template with `text` already formatted by the caller.
    pub fn to_activity(&self, text: impl Into<String>, speak: Option<String>) -> Activity {
        let mut activity = Activity::message(text).with_input_hint(self.input_hint);
        activity.speak = speak;
        activity
    }
}

/// On-disk shape of one template entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateEntry {
    text: String,
    #[serde(default)]
    speak: Option<String>,
    #[serde(default)]
    input_hint: InputHint,
}

/// Named templates loaded together under one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    id: String,
    templates: BTreeMap<String, ResponseTemplate>,
}

impl TemplateSet {
    /// Builds a set from templates already in memory. Later duplicates replace earlier ones.
    pub fn from_templates(
        id: impl Into<String>,
        templates: impl IntoIterator<Item = ResponseTemplate>,
    ) -> Self {
        Self {
            id: id.into(),
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    /// Parses a JSON object keyed by template name:
    /// `{ "Greeting": { "text": "Hi {name}", "speak": "Hi", "inputHint": "expectingInput" } }`.
    pub fn from_json(id: impl Into<String>, json: &str) -> Result<Self> {
        let id = id.into();
        let entries: BTreeMap<String, TemplateEntry> = serde_json::from_str(json)
            .map_err(|e| DbotError::Config(format!("template set '{}': {}", id, e)))?;
        let templates = entries
            .into_iter()
            .map(|(name, entry)| {
                let template = ResponseTemplate {
                    name: name.clone(),
                    text: entry.text,
                    speak: entry.speak,
                    input_hint: entry.input_hint,
                };
                (name, template)
            })
            .collect();
        Ok(Self { id, templates })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Template named `name`; `TemplateNotFound` otherwise.
    pub fn get(&self, name: &str) -> Result<&ResponseTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| DbotError::TemplateNotFound {
                set: self.id.clone(),
                name: name.to_string(),
            })
    }

    /// Replies for several templates, in the order given.
    pub fn replies(&self, names: &[&str]) -> Result<Vec<Reply>> {
        names
            .iter()
            .map(|name| self.get(name).map(ResponseTemplate::reply))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Copy of `self` with `overlay`'s templates replacing same-named ones.
    pub(crate) fn overlaid(&self, id: impl Into<String>, overlay: TemplateSet) -> TemplateSet {
        let mut templates = self.templates.clone();
        templates.extend(overlay.templates);
        TemplateSet {
            id: id.into(),
            templates,
        }
    }
}
