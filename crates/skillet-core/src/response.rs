//! Skill response model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version string stamped on every response.
pub const RESPONSE_VERSION: &str = "1.0";

/// The reply returned to the voice platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    pub version: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub session_attributes: HashMap<String, Value>,
    pub response: ResponseBody,
}

impl Default for SkillResponse {
    fn default() -> Self {
        Self::empty()
    }
}

impl SkillResponse {
    /// A response with no speech that leaves the session state untouched.
    pub fn empty() -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            session_attributes: HashMap::new(),
            response: ResponseBody::default(),
        }
    }

    /// Speaks plain text and ends the session.
    pub fn tell(speech: impl Into<String>) -> Self {
        let mut response = Self::empty();
        response.response.output_speech = Some(OutputSpeech::plain(speech));
        response.response.should_end_session = Some(true);
        response
    }

    /// Speaks plain text, keeps the session open and sets a reprompt.
    pub fn ask(speech: impl Into<String>, reprompt: impl Into<String>) -> Self {
        let mut response = Self::empty();
        response.response.output_speech = Some(OutputSpeech::plain(speech));
        response.response.reprompt = Some(Reprompt {
            output_speech: OutputSpeech::plain(reprompt),
        });
        response.response.should_end_session = Some(false);
        response
    }

    /// Replaces the session attributes carried back to the platform.
    pub fn with_session_attributes(mut self, attributes: HashMap<String, Value>) -> Self {
        self.session_attributes = attributes;
        self
    }

    /// Returns the text of the output speech, if any.
    pub fn speech_text(&self) -> Option<&str> {
        self.response.output_speech.as_ref().map(OutputSpeech::text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

/// Speech rendered by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
    #[serde(rename = "SSML")]
    Ssml { ssml: String },
}

impl OutputSpeech {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn ssml(ssml: impl Into<String>) -> Self {
        Self::Ssml { ssml: ssml.into() }
    }

    /// Returns the raw text or markup.
    pub fn text(&self) -> &str {
        match self {
            Self::PlainText { text } => text,
            Self::Ssml { ssml } => ssml,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

/// A card shown in the companion app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple {
        title: String,
        content: String,
    },
    Standard {
        title: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<CardImage>,
    },
    LinkAccount,
    AskForPermissionsConsent {
        permissions: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tell_ends_session() {
        let response = SkillResponse::tell("Goodbye");
        assert_eq!(response.speech_text(), Some("Goodbye"));
        assert_eq!(response.response.should_end_session, Some(true));
        assert!(response.response.reprompt.is_none());
    }

    #[test]
    fn ask_serializes_with_reprompt() {
        let value = serde_json::to_value(SkillResponse::ask("Tea or coffee?", "Which one?")).unwrap();
        assert_eq!(
            value,
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": { "type": "PlainText", "text": "Tea or coffee?" },
                    "reprompt": {
                        "outputSpeech": { "type": "PlainText", "text": "Which one?" }
                    },
                    "shouldEndSession": false
                }
            })
        );
    }

    #[test]
    fn empty_has_no_fields() {
        let value = serde_json::to_value(SkillResponse::empty()).unwrap();
        assert_eq!(value, json!({ "version": "1.0", "response": {} }));
    }

    #[test]
    fn ssml_card_shape() {
        let mut response = SkillResponse::empty();
        response.response.output_speech = Some(OutputSpeech::ssml("<speak>Hi</speak>"));
        response.response.card = Some(Card::Simple {
            title: "Greeting".into(),
            content: "Hi".into(),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["response"]["outputSpeech"]["type"], "SSML");
        assert_eq!(value["response"]["card"]["type"], "Simple");
        assert_eq!(value["response"]["card"]["content"], "Hi");
    }
}
