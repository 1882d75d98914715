//! Default [`ResponseBuilder`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use skillet_core::{
    AttributesManager, Card, CardImage, OutputSpeech, Reprompt, ResponseBody, ResponseBuilder,
    SkillResponse, SkillResult,
};
use tokio_util::sync::CancellationToken;

const SPEAK_OPEN: &str = "<speak>";
const SPEAK_CLOSE: &str = "</speak>";

/// Wraps speech in a single `<speak>` element.
///
/// Surrounding whitespace is dropped, and an existing outer `<speak>` element
/// is unwrapped first so it is never doubled.
pub fn normalize_ssml(speech: &str) -> String {
    let trimmed = speech.trim();
    let inner = trimmed
        .strip_prefix(SPEAK_OPEN)
        .and_then(|rest| rest.strip_suffix(SPEAK_CLOSE))
        .map_or(trimmed, str::trim);
    format!("{SPEAK_OPEN}{inner}{SPEAK_CLOSE}")
}

/// Accumulates response parts and attaches the current session attributes.
///
/// `empty` is the exception: it always returns a bare response.
pub struct DefaultResponseBuilder {
    attributes: Arc<dyn AttributesManager>,
    body: Mutex<ResponseBody>,
}

impl DefaultResponseBuilder {
    pub fn new(attributes: Arc<dyn AttributesManager>) -> Self {
        Self {
            attributes,
            body: Mutex::new(ResponseBody::default()),
        }
    }

    fn finish(&self, body: ResponseBody) -> SkillResponse {
        let mut response = SkillResponse::empty();
        response.response = body;
        if let Ok(session_attributes) = self.attributes.session_attributes() {
            response.session_attributes = session_attributes;
        }
        response
    }

    fn update(&self, f: impl FnOnce(&mut ResponseBody)) -> &dyn ResponseBuilder {
        f(&mut *self.body.lock());
        self
    }
}

#[async_trait]
impl ResponseBuilder for DefaultResponseBuilder {
    fn speak(&self, speech: &str) -> &dyn ResponseBuilder {
        let speech = OutputSpeech::ssml(normalize_ssml(speech));
        self.update(|body| body.output_speech = Some(speech))
    }

    fn reprompt(&self, speech: &str) -> &dyn ResponseBuilder {
        let output_speech = OutputSpeech::ssml(normalize_ssml(speech));
        self.update(|body| body.reprompt = Some(Reprompt { output_speech }))
    }

    fn with_simple_card(&self, title: &str, content: &str) -> &dyn ResponseBuilder {
        let card = Card::Simple {
            title: title.to_string(),
            content: content.to_string(),
        };
        self.update(|body| body.card = Some(card))
    }

    fn with_standard_card(
        &self,
        title: &str,
        text: &str,
        small_image_url: Option<&str>,
        large_image_url: Option<&str>,
    ) -> &dyn ResponseBuilder {
        let image = (small_image_url.is_some() || large_image_url.is_some()).then(|| CardImage {
            small_image_url: small_image_url.map(str::to_string),
            large_image_url: large_image_url.map(str::to_string),
        });
        let card = Card::Standard {
            title: title.to_string(),
            text: text.to_string(),
            image,
        };
        self.update(|body| body.card = Some(card))
    }

    fn with_link_account_card(&self) -> &dyn ResponseBuilder {
        self.update(|body| body.card = Some(Card::LinkAccount))
    }

    fn with_ask_for_permissions_consent_card(
        &self,
        permissions: Vec<String>,
    ) -> &dyn ResponseBuilder {
        self.update(|body| body.card = Some(Card::AskForPermissionsConsent { permissions }))
    }

    fn add_directive(&self, directive: Value) -> &dyn ResponseBuilder {
        self.update(|body| body.directives.push(directive))
    }

    fn with_should_end_session(&self, should_end_session: bool) -> &dyn ResponseBuilder {
        self.update(|body| body.should_end_session = Some(should_end_session))
    }

    async fn get_response(&self, _cancel: &CancellationToken) -> SkillResult<SkillResponse> {
        let body = std::mem::take(&mut *self.body.lock());
        Ok(self.finish(body))
    }

    async fn tell(&self, speech: &str, _cancel: &CancellationToken) -> SkillResult<SkillResponse> {
        Ok(self.finish(SkillResponse::tell(speech).response))
    }

    async fn ask(
        &self,
        speech: &str,
        reprompt: &str,
        _cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        Ok(self.finish(SkillResponse::ask(speech, reprompt).response))
    }

    async fn empty(&self, _cancel: &CancellationToken) -> SkillResult<SkillResponse> {
        Ok(SkillResponse::empty())
    }
}

impl std::fmt::Debug for DefaultResponseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultResponseBuilder")
            .field("body", &*self.body.lock())
            .finish_non_exhaustive()
    }
}
