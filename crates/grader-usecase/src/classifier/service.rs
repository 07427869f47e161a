//! Service-backed stage: one call to the semantic classifier per batch

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grader_domain::{Action, CategoryMatch, RuleSet};
use serde::Serialize;
use tracing::debug;

use super::response::{parse_response, ClassifierResponse};
use super::Classifier;
use crate::error::ClassifierError;
use crate::port::{ClassificationRequest, ClassificationService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionPayload<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    mentioned: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<&'a str>,
}

/// Only the name and description ever leave the engine
#[derive(Debug, Serialize)]
struct CategoryPayload<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    actions: Vec<ActionPayload<'a>>,
    categories: Vec<CategoryPayload<'a>>,
}

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

pub struct ServiceClassifier {
    service: Arc<dyn ClassificationService>,
    timeout: Duration,
    text_limit: usize,
    sensitive_category: String,
}

impl ServiceClassifier {
    pub fn new(
        service: Arc<dyn ClassificationService>,
        timeout: Duration,
        text_limit: usize,
        sensitive_category: impl Into<String>,
    ) -> Self {
        Self {
            service,
            timeout,
            text_limit,
            sensitive_category: sensitive_category.into(),
        }
    }

    pub fn instructions(&self) -> String {
        format!(
            "You classify user actions from a social media simulation.\n\
             Input JSON has \"actions\" (each with id, type, text, target, mentioned) and \
             \"categories\" (each with name and description).\n\
             Rules:\n\
             - Only classify actions written by the human user.\n\
             - The category \"{sensitive}\" applies only to actions of type \"direct_chat\".\n\
             - Every other category applies only to public content (type \"public_comment\").\n\
             - An action may match several categories.\n\
             Respond with strict JSON and nothing else, in one of two shapes:\n\
             {{\"matches\": [{{\"actionId\": \"...\", \"category\": \"...\", \"affectedAgents\": [\"username\"]}}]}}\n\
             {{\"none\": true, \"reasons\": {{\"<category>\": \"why it does not apply\"}}}}",
            sensitive = self.sensitive_category
        )
    }

    pub fn build_request(&self, actions: &[Action], rules: &RuleSet) -> ClassificationRequest {
        let payload = Payload {
            actions: actions
                .iter()
                .map(|a| ActionPayload {
                    id: a.id.as_str(),
                    kind: a.kind.as_str(),
                    text: truncate_chars(&a.text, self.text_limit),
                    target: a.target.as_deref(),
                    mentioned: &a.mentioned,
                    chat_id: a.chat_id.as_deref(),
                    post_id: a.post_id.as_deref(),
                })
                .collect(),
            categories: rules
                .categories()
                .iter()
                .map(|c| CategoryPayload {
                    name: c.name(),
                    description: c.description(),
                })
                .collect(),
        };

        ClassificationRequest {
            instructions: self.instructions(),
            payload: serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[async_trait]
impl Classifier for ServiceClassifier {
    fn name(&self) -> &str {
        "service"
    }

    async fn classify(
        &self,
        actions: &[Action],
        rules: &RuleSet,
    ) -> Result<Vec<CategoryMatch>, ClassifierError> {
        if actions.is_empty() || rules.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.build_request(actions, rules);
        let reply = tokio::time::timeout(self.timeout, self.service.complete(&request))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout.as_secs()))??;

        match parse_response(&reply)? {
            ClassifierResponse::NoMatch { reasons } => {
                debug!(reasons = %reasons, "Classifier reported no matches");
                Ok(Vec::new())
            }
            ClassifierResponse::Matches(raw) => Ok(raw
                .into_iter()
                .filter_map(|m| {
                    let Some(action) = actions.iter().find(|a| a.id.as_str() == m.action_id) else {
                        debug!(action_id = %m.action_id, "Dropping match for an action not in the batch");
                        return None;
                    };
                    Some(CategoryMatch::new(action.id.clone(), m.category, m.affected_agents))
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader_domain::{Category, Participant, ParticipantKind};
    use std::sync::Mutex;

    /// Replays a fixed reply and records requests
    struct FakeService {
        reply: Result<String, ClassifierError>,
        delay: Duration,
        requests: Mutex<Vec<ClassificationRequest>>,
    }

    impl FakeService {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ClassificationService for FakeService {
        async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError> {
            self.requests.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone()
        }
    }

    fn rules() -> RuleSet {
        RuleSet::new(
            1,
            vec![Category::new(1, "PublicVictimSupport", "Defends the victim publicly")
                .with_delta(grader_domain::Attribute::Prs, 1.0)],
        )
    }

    fn comment(id: &str, text: &str) -> Action {
        Action::comment(id, text, Participant::new(ParticipantKind::User))
    }

    fn classifier(service: Arc<FakeService>) -> ServiceClassifier {
        ServiceClassifier::new(service, Duration::from_secs(5), 10, "InvestigateInformer")
    }

    #[tokio::test]
    async fn test_matches_are_mapped_to_batch_actions() {
        let service = FakeService::replying(
            r#"{"matches": [
                {"actionId": "c1", "category": "PublicVictimSupport", "affectedAgents": ["victim1"]},
                {"actionId": "ghost", "category": "PublicVictimSupport"}
            ]}"#,
        );
        let matches = classifier(service)
            .classify(&[comment("c1", "leave them alone")], &rules())
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].affected_agents, vec!["victim1".to_string()]);
    }

    #[tokio::test]
    async fn test_payload_never_carries_deltas_and_truncates_text() {
        let service = FakeService::replying("none");
        classifier(Arc::clone(&service))
            .classify(&[comment("c1", "héllo wörld, how are you")], &rules())
            .await
            .unwrap();

        let requests = service.requests.lock().unwrap();
        let payload = &requests[0].payload;
        assert_eq!(payload["actions"][0]["text"], "héllo wörl");
        assert_eq!(payload["actions"][0]["type"], "public_comment");
        assert_eq!(payload["categories"][0]["name"], "PublicVictimSupport");
        assert!(payload["categories"][0].get("deltas").is_none());
        assert!(requests[0].instructions.contains("InvestigateInformer"));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_call() {
        let service = FakeService::replying("[]");
        let matches = classifier(Arc::clone(&service)).classify(&[], &rules()).await.unwrap();

        assert!(matches.is_empty());
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let service = Arc::new(FakeService {
            reply: Ok("[]".to_string()),
            delay: Duration::from_millis(200),
            requests: Mutex::new(Vec::new()),
        });
        let classifier =
            ServiceClassifier::new(service, Duration::from_millis(10), 100, "InvestigateInformer");

        let result = classifier.classify(&[comment("c1", "hi")], &rules()).await;
        assert!(matches!(result, Err(ClassifierError::Timeout(_))));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
