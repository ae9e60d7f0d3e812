use std::time::Duration;

use async_openai::{Client, config::OpenAIConfig};
use serde_json::{Map, Value, json};
use tokio::time::sleep;

use super::error::GenerationError;
use super::response::request_json_response;
use crate::dedup::DistractorSource;
use crate::wordlist::WordPair;

const DISTRACTORS_MODEL: &str = "gpt-5-nano";

/// Temperature for the first generation call per word. Regeneration calls
/// run hotter, see `dedup::REGENERATION_TEMPERATURE`.
pub const GENERATION_TEMPERATURE: f32 = 0.8;

const GENERATION_ATTEMPTS: usize = 3;
const API_RETRY_BACKOFF: Duration = Duration::from_secs(20);

const SYSTEM_PROMPT: &str = r#"
Act as a language learning test generator. You need to create a set of distractors for an input word.

A distractor is:
1. A thematically related word (or phrase)
2. Not a synonym of the given word (and does not contain a synonym of the given word)
3. The same part of speech as the given word
4. Not the right translation of the given word
5. Given in the target language (this is very important)

Don't add the source-language translation to a distractor, e.g. "собака (dog)".
Good distractor: "собака", bad distractor: "собака (dog)".

Very important: all output distractors must be in the target language, and they all must be different from each other.
Also make sure that all distractors are thematically related to each other and to the given word.

First determine the theme of the given word. Then generate distractors based on the theme, as a valid json object.

Example user input: {"word": "cat", "translation": "кошка", "target_language": "ru", "source_language": "en", "num_distractors": 3}
Output:
{"theme": "pets (only house pets)", "1": "собака", "2": "хомяк", "3": "кролик"}

Example user input: {"word": "salty", "translation": "соленый", "target_language": "ru", "source_language": "en", "num_distractors": 2}
Output:
{"theme": "tastes or flavors", "1": "сладкий", "2": "горький"}

Example user input: {"word": "jeans", "translation": "джинсы", "target_language": "ru", "source_language": "en", "num_distractors": 4}
Output:
{"theme": "types of clothing", "1": "юбка", "2": "перчатки", "3": "брюки", "4": "платье"}
"#;

/// Distractors generated for one word pair. Built by the generation client,
/// then thinned out and refilled by the deduplicator.
#[derive(Debug, Clone)]
pub struct DistractorSet {
    pub pair: WordPair,
    pub theme: String,
    pub distractors: Vec<String>,
}

/// The real `DistractorSource`, backed by the OpenAI Responses API.
pub struct OpenAiDistractorSource<'a> {
    client: &'a Client<OpenAIConfig>,
    model: &'static str,
}

impl<'a> OpenAiDistractorSource<'a> {
    pub fn new(client: &'a Client<OpenAIConfig>) -> Self {
        Self {
            client,
            model: DISTRACTORS_MODEL,
        }
    }
}

impl DistractorSource for OpenAiDistractorSource<'_> {
    async fn generate(
        &self,
        pair: &WordPair,
        count: usize,
        temperature: f32,
    ) -> Result<DistractorSet, GenerationError> {
        let user_prompt = request_payload(pair, count);

        let mut last_error =
            GenerationError::MalformedResponse("no response from model".to_string());
        for _ in 0..GENERATION_ATTEMPTS {
            match request_json_response(
                self.client,
                self.model,
                SYSTEM_PROMPT,
                &user_prompt,
                temperature,
            )
            .await
            {
                Ok(map) => match parse_distractor_set(&map, pair) {
                    Ok(set) => return Ok(set),
                    Err(err) => last_error = err,
                },
                Err(err @ GenerationError::MalformedResponse(_)) => last_error = err,
                Err(err @ GenerationError::Api(_)) => {
                    last_error = err;
                    sleep(API_RETRY_BACKOFF).await;
                }
            }
        }

        Err(last_error)
    }
}

fn request_payload(pair: &WordPair, count: usize) -> String {
    json!({
        "word": pair.word,
        "translation": pair.translation,
        "target_language": pair.target_language,
        "source_language": pair.source_language,
        "num_distractors": count,
    })
    .to_string()
}

/// Expected shape: `{"theme": str, "1": str, ..., "<n>": str}`.
/// Distractors keep the model's slot order; extra keys are ignored.
fn parse_distractor_set(
    map: &Map<String, Value>,
    pair: &WordPair,
) -> Result<DistractorSet, GenerationError> {
    let theme = map
        .get("theme")
        .and_then(Value::as_str)
        .ok_or_else(|| GenerationError::MalformedResponse("missing \"theme\" key".to_string()))?
        .to_string();

    let mut slots: Vec<(usize, String)> = Vec::new();
    for (key, value) in map {
        let Ok(slot) = key.parse::<usize>() else {
            continue;
        };
        let Some(text) = value.as_str() else {
            return Err(GenerationError::MalformedResponse(format!(
                "distractor slot {key} is not a string"
            )));
        };
        slots.push((slot, text.to_string()));
    }
    slots.sort_by_key(|(slot, _)| *slot);

    Ok(DistractorSet {
        pair: pair.clone(),
        theme,
        distractors: slots.into_iter().map(|(_, text)| text).collect(),
    })
}
