use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, InputMessage, InputRole, OutputItem, OutputMessageContent,
    },
};
use serde_json::{Map, Value};

use super::error::GenerationError;

pub async fn request_json_response(
    client: &Client<OpenAIConfig>,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    temperature: f32,
) -> Result<Map<String, Value>, GenerationError> {
    let request = CreateResponseArgs::default()
        .model(model)
        .temperature(temperature)
        .max_output_tokens(2000_u32)
        .input(vec![
            InputMessage {
                role: InputRole::System,
                content: vec![system_prompt.into()],
                status: None,
            },
            InputMessage {
                role: InputRole::User,
                content: vec![user_prompt.into()],
                status: None,
            },
        ])
        .build()?;

    let response = client.responses().create(request).await?;

    for item in response.output {
        if let OutputItem::Message(message) = item {
            for content in message.content {
                if let OutputMessageContent::OutputText(text) = content {
                    let trimmed = text.text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return parse_json_object(trimmed);
                }
            }
        }
    }

    Err(GenerationError::MalformedResponse(
        "no text output returned from model".to_string(),
    ))
}

/// Parses the model output as a JSON object. Models occasionally wrap the
/// object in prose; fall back to the substring between the outermost braces.
pub(crate) fn parse_json_object(text: &str) -> Result<Map<String, Value>, GenerationError> {
    if let Ok(map) = serde_json::from_str::<Map<String, Value>>(text) {
        return Ok(map);
    }

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(GenerationError::MalformedResponse(format!(
            "no JSON object in model output: {text}"
        )));
    };
    if end < start {
        return Err(GenerationError::MalformedResponse(format!(
            "no JSON object in model output: {text}"
        )));
    }

    serde_json::from_str::<Map<String, Value>>(&text[start..=end])
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_object() {
        let map = parse_json_object(r#"{"theme": "pets", "1": "собака"}"#).unwrap();
        assert_eq!(map.get("theme").unwrap(), "pets");
        assert_eq!(map.get("1").unwrap(), "собака");
    }

    #[test]
    fn parses_an_object_wrapped_in_prose() {
        let text = "Sure! Here are your distractors:\n{\"theme\": \"tastes\", \"1\": \"сладкий\"}\nLet me know if you need more.";
        let map = parse_json_object(text).unwrap();
        assert_eq!(map.get("theme").unwrap(), "tastes");
    }

    #[test]
    fn rejects_output_without_an_object() {
        let err = parse_json_object("I could not help with that.").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_mismatched_braces() {
        let err = parse_json_object("} oops {").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_invalid_json_between_braces() {
        let err = parse_json_object("{not json at all}").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }
}
