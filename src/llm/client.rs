use anyhow::{Context, Result, bail};

use async_openai::{Client, config::OpenAIConfig};

use super::secrets::{
    API_KEY_ENV, ApiKeySource, get_api_key_from_sources, prompt_for_api_key, store_api_key,
};
use crate::utils::ask_yn;

/// Finds an API key (env var, auth file, or an interactive prompt) and
/// confirms with the user before any generation calls are made.
pub fn ensure_client(user_prompt: &str) -> Result<Client<OpenAIConfig>> {
    let lookup = get_api_key_from_sources()?;
    let (key, prompted_for_key) = if let Some(api_key) = lookup.api_key {
        (api_key, false)
    } else {
        let api_key = prompt_for_api_key(user_prompt)?;
        if api_key.is_empty() {
            bail!(
                "No API key provided. Set {} or run `generate_distractors key --set <KEY>`.",
                API_KEY_ENV
            );
        }

        store_api_key(&api_key)?;

        (api_key, true)
    };

    // If we didn't prompt for the API key (it already existed), confirm with the user
    if !prompted_for_key {
        let ok = ask_yn(user_prompt.to_string());
        if !ok {
            bail!("Generation cancelled.");
        }
    }

    Ok(initialize_client(&key))
}

pub async fn test_configured_api_key() -> Result<ApiKeySource> {
    let lookup = get_api_key_from_sources()?;
    let (Some(key), Some(source)) = (lookup.api_key, lookup.source) else {
        bail!(
            "No API key configured. Set {} or run `generate_distractors key --set <KEY>`.",
            API_KEY_ENV
        );
    };
    let client = initialize_client(&key);
    healthcheck_client(&client).await?;
    Ok(source)
}

fn initialize_client(api_key: &str) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new().with_api_key(api_key);
    Client::with_config(config)
}

async fn healthcheck_client(client: &Client<OpenAIConfig>) -> Result<()> {
    client
        .models()
        .list()
        .await
        .context("Failed to validate API key with OpenAI")?;
    Ok(())
}
