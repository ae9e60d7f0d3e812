use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::{Password, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};

use crate::palette::Palette;
use crate::utils::get_data_dir;
use crate::utils::strip_controls_and_escapes;
use crate::utils::trim_line;

pub const API_KEY_ENV: &str = "DISTRACTORS_OPENAI_API_KEY";

const AUTH_FILE_NAME: &str = "auth.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment,
    AuthFile,
}

impl ApiKeySource {
    pub fn description(&self) -> &'static str {
        match self {
            ApiKeySource::Environment => "environment variable",
            ApiKeySource::AuthFile => "local auth file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AuthFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    openai_api_key: Option<String>,
}

#[derive(Debug)]
pub struct ApiKeyLookup {
    pub api_key: Option<String>,
    pub source: Option<ApiKeySource>,
}

#[cfg(test)]
const TEST_AUTH_PATH_ENV: &str = "DISTRACTORS_TEST_AUTH_PATH";

pub fn store_api_key(api_key: &str) -> Result<()> {
    let trimmed = trim_line(api_key).with_context(|| "Cannot store an empty API key")?;

    let auth_path = auth_file_path()?;
    let auth = AuthFile {
        openai_api_key: Some(trimmed.to_string()),
    };

    let contents = serde_json::to_string_pretty(&auth)?;
    fs::write(&auth_path, format!("{}\n", contents))
        .with_context(|| format!("Failed to write auth file at {}", auth_path.display()))?;
    Ok(())
}

pub fn clear_api_key() -> Result<bool> {
    let auth_path = auth_file_path()?;
    let Some(auth) = read_auth_file(&auth_path)? else {
        return Ok(false);
    };

    if auth.openai_api_key.is_none() {
        return Ok(false);
    }

    fs::remove_file(&auth_path)
        .with_context(|| format!("Failed to remove auth file at {}", auth_path.display()))?;
    Ok(true)
}

pub fn get_api_key_from_sources() -> Result<ApiKeyLookup> {
    // 1. Environment variable
    if let Ok(value) = env::var(API_KEY_ENV)
        && !value.trim().is_empty()
    {
        return Ok(ApiKeyLookup {
            api_key: Some(value),
            source: Some(ApiKeySource::Environment),
        });
    }

    // 2. Auth file
    let auth_path = auth_file_path()?;
    let key = read_auth_file(&auth_path)?
        .and_then(|auth| auth.openai_api_key)
        .as_deref()
        .and_then(trim_line)
        .map(str::to_string);

    if let Some(api_key) = key {
        return Ok(ApiKeyLookup {
            api_key: Some(api_key),
            source: Some(ApiKeySource::AuthFile),
        });
    }

    Ok(ApiKeyLookup {
        api_key: None,
        source: None,
    })
}

pub fn prompt_for_api_key(prompt: &str) -> Result<String> {
    println!("\n{}", prompt);
    println!(
        "{} (https://platform.openai.com/account/api-keys). It's stored locally for future runs.",
        Palette::paint(Palette::SUCCESS, "Enter your OpenAI API key")
    );
    println!(
        "{}",
        Palette::dim("Leave the field blank to abort without storing anything.")
    );
    let raw_password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API Key")
        .allow_empty_password(true)
        .interact()?;

    let password = strip_controls_and_escapes(&raw_password);
    Ok(password.trim().to_string())
}

fn auth_file_path() -> Result<PathBuf> {
    #[cfg(test)]
    {
        if let Ok(path) = env::var(TEST_AUTH_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
    }

    let data_dir = get_data_dir()?;
    Ok(data_dir.join(AUTH_FILE_NAME))
}

fn read_auth_file(path: &Path) -> Result<Option<AuthFile>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            if contents.trim().is_empty() {
                return Ok(Some(AuthFile::default()));
            }
            let parsed: AuthFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse auth file at {}", path.display()))?;
            Ok(Some(parsed))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read auth file at {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_doesnt_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let missing = read_auth_file(&path).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn empty_contents_parse_as_no_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "   \n").unwrap();

        let auth = read_auth_file(&path).unwrap().unwrap();
        assert!(auth.openai_api_key.is_none());
    }

    // One test owns the auth-path override: the env var is process-wide.
    #[test]
    fn auth_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");

        unsafe {
            env::set_var(TEST_AUTH_PATH_ENV, &path);
        }

        // Nothing stored yet
        let lookup = get_api_key_from_sources().unwrap();
        assert!(lookup.api_key.is_none());
        assert!(lookup.source.is_none());
        assert!(!clear_api_key().unwrap());

        // Store, overwrite, look up
        store_api_key("fake_key").unwrap();
        store_api_key("  real_key \n").unwrap();

        let lookup = get_api_key_from_sources().unwrap();
        assert_eq!(lookup.api_key.unwrap(), "real_key");
        assert_eq!(lookup.source, Some(ApiKeySource::AuthFile));

        // Clear
        assert!(clear_api_key().unwrap());
        let lookup = get_api_key_from_sources().unwrap();
        assert!(lookup.api_key.is_none());
    }

    #[test]
    fn storing_empty_key_is_an_error() {
        assert!(store_api_key("   ").is_err());
    }
}
