use anyhow::{Context, Result, bail};

pub const DEFAULT_HOST: &str = "pub400.com";
pub const DEFAULT_PORT: u16 = 2222;
pub const DEFAULT_LIBRARY: &str = "QGPL";
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:7b-instruct";

const MAX_SYSTEM_NAME_LEN: usize = 10;

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub library: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("library", &self.library)
            .field("ollama_url", &self.ollama_url)
            .field("ollama_model", &self.ollama_model)
            .finish()
    }
}

impl Settings {
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

/// Values given on the command line; each one beats its environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub library: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
}

pub fn settings_from_env(overrides: &SettingsOverrides) -> Result<Settings> {
    resolve_settings(|key| std::env::var(key).ok(), overrides)
}

pub fn resolve_settings<F>(lookup: F, overrides: &SettingsOverrides) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let host = overrides
        .host
        .clone()
        .or_else(|| env("IBMI_HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match (overrides.port, env("IBMI_PORT")) {
        (Some(port), _) => port,
        (None, Some(raw)) => raw
            .parse::<u16>()
            .with_context(|| format!("IBMI_PORT must be a port number: {raw}"))?,
        (None, None) => DEFAULT_PORT,
    };
    if port == 0 {
        bail!("port must be non-zero");
    }

    let library = overrides
        .library
        .clone()
        .or_else(|| env("IBMI_LIBRARY"))
        .unwrap_or_else(|| DEFAULT_LIBRARY.to_string());
    let library = normalize_system_name(&library)?;

    let ollama_url = overrides
        .ollama_url
        .clone()
        .or_else(|| env("OLLAMA_URL"))
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    let ollama_url = normalize_base_url(&ollama_url)?;

    Ok(Settings {
        host,
        port,
        user: overrides
            .user
            .clone()
            .or_else(|| env("IBMI_USER"))
            .unwrap_or_default(),
        password: lookup("IBMI_PASSWORD").unwrap_or_default(),
        library,
        ollama_url,
        ollama_model: overrides
            .ollama_model
            .clone()
            .or_else(|| env("OLLAMA_MODEL"))
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
    })
}

/// Uppercases and checks an IBM i object name (library or file).
pub fn normalize_system_name(raw: &str) -> Result<String> {
    let name = raw.trim().to_ascii_uppercase();
    if name.is_empty() || name.len() > MAX_SYSTEM_NAME_LEN {
        bail!("library must be 1-{MAX_SYSTEM_NAME_LEN} characters: {raw:?}");
    }
    let valid_chars = name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '#' | '$' | '@'));
    let starts_with_digit = name.starts_with(|ch: char| ch.is_ascii_digit());
    if !valid_chars || starts_with_digit {
        bail!("library is not a valid system name: {raw:?}");
    }
    Ok(name)
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("ollama url must start with http:// or https://: {raw}");
    }
    Ok(url.to_string())
}
