use std::time::Duration;

use anyhow::{Context, Result};
use peppol_gw_core::{Environment, ProviderIdentity};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "peppol-gateway";
const KEYCHAIN_SERVICE: &str = "peppol.gateway.credentials";

/// Gateway configuration: per-provider base URLs (sandbox vs production),
/// credentials, and the default request timeout.
///
/// Loaded once from a confy-backed file, then overridden by `PEPPOL_GW_*`
/// environment variables. Credential resolution order is environment
/// variable (already folded into the struct by [`apply_env_overrides`]),
/// then config file, then OS keychain. The struct is injected explicitly
/// into the connection factory; nothing in the gateway reads ambient
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default)]
    pub storecove: StoreCoveSettings,
    #[serde(default)]
    pub lets_peppol: LetsPeppolSettings,
    #[serde(default)]
    pub peppyrus: PeppyrusSettings,
    #[serde(default)]
    pub einvoicing_be: EInvoicingBeSettings,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            default_timeout_secs: default_timeout_secs(),
            storecove: StoreCoveSettings::default(),
            lets_peppol: LetsPeppolSettings::default(),
            peppyrus: PeppyrusSettings::default(),
            einvoicing_be: EInvoicingBeSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCoveSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LetsPeppolSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeppyrusSettings {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EInvoicingBeSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub api_key: Option<String>,
}

impl GatewayConfig {
    /// Resolved API base URL for a provider: explicit override if
    /// configured, otherwise the provider's default for the configured
    /// environment.
    pub fn base_url(&self, provider: ProviderIdentity) -> String {
        let override_url = match provider {
            ProviderIdentity::StoreCove => &self.storecove.base_url,
            ProviderIdentity::LetsPeppol => &self.lets_peppol.base_url,
            ProviderIdentity::Peppyrus => &self.peppyrus.base_url,
            ProviderIdentity::EInvoicingBe => &self.einvoicing_be.base_url,
        };
        override_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url(self.environment).to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn storecove_api_key(&self) -> Option<String> {
        resolve_secret(&self.storecove.api_key, "storecove_api_key")
    }

    pub fn lets_peppol_api_key(&self) -> Option<String> {
        resolve_secret(&self.lets_peppol.api_key, "letspeppol_api_key")
    }

    pub fn peppyrus_client_credentials(&self) -> Option<(String, String)> {
        let client_id = resolve_secret(&self.peppyrus.client_id, "peppyrus_client_id")?;
        let client_secret = resolve_secret(&self.peppyrus.client_secret, "peppyrus_client_secret")?;
        Some((client_id, client_secret))
    }

    pub fn einvoicing_be_credentials(&self) -> Option<(String, String)> {
        let token = resolve_secret(&self.einvoicing_be.token, "einvoicingbe_token")?;
        let api_key = resolve_secret(&self.einvoicing_be.api_key, "einvoicingbe_api_key")?;
        Some((token, api_key))
    }
}

/// Config field first, OS keychain as fallback. Environment variables have
/// already been folded into the config fields by [`apply_env_overrides`].
fn resolve_secret(configured: &Option<String>, keychain_key: &str) -> Option<String> {
    if let Some(value) = configured {
        if !value.is_empty() {
            return Some(value.clone());
        }
    }
    get_secret(keychain_key).ok()
}

pub fn load() -> Result<GatewayConfig> {
    let cfg: GatewayConfig = confy::load(APP_NAME, None).context("Failed to load gateway config")?;
    Ok(cfg)
}

pub fn store(cfg: &GatewayConfig) -> Result<()> {
    confy::store(APP_NAME, None, cfg).context("Failed to store gateway config")?;
    Ok(())
}

/// Load the config file and fold in `PEPPOL_GW_*` environment overrides.
pub fn load_with_env() -> Result<GatewayConfig> {
    let mut cfg = load()?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub fn apply_env_overrides(cfg: &mut GatewayConfig) {
    if let Ok(env) = std::env::var("PEPPOL_GW_ENVIRONMENT") {
        cfg.environment = match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Sandbox,
        };
    }
    if let Ok(secs) = std::env::var("PEPPOL_GW_DEFAULT_TIMEOUT_SECS") {
        if let Ok(parsed) = secs.parse() {
            cfg.default_timeout_secs = parsed;
        }
    }

    override_from_env(&mut cfg.storecove.base_url, "PEPPOL_GW_STORECOVE_BASE_URL");
    override_from_env(&mut cfg.storecove.api_key, "PEPPOL_GW_STORECOVE_API_KEY");
    override_from_env(
        &mut cfg.lets_peppol.base_url,
        "PEPPOL_GW_LETSPEPPOL_BASE_URL",
    );
    override_from_env(&mut cfg.lets_peppol.api_key, "PEPPOL_GW_LETSPEPPOL_API_KEY");
    override_from_env(&mut cfg.peppyrus.base_url, "PEPPOL_GW_PEPPYRUS_BASE_URL");
    override_from_env(&mut cfg.peppyrus.client_id, "PEPPOL_GW_PEPPYRUS_CLIENT_ID");
    override_from_env(
        &mut cfg.peppyrus.client_secret,
        "PEPPOL_GW_PEPPYRUS_CLIENT_SECRET",
    );
    override_from_env(
        &mut cfg.einvoicing_be.base_url,
        "PEPPOL_GW_EINVOICINGBE_BASE_URL",
    );
    override_from_env(&mut cfg.einvoicing_be.token, "PEPPOL_GW_EINVOICINGBE_TOKEN");
    override_from_env(
        &mut cfg.einvoicing_be.api_key,
        "PEPPOL_GW_EINVOICINGBE_API_KEY",
    );
}

fn override_from_env(slot: &mut Option<String>, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *slot = Some(value);
        }
    }
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Delete a secret from the OS keychain
pub fn delete_secret(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.delete_password()?;
    Ok(())
}
