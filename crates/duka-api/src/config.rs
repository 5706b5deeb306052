//! Environment-backed application configuration.
//!
//! All credentials are injected at startup and validated eagerly: a missing
//! gateway variable aborts boot with every missing name listed, rather than
//! degrading into a malformed outbound request at the first checkout.
//!
//! Notification channels are optional *as a group*: a channel with none of
//! its variables set is simply not configured (the shop may not use chat),
//! but a channel with some-but-not-all variables set is a configuration
//! error — that is always a typo, never an intent.

use duka_core::Msisdn;
use duka_gateway::GatewayConfig;

/// Configuration errors; fatal at startup, surfaced to the operator.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more required variables are absent.
    #[error("missing required configuration: {}", vars.join(", "))]
    Missing { vars: Vec<String> },

    /// A channel is configured halfway.
    #[error("partial {channel} channel configuration: set all of {}, or none", vars.join(", "))]
    PartialChannel {
        channel: &'static str,
        vars: Vec<String>,
    },

    /// A variable is present but unusable.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Email channel settings (all-or-nothing group).
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub from_email: String,
}

/// Chat channel settings (all-or-nothing group).
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub token: String,
    pub phone_id: String,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Brand display name used in notifications and invoices.
    pub brand_name: String,
    /// Account reference shown on the payer's STK prompt.
    pub account_reference: String,
    pub gateway: GatewayConfig,
    pub email: Option<EmailSettings>,
    pub chat: Option<ChatSettings>,
    /// Owner notification addresses; either may be absent.
    pub owner_email: Option<String>,
    pub owner_phone: Option<Msisdn>,
}

impl AppConfig {
    /// Load configuration from the environment, failing fast with every
    /// missing required variable named.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut required = |name: &str| -> String {
            match std::env::var(name) {
                Ok(v) if !v.trim().is_empty() => v,
                _ => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let base_url = std::env::var("MPESA_BASE_URL")
            .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string());
        let consumer_key = required("MPESA_CONSUMER_KEY");
        let consumer_secret = required("MPESA_CONSUMER_SECRET");
        let shortcode = required("MPESA_SHORTCODE");
        let passkey = required("MPESA_PASSKEY");
        let callback_url = required("MPESA_CALLBACK_URL");

        if !missing.is_empty() {
            return Err(ConfigError::Missing { vars: missing });
        }

        let port = match std::env::var("DUKA_PORT") {
            Err(_) => 8080,
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "DUKA_PORT".to_string(),
                reason: format!("not a port number: {raw}"),
            })?,
        };

        let brand_name =
            std::env::var("BRAND_NAME").unwrap_or_else(|_| "Duka Pay".to_string());

        let email = channel_group(
            "email",
            &[("SENDGRID_API_KEY", "api_key"), ("SENDGRID_FROM", "from")],
        )?
        .map(|mut vals| EmailSettings {
            api_key: vals.remove(0),
            from_email: vals.remove(0),
        });

        let chat = channel_group(
            "chat",
            &[("WHATSAPP_TOKEN", "token"), ("WHATSAPP_PHONE_ID", "phone_id")],
        )?
        .map(|mut vals| ChatSettings {
            token: vals.remove(0),
            phone_id: vals.remove(0),
        });

        let owner_email = std::env::var("OWNER_EMAIL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| email.as_ref().map(|e| e.from_email.clone()));

        let owner_phone = match std::env::var("OWNER_WHATSAPP") {
            Err(_) => None,
            Ok(raw) => Some(Msisdn::new(&raw).map_err(|e| ConfigError::Invalid {
                var: "OWNER_WHATSAPP".to_string(),
                reason: e.to_string(),
            })?),
        };

        let gateway = GatewayConfig::new(
            base_url,
            consumer_key,
            consumer_secret,
            shortcode,
            passkey,
            callback_url,
        );

        Ok(Self {
            port,
            account_reference: brand_name.clone(),
            brand_name,
            gateway,
            email,
            chat,
            owner_email,
            owner_phone,
        })
    }
}

/// Read an all-or-nothing variable group. `None` when every variable is
/// absent; the values in declaration order when all are present.
fn channel_group(
    channel: &'static str,
    vars: &[(&str, &str)],
) -> Result<Option<Vec<String>>, ConfigError> {
    let values: Vec<Option<String>> = vars
        .iter()
        .map(|(name, _)| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .collect();

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    if values.iter().any(Option::is_none) {
        return Err(ConfigError::PartialChannel {
            channel,
            vars: vars.iter().map(|(name, _)| name.to_string()).collect(),
        });
    }
    Ok(Some(values.into_iter().flatten().collect()))
}
