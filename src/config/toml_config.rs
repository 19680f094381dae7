use crate::adapters::file::{FileDataSource, FileRepository};
use crate::core::notify::{SubscriberNotice, SubscriberNoticeBuilder};
use crate::core::query::DEFAULT_CUTOFF_HOUR;
use crate::core::ServiceType;
use crate::utils::error::{ClosureError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub notifications: NotificationConfig,
    pub smtp: Option<SmtpConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub xml_folder: String,
    pub namespace: Option<String>,
    pub service_type: Option<String>,
    pub service_type_plural: Option<String>,
    pub write_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub moderator_from: String,
    pub template_file: Option<String>,
    pub report_closure_url: Option<String>,
    pub unsubscribe_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Used when a template tier has no From address.
    pub default_from: String,
}

fn default_smtp_port() -> u16 {
    25
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_smtp_port(),
            user: String::new(),
            password: String::new(),
            default_from: "closures@localhost.localdomain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub cutoff_hour: Option<u32>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClosureError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ClosureError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("data.xml_folder", &self.data.xml_folder)?;
        if let Some(attempts) = self.data.write_attempts {
            validation::validate_positive_number("data.write_attempts", attempts.into(), 1)?;
        }
        self.service_type().file_name()?;

        validation::validate_email_address(
            "notifications.moderator_from",
            &self.notifications.moderator_from,
        )?;
        if let Some(template) = &self.notifications.template_file {
            validation::validate_path("notifications.template_file", template)?;
        }
        if let Some(url) = &self.notifications.report_closure_url {
            validation::validate_url("notifications.report_closure_url", url)?;
        }
        if let Some(url) = &self.notifications.unsubscribe_url {
            validation::validate_url("notifications.unsubscribe_url", url)?;
            if url.matches("{0}").count() != 1 {
                return Err(ClosureError::InvalidConfigValueError {
                    field: "notifications.unsubscribe_url".to_string(),
                    value: url.clone(),
                    reason: "Must contain exactly one {0} placeholder".to_string(),
                });
            }
        }

        if let Some(smtp) = &self.smtp {
            validation::validate_non_empty_string("smtp.host", &smtp.host)?;
            validation::validate_positive_number("smtp.port", smtp.port.into(), 1)?;
            validation::validate_email_address("smtp.default_from", &smtp.default_from)?;
        }

        validation::validate_range("display.cutoff_hour", self.cutoff_hour(), 0, 23)?;
        Ok(())
    }

    pub fn service_type(&self) -> ServiceType {
        let defaults = ServiceType::default();
        ServiceType::new(
            self.data
                .service_type
                .clone()
                .unwrap_or(defaults.singular_text),
            self.data
                .service_type_plural
                .clone()
                .unwrap_or(defaults.plural_text),
        )
    }

    pub fn namespace(&self) -> &str {
        self.data.namespace.as_deref().unwrap_or("")
    }

    pub fn write_attempts(&self) -> u32 {
        self.data
            .write_attempts
            .unwrap_or(crate::adapters::file::DEFAULT_WRITE_ATTEMPTS)
    }

    pub fn retry_delay(&self) -> Duration {
        self.data
            .retry_delay_seconds
            .map(Duration::from_secs)
            .unwrap_or(crate::adapters::file::DEFAULT_RETRY_DELAY)
    }

    pub fn data_source(&self) -> FileDataSource {
        FileDataSource::new(&self.data.xml_folder)
    }

    pub fn repository(&self) -> FileRepository {
        FileRepository::new(&self.data.xml_folder, self.namespace())
            .with_retry(self.write_attempts(), self.retry_delay())
    }

    /// A subscriber notice builder carrying the configured template and URLs;
    /// the caller adds the service, closure and subscriptions.
    pub fn notice_builder<'a>(&self) -> Result<SubscriberNoticeBuilder<'a>> {
        let template = validation::validate_required_field(
            "notifications.template_file",
            &self.notifications.template_file,
        )?;
        let mut builder = SubscriberNotice::builder().template_file(template);

        if let Some(url) = &self.notifications.report_closure_url {
            let parsed = Url::parse(url).map_err(|e| ClosureError::InvalidConfigValueError {
                field: "notifications.report_closure_url".to_string(),
                value: url.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.report_closure_url(parsed);
        }
        if let Some(url) = &self.notifications.unsubscribe_url {
            builder = builder.unsubscribe_url(url.clone());
        }
        Ok(builder)
    }

    pub fn smtp(&self) -> Result<&SmtpConfig> {
        validation::validate_required_field("smtp", &self.smtp)
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.display
            .as_ref()
            .and_then(|d| d.cutoff_hour)
            .unwrap_or(DEFAULT_CUTOFF_HOUR)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
