use crate::utils::error::{ClosureError, Result};
use serde::Deserialize;
use std::path::Path;

/// The From/Bcc/Subject/Body fragments for one notification tier. Each is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTier {
    pub from: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl TemplateTier {
    /// Applies `substitute` to the subject and body, leaving addresses untouched.
    pub fn map_text(&self, substitute: impl Fn(&str) -> String) -> Self {
        Self {
            from: self.from.clone(),
            bcc: self.bcc.clone(),
            subject: self.subject.as_deref().map(&substitute),
            body: self.body.as_deref().map(&substitute),
        }
    }
}

/// Subscriber email template with a standard and an official tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailTemplate {
    pub standard: TemplateTier,
    pub official: TemplateTier,
}

#[derive(Debug, Deserialize)]
struct TemplateXml {
    #[serde(rename = "Email", default)]
    emails: Vec<EmailXml>,
}

#[derive(Debug, Deserialize)]
struct EmailXml {
    #[serde(rename = "@OfficialNotification", default)]
    official_notification: Option<String>,
    #[serde(rename = "From", default)]
    from: Option<String>,
    #[serde(rename = "Bcc", default)]
    bcc: Option<String>,
    #[serde(rename = "Subject", default)]
    subject: Option<String>,
    #[serde(rename = "Body", default)]
    body: Option<String>,
}

impl EmailXml {
    fn into_tier(self) -> TemplateTier {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        TemplateTier {
            from: present(self.from).map(|v| v.trim().to_string()),
            bcc: present(self.bcc).map(|v| v.trim().to_string()),
            subject: present(self.subject),
            body: present(self.body),
        }
    }
}

impl EmailTemplate {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClosureError::template(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_xml_str(&content)
    }

    pub fn from_xml_str(content: &str) -> Result<Self> {
        if !content.contains("<EmailTemplate") {
            return Err(ClosureError::template("root element EmailTemplate not found"));
        }

        let parsed: TemplateXml = quick_xml::de::from_str(content)
            .map_err(|e| ClosureError::template(format!("XML parsing error: {}", e)))?;

        let mut standard = None;
        let mut official = None;
        for email in parsed.emails {
            let slot = match email.official_notification.as_deref().map(str::trim) {
                Some("false") => &mut standard,
                Some("true") => &mut official,
                _ => continue,
            };
            // The first matching Email element wins.
            if slot.is_none() {
                *slot = Some(email.into_tier());
            }
        }

        Ok(Self {
            standard: standard.unwrap_or_default(),
            official: official.unwrap_or_default(),
        })
    }

    pub fn tier(&self, official: bool) -> &TemplateTier {
        if official {
            &self.official
        } else {
            &self.standard
        }
    }
}
