use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Details collected before recording, forwarded verbatim at submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_title: Option<String>,
    pub anonymous: bool,
    pub transcript: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `YYYY-MM-DD`
    pub birthdate: String,
}

pub const MINIMUM_AGE: i32 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Name is required if not anonymous")]
    NameRequired,

    #[error("Email is required to receive transcript")]
    EmailRequired,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter your birthdate as YYYY-MM-DD")]
    InvalidBirthdate,

    #[error("You must be at least 18 years old")]
    Underage,
}

impl MetadataError {
    pub fn field(&self) -> &'static str {
        match self {
            MetadataError::NameRequired => "name",
            MetadataError::EmailRequired | MetadataError::InvalidEmail => "email",
            MetadataError::InvalidBirthdate | MetadataError::Underage => "birthdate",
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn plausible_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Whole years between `birthdate` and `today`
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

impl StoryMetadata {
    /// Field checks performed by the details form before the hand-off
    pub fn validate(&self, today: NaiveDate) -> Result<(), Vec<MetadataError>> {
        let mut errors = Vec::new();

        if !self.anonymous && is_blank(&self.name) {
            errors.push(MetadataError::NameRequired);
        }

        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !plausible_email(email) {
                errors.push(MetadataError::InvalidEmail);
            }
        } else if self.transcript {
            errors.push(MetadataError::EmailRequired);
        }

        match NaiveDate::parse_from_str(self.birthdate.trim(), "%Y-%m-%d") {
            Ok(birthdate) if age_on(birthdate, today) >= MINIMUM_AGE => {}
            Ok(_) => errors.push(MetadataError::Underage),
            Err(_) => errors.push(MetadataError::InvalidBirthdate),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Drop the email when no transcript was requested, as the form does
    pub fn normalized(mut self) -> Self {
        if !self.transcript {
            self.email = None;
        }
        self
    }
}

/// Consent gate answers
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    pub adult: bool,
    pub terms_accepted: bool,
}

impl Consent {
    pub fn is_granted(&self) -> bool {
        self.adult && self.terms_accepted
    }
}
