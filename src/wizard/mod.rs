//! Three-step wizard: consent, story details, recording
//!
//! Progress survives restarts through [`WizardStore`].

mod metadata;
mod store;

pub use metadata::{age_on, Consent, MetadataError, StoryMetadata, MINIMUM_AGE};
pub use store::{FileStore, KeyValueStore, MemoryStore, WizardStore, META_KEY, STEP_KEY};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum WizardStep {
    #[default]
    Consent = 0,
    Details = 1,
    Recording = 2,
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step as u8
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WizardStep::Consent),
            1 => Ok(WizardStep::Details),
            2 => Ok(WizardStep::Recording),
            other => Err(format!("unknown wizard step {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
    pub metadata: Option<StoryMetadata>,
}
