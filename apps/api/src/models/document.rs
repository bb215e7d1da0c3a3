use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// The full persisted resume. This is the only aggregate written to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub full_name: String,
    pub profession: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub summary: String,
    pub skills: String,
    /// Data URL of the profile photo, if one was uploaded.
    pub profile_photo: Option<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certificates: Vec<Certificate>,
    pub last_updated: DateTime<Utc>,
}

impl Document {
    /// Equality that ignores `last_updated`, which changes on every snapshot.
    pub fn same_content(&self, other: &Document) -> bool {
        Document {
            last_updated: other.last_updated,
            ..self.clone()
        } == *other
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    pub job_title: String,
    pub job_period: String,
    pub company_name: String,
    /// Raw list markup (`<li>…</li>`) as edited by the user.
    #[serde(rename = "jobDescription", alias = "jobDescriptionMarkup")]
    pub job_description_markup: String,
}

impl ExperienceEntry {
    pub const DEFAULT_DESCRIPTION: &'static str = "<li>New responsibility</li>";

    /// Template for a freshly added entry.
    pub fn template() -> Self {
        ExperienceEntry {
            job_description_markup: Self::DEFAULT_DESCRIPTION.to_string(),
            ..Default::default()
        }
    }

    pub fn is_identified(&self) -> bool {
        !self.job_title.trim().is_empty() || !self.company_name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub degree_title: String,
    pub education_period: String,
    pub institution_name: String,
}

impl EducationEntry {
    pub fn is_identified(&self) -> bool {
        !self.degree_title.trim().is_empty() || !self.institution_name.trim().is_empty()
    }
}

/// An uploaded certificate image. Unlike experience/education entries it carries
/// its own identity, independent of position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    /// Data URL of the full-resolution image.
    #[serde(rename = "data", alias = "imageData")]
    pub image_data: String,
    pub name: String,
    #[serde(rename = "uploadDate", alias = "uploadTimestamp")]
    pub uploaded_at: DateTime<Utc>,
}

impl Certificate {
    pub fn new(image_data: String, name: impl Into<String>) -> Self {
        Certificate {
            id: CertificateId::generate(),
            image_data,
            name: name.into(),
            uploaded_at: Utc::now(),
        }
    }
}

/// Certificate identifier: millisecond timestamp followed by random bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    pub fn generate() -> Self {
        CertificateId(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CertificateId {
    fn from(value: &str) -> Self {
        CertificateId(value.to_string())
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Older saves stored ids as floating point numbers; keep their decimal text.
impl<'de> Deserialize<'de> for CertificateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => CertificateId(s),
            RawId::Number(n) => CertificateId(n.to_string()),
        })
    }
}
