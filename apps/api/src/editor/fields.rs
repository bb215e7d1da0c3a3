use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The plain-text personal fields of the resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    FullName,
    Profession,
    Email,
    Phone,
    Location,
    Website,
    Summary,
    Skills,
}

impl FieldKey {
    pub const ALL: [FieldKey; 8] = [
        FieldKey::FullName,
        FieldKey::Profession,
        FieldKey::Email,
        FieldKey::Phone,
        FieldKey::Location,
        FieldKey::Website,
        FieldKey::Summary,
        FieldKey::Skills,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::FullName => "fullName",
            FieldKey::Profession => "profession",
            FieldKey::Email => "email",
            FieldKey::Phone => "phone",
            FieldKey::Location => "location",
            FieldKey::Website => "website",
            FieldKey::Summary => "summary",
            FieldKey::Skills => "skills",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            FieldKey::FullName => "Your Name",
            FieldKey::Profession => "Your Profession",
            FieldKey::Email => "email@example.com",
            FieldKey::Phone => "+1 234 567 890",
            FieldKey::Location => "City, Country",
            FieldKey::Website => "www.yourwebsite.com",
            FieldKey::Summary => "Write a short professional summary...",
            FieldKey::Skills => "JavaScript, Python, Project Management...",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown field '{s}'"))
    }
}

/// Sub-fields of an experience entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExperienceField {
    JobTitle,
    JobPeriod,
    CompanyName,
    JobDescription,
}

impl ExperienceField {
    pub fn placeholder(self) -> &'static str {
        match self {
            ExperienceField::JobTitle => "Job Title",
            ExperienceField::JobPeriod => "2020 - Present",
            ExperienceField::CompanyName => "Company Name",
            ExperienceField::JobDescription => "• Describe your responsibilities and achievements...",
        }
    }
}

/// Sub-fields of an education entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EducationField {
    DegreeTitle,
    EducationPeriod,
    InstitutionName,
}

impl EducationField {
    pub fn placeholder(self) -> &'static str {
        match self {
            EducationField::DegreeTitle => "Degree",
            EducationField::EducationPeriod => "2015 - 2019",
            EducationField::InstitutionName => "Institution",
        }
    }
}

/// Identity of an experience or education entry while it is being edited.
/// Not persisted: stored documents keep these entries positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(EntryId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_round_trips_through_str() {
        for key in FieldKey::ALL {
            assert_eq!(key.as_str().parse::<FieldKey>().unwrap(), key);
        }
        assert!("photo".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_field_key_matches_serde_name() {
        let json = serde_json::to_string(&FieldKey::FullName).unwrap();
        assert_eq!(json, "\"fullName\"");
    }
}
