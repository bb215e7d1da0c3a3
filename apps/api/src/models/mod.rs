pub mod document;
pub mod upload;

pub use document::{Certificate, CertificateId, Document, EducationEntry, ExperienceEntry};
pub use upload::{ImageKind, Upload, ValidationError};
