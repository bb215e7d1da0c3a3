//! The editable resume: personal fields, experience and education entries and
//! the profile photo, plus conversion to and from the persisted `Document`.

pub mod fields;
pub mod handlers;
pub mod page;

pub use fields::{EducationField, EntryId, ExperienceField, FieldKey};
pub use page::{lock_page, Page, PageError, SharedPage};
