use chrono::NaiveDate;

pub const FALLBACK_NAME: &str = "CV";
pub const EXTENSION: &str = "pdf";

/// `<Name>_<YYYY-MM-DD>.pdf`, keeping only ASCII letters, digits and
/// whitespace from the trimmed name and turning each whitespace run into one
/// underscore. Runs left at the edges by removed symbols are kept.
pub fn export_file_name(full_name: &str, date: NaiveDate) -> String {
    let mut clean = String::with_capacity(full_name.len());
    let mut in_space = false;
    for c in full_name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                clean.push('_');
            }
            in_space = true;
        } else if c.is_ascii_alphanumeric() {
            clean.push(c);
            in_space = false;
        }
    }
    let name = if clean.is_empty() {
        FALLBACK_NAME
    } else {
        clean.as_str()
    };
    format!("{name}_{}.{EXTENSION}", date.format("%Y-%m-%d"))
}
