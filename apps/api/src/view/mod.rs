//! HTML projection of the page. `GET /` serves it for editing and the
//! exporter hands the `cvContainer` region of it to the rasterizer.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::editor::fields::{EducationField, ExperienceField, FieldKey};
use crate::editor::Page;
use crate::gallery::GalleryState;

pub const RESUME_REGION_ID: &str = "cvContainer";

/// Presentation state of the resume region that capture temporarily changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionState {
    /// Inline style declarations, rendered in key order.
    pub inline_style: BTreeMap<String, String>,
    /// Delete buttons and gallery navigation.
    pub controls_visible: bool,
    pub editable: bool,
}

impl Default for RegionState {
    fn default() -> Self {
        RegionState {
            inline_style: BTreeMap::from([
                ("max-width".to_string(), "210mm".to_string()),
                ("overflow".to_string(), "hidden".to_string()),
            ]),
            controls_visible: true,
            editable: true,
        }
    }
}

impl RegionState {
    pub fn css_text(&self) -> String {
        self.inline_style
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the whole page: toolbar, resume region and modal.
pub fn render_page(page: &Page) -> String {
    let export_label = if page.export_busy {
        "Generating PDF..."
    } else {
        "Export PDF"
    };
    let body_style = if page.modal.scroll_locked() {
        " style=\"overflow: hidden;\""
    } else {
        ""
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Edufolio</title>\n</head>\n");
    let _ = writeln!(html, "<body{body_style}>");
    let _ = writeln!(
        html,
        "<div class=\"toolbar\"><button id=\"exportBtn\"{}>{export_label}</button>\
         <button id=\"clearBtn\">Clear all</button></div>",
        if page.export_busy { " disabled" } else { "" }
    );
    html.push_str(&render_region(page));
    html.push_str(&render_modal(page));
    html.push_str("</body>\n</html>\n");
    html
}

/// Renders only the resume region, as handed to the rasterizer.
pub fn render_region(page: &Page) -> String {
    let region = &page.region;
    let editable = if region.editable { "true" } else { "false" };
    let control_style = if region.controls_visible {
        ""
    } else {
        " style=\"display: none;\""
    };

    let mut html = String::new();
    let _ = writeln!(
        html,
        "<div id=\"{RESUME_REGION_ID}\" style=\"{}\">",
        escape_html(&region.css_text())
    );

    // Header
    html.push_str("<header class=\"cv-header\">\n<div id=\"profilePhotoDisplay\">");
    match page.profile_photo() {
        Some(src) => {
            let _ = write!(html, "<img src=\"{}\" alt=\"Profile photo\">", escape_html(src));
        }
        None => html.push_str("<span class=\"photo-placeholder\">Photo</span>"),
    }
    html.push_str("</div>\n");
    for key in FieldKey::ALL {
        let _ = writeln!(
            html,
            "<div id=\"{}\" class=\"editable\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</div>",
            key.as_str(),
            escape_html(key.placeholder()),
            escape_html(page.field(key))
        );
    }
    html.push_str("</header>\n");

    // Experience
    html.push_str("<section id=\"experienceContainer\">\n");
    for item in page.experience() {
        let e = &item.entry;
        let _ = writeln!(
            html,
            "<div class=\"experience-item\" data-id=\"{}\">\
             <h4 class=\"editable job-title\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</h4>\
             <span class=\"editable job-period\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</span>\
             <h5 class=\"editable company-name\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</h5>\
             <ul class=\"editable job-description\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</ul>\
             </div>",
            item.id,
            ExperienceField::JobTitle.placeholder(),
            escape_html(&e.job_title),
            ExperienceField::JobPeriod.placeholder(),
            escape_html(&e.job_period),
            ExperienceField::CompanyName.placeholder(),
            escape_html(&e.company_name),
            escape_html(ExperienceField::JobDescription.placeholder()),
            // Description is list markup edited in place.
            e.job_description_markup,
        );
    }
    html.push_str("</section>\n");

    // Education
    html.push_str("<section id=\"educationContainer\">\n");
    for item in page.education() {
        let e = &item.entry;
        let _ = writeln!(
            html,
            "<div class=\"education-item\" data-id=\"{}\">\
             <h4 class=\"editable degree-title\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</h4>\
             <span class=\"editable education-period\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</span>\
             <h5 class=\"editable institution-name\" contenteditable=\"{editable}\" placeholder=\"{}\">{}</h5>\
             </div>",
            item.id,
            EducationField::DegreeTitle.placeholder(),
            escape_html(&e.degree_title),
            EducationField::EducationPeriod.placeholder(),
            escape_html(&e.education_period),
            EducationField::InstitutionName.placeholder(),
            escape_html(&e.institution_name),
        );
    }
    html.push_str("</section>\n");

    // Certificates
    let view = page.gallery.view();
    html.push_str("<section class=\"certificates-gallery\">\n");
    match view.state {
        GalleryState::Empty => {
            html.push_str(
                "<div id=\"certificatesDisplay\" class=\"certificates-display empty\">\
                 <div class=\"certificate-placeholder\"><span>Upload your certificates</span></div></div>\n",
            );
        }
        GalleryState::HasItems => {
            html.push_str("<div id=\"certificatesDisplay\" class=\"certificates-display has-items\">\n");
            for cert in view.items {
                let _ = writeln!(
                    html,
                    "<div class=\"certificate-item\" data-id=\"{}\"><img src=\"{}\" alt=\"{}\">\
                     <button class=\"delete-cert\" title=\"Delete certificate\"{control_style}>Delete</button></div>",
                    escape_html(cert.id.as_str()),
                    escape_html(&cert.image_data),
                    escape_html(&cert.name),
                );
            }
            html.push_str("</div>\n");
        }
    }
    let nav_style = if view.navigation.visible && region.controls_visible {
        ""
    } else {
        " style=\"display: none;\""
    };
    let _ = writeln!(
        html,
        "<button id=\"prevCertBtn\" class=\"gallery-nav\"{nav_style}{}>&lsaquo;</button>\
         <button id=\"nextCertBtn\" class=\"gallery-nav\"{nav_style}{}>&rsaquo;</button>\
         <span id=\"certCounter\">{}</span>",
        if view.navigation.previous_enabled { "" } else { " disabled" },
        if view.navigation.next_enabled { "" } else { " disabled" },
        escape_html(view.counter.as_deref().unwrap_or("")),
    );
    html.push_str("</section>\n</div>\n");
    html
}

fn render_modal(page: &Page) -> String {
    match page.modal.state() {
        crate::modal::ModalState::Open { image } => format!(
            "<div id=\"imageModal\" class=\"modal show\"><span class=\"close\">&times;</span>\
             <img id=\"modalImage\" src=\"{}\"></div>\n",
            escape_html(image)
        ),
        crate::modal::ModalState::Closed => {
            "<div id=\"imageModal\" class=\"modal\"><span class=\"close\">&times;</span>\
             <img id=\"modalImage\" src=\"\"></div>\n"
                .to_string()
        }
    }
}
