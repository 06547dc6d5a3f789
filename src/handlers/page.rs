//! Gallery page model and HTML rendering.

use crate::models::object_name::ObjectName;

/// Everything one render of `/` shows. Upload and listing outcomes are
/// independent: either can fail without hiding the other.
#[derive(Debug, Default)]
pub struct GalleryPage {
    pub upload_status: Option<String>,
    pub upload_error: Option<String>,
    pub photos: Vec<ObjectName>,
    pub error: Option<String>,
}

impl GalleryPage {
    pub fn render(&self) -> String {
        let mut html = String::from(concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
            "<title>Photo gallery</title></head><body>",
            "<h1>Photo gallery</h1>",
            "<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">",
            "<input type=\"file\" name=\"photo\" accept=\"image/*\">",
            "<button type=\"submit\">Upload</button>",
            "</form>"
        ));

        if let Some(status) = &self.upload_status {
            html.push_str(&format!("<p class=\"upload-status\">{}</p>", html_escape(status)));
        }
        if let Some(err) = &self.upload_error {
            html.push_str(&format!("<p class=\"upload-error\">{}</p>", html_escape(err)));
        }

        if let Some(err) = &self.error {
            html.push_str(&format!("<p class=\"error\">{}</p>", html_escape(err)));
        } else {
            html.push_str("<ul class=\"photos\">");
            for photo in &self.photos {
                let href = format!("/show?name={}", urlencoding::encode(photo.as_str()));
                html.push_str(&format!(
                    "<li><a href=\"{href}\"><img src=\"{href}\" alt=\"{alt}\" width=\"200\"></a><br>{alt}</li>",
                    href = html_escape(&href),
                    alt = html_escape(photo.as_str()),
                ));
            }
            html.push_str("</ul>");
        }

        html.push_str("</body></html>");
        html
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
