use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TITLE: &str = "Запись";

/// A visitor's booking submission, relayed to the site operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    pub title: Option<String>,
    /// `YYYY-MM-DD`.
    pub day: Option<String>,
    /// `HH:MM`.
    pub time: Option<String>,
    pub contact: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    /// Page the form was submitted from.
    pub page_url: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingRequestError {
    #[error("Missing day/time")]
    MissingDayTime,
    #[error("Missing contact")]
    MissingContact,
}

impl BookingRequest {
    /// Render the operator notification as Telegram-flavored HTML.
    pub fn to_message(&self) -> Result<String, BookingRequestError> {
        let (Some(day), Some(time)) = (present(&self.day), present(&self.time)) else {
            return Err(BookingRequestError::MissingDayTime);
        };
        let contact = present(&self.contact).ok_or(BookingRequestError::MissingContact)?;
        let title = present(&self.title).unwrap_or(DEFAULT_TITLE);

        let mut lines = vec![
            format!("🗓️ <b>{}</b>", escape_html(title)),
            format!("Дата/время: <b>{} {}</b>", escape_html(day), escape_html(time)),
        ];
        if let Some(name) = present(&self.name) {
            lines.push(format!("Имя: <b>{}</b>", escape_html(name)));
        }
        lines.push(format!("Контакт: <b>{}</b>", escape_html(contact)));
        if let Some(comment) = present(&self.comment) {
            lines.push(format!("Комментарий: {}", escape_html(comment)));
        }
        if let Some(page_url) = present(&self.page_url) {
            lines.push(format!("Страница: {}", escape_html(page_url)));
        }
        Ok(lines.join("\n"))
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
