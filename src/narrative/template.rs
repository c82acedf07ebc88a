//! Typed placeholder substitution and number formatting for rendered sentences.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{${0}}}'")]
    UnknownPlaceholder(String),

    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
}

/// Named values for the `{$valore}`, `{$dipendenza}` and `{$tempo}` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParams {
    pub valore: String,
    pub dipendenza: String,
    pub tempo: String,
}

impl TemplateParams {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "valore" => Some(&self.valore),
            "dipendenza" => Some(&self.dipendenza),
            "tempo" => Some(&self.tempo),
            _ => None,
        }
    }
}

/// Replaces every `{$name}` in `template`.
///
/// A placeholder that is not a field of `TemplateParams`, or one left open, is an error
/// instead of being copied through unchanged.
pub fn render_template(template: &str, params: &TemplateParams) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{$") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or(TemplateError::Unterminated(offset + start))?;
        let name = after[..end].trim();
        let value = params
            .get(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
        rendered.push_str(value);

        let consumed = start + 2 + end + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

/// Formats with at most `decimals` digits, stripping trailing zeros (`1.50` → `1.5`).
pub fn format_number(value: f64, decimals: usize) -> String {
    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
