//! Template rendering seam.
//!
//! The engine only needs one operation from a template renderer: take a
//! string with `{{ name }}` placeholders and a namespace, produce the
//! substituted string or an error. [`TemplateEngine`] is that seam;
//! [`BraceTemplates`] is the built-in implementation. Richer engines can be
//! plugged in through the same trait.

use crate::value::ValueMap;

/// Errors produced while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder referenced a name absent from the namespace.
    #[error("unknown identifier in template: {0}")]
    UnknownIdentifier(String),

    /// A `{{` without a matching `}}`.
    #[error("unclosed placeholder at byte {0}")]
    UnclosedPlaceholder(usize),
}

/// Renders value strings against a namespace.
pub trait TemplateEngine: Send + Sync {
    /// Substitutes every placeholder in `template` with the named value's
    /// string form.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] on unknown identifiers or malformed
    /// placeholders.
    fn render(&self, template: &str, values: &ValueMap) -> Result<String, TemplateError>;
}

/// Built-in double-brace renderer.
///
/// Substitutes `{{ name }}` with the string form of `values[name]`. An
/// empty placeholder (`{{}}`) passes through untouched; it is the textual
/// form of an uninitialized value and must survive rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceTemplates;

impl TemplateEngine for BraceTemplates {
    fn render(&self, template: &str, values: &ValueMap) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::UnclosedPlaceholder(
                    template.len() - rest.len() + start,
                ));
            };

            let name = after[..end].trim();
            if name.is_empty() {
                out.push_str("{{}}");
            } else {
                let value = values
                    .get(name)
                    .ok_or_else(|| TemplateError::UnknownIdentifier(name.to_string()))?;
                out.push_str(&value.to_string());
            }

            rest = &after[end + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}
