//! Template selection.

use tracing::debug;

use crate::template::Template;

/// Pick the template for `text`.
///
/// A template is eligible when all of its keywords occur in `text`. The
/// eligible template with the highest priority wins; on equal priority the
/// one declared first wins. `None` means the document type is unrecognized.
pub fn match_template<'a>(text: &str, templates: &'a [Template]) -> Option<&'a Template> {
    let mut best: Option<&Template> = None;

    for template in templates {
        if !template.matches(text) {
            continue;
        }
        match best {
            Some(current) if template.priority() <= current.priority() => {}
            _ => best = Some(template),
        }
    }

    match best {
        Some(template) => debug!(
            "Matched template {} (priority {})",
            template.issuer_id(),
            template.priority()
        ),
        None => debug!("No template matched"),
    }

    best
}
