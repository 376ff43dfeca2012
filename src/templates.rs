//! Head/tail wrapper templates
//!
//! Templates are mustache strings rendered against the context data bag.
//! Unlike plain mustache, a placeholder naming a missing value is an error:
//! a blank in the middle of a document header is never what the caller wants.
//! `{{name}}` escapes the value for XML, `{{{name}}}` inserts it raw.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::TemplateError;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"\{\{\{?([^{}]*)\}?\}\}").expect("valid tag regex");
}

/// Names referenced by a template, in order of appearance
///
/// Section closers and comments are skipped; section openers count as
/// references. Only plain names are accepted: partials, delimiter changes
/// and dotted names would render blank against a flat data bag.
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut names = Vec::new();
    for caps in TAG_RE.captures_iter(template) {
        let body = caps[1].trim();
        let (sigil, name) = match body.chars().next() {
            Some(c @ ('#' | '^' | '/' | '&' | '!' | '>' | '=')) => (Some(c), body[1..].trim()),
            _ => (None, body),
        };

        match sigil {
            Some('!') | Some('/') => continue,
            Some('>') => return Err(TemplateError::Invalid(format!("partial `{}` is not supported", name))),
            Some('=') => return Err(TemplateError::Invalid("delimiter changes are not supported".into())),
            _ => {}
        }
        if name.is_empty() || name.contains('.') || name.contains(char::is_whitespace) {
            return Err(TemplateError::Invalid(format!("`{}` is not a plain name", name)));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Fill a template from the data bag
pub fn fill_template(template: &str, data: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    if let Some(missing) = placeholders(template)?.into_iter().find(|name| !data.contains_key(name)) {
        return Err(TemplateError::Unresolved(missing));
    }

    let compiled = mustache::compile_str(template).map_err(|e| TemplateError::Invalid(e.to_string()))?;
    compiled
        .render_to_string(data)
        .map_err(|e| TemplateError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_placeholders() {
        let names = placeholders("<TEI n=\"{{ group_id }}\">{{{item_title}}}{{! note }}{{#x}}{{/x}}").unwrap();
        assert_eq!(names, vec!["group_id", "item_title", "x"]);
    }

    #[test]
    fn test_dotted_names_are_rejected() {
        let err = fill_template("[{{a.b}}]", &data(&[("a.b", "V")])).unwrap_err();
        assert!(matches!(err, TemplateError::Invalid(_)));
        assert!(matches!(fill_template("{{.}}", &BTreeMap::new()), Err(TemplateError::Invalid(_))));
    }

    #[test]
    fn test_partials_are_rejected() {
        let err = fill_template("[{{> head}}]", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Invalid(_)));
        assert!(matches!(fill_template("{{=<% %>=}}", &BTreeMap::new()), Err(TemplateError::Invalid(_))));
    }

    #[test]
    fn test_fill_escapes_values() {
        let out = fill_template("<head>{{title}}</head>", &data(&[("title", "Dante & Virgil")])).unwrap();
        assert_eq!(out, "<head>Dante &amp; Virgil</head>");
    }

    #[test]
    fn test_fill_raw_values() {
        let out = fill_template("{{{body}}}", &data(&[("body", "<p/>")])).unwrap();
        assert_eq!(out, "<p/>");
    }

    #[test]
    fn test_unresolved_placeholder_is_an_error() {
        let err = fill_template("<div n=\"{{group_id}}\">{{nope}}", &data(&[("group_id", "A")])).unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("nope".to_string()));
    }

    #[test]
    fn test_template_without_placeholders() {
        assert_eq!(fill_template("</body>", &BTreeMap::new()).unwrap(), "</body>");
    }
}
