//! `$secret{<handle>}` templating for string parameters.
//!
//! A string may hold any number of tokens mixed with literal text:
//! `"Basic $secret{svc-user}:$secret{svc-pass}"`. Every token is looked up on its own,
//! left to right. The handle is any run of characters other than `}`.

use crate::errors::FlowplaneError;
use crate::secrets::SecretString;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

const TOKEN_OPEN: &str = "$secret{";

lazy_static! {
    static ref SECRET_TOKEN_REGEX: Regex =
        Regex::new(r"\$secret\{([^}]*)\}").expect("SECRET_TOKEN_REGEX should be a valid regex");
}

/// Errors while expanding a template. Messages never include secret values.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("malformed secret template: {reason}")]
    Malformed { reason: String },

    #[error("failed to resolve secret '{handle}': {source}")]
    Resolve {
        handle: String,
        #[source]
        source: FlowplaneError,
    },
}

/// Whether `value` contains anything that looks like a secret token
pub fn contains_secret_template(value: &str) -> bool {
    value.contains(TOKEN_OPEN)
}

/// Replace every `$secret{handle}` in `template` with the value `lookup` returns.
///
/// Returns the input unchanged (borrowed) when it holds no token. Any malformed token or
/// failed lookup fails the whole string; no partial result is produced.
pub fn render_secret_template<'a, F>(
    template: &'a str,
    mut lookup: F,
) -> Result<Cow<'a, str>, TemplateError>
where
    F: FnMut(&str) -> crate::errors::Result<SecretString>,
{
    if !contains_secret_template(template) {
        return Ok(Cow::Borrowed(template));
    }

    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in SECRET_TOKEN_REGEX.captures_iter(template) {
        let (Some(token), Some(handle)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        check_literal(&template[last..token.start()])?;

        let handle = handle.as_str();
        if handle.is_empty() {
            return Err(TemplateError::Malformed { reason: "empty secret handle".to_string() });
        }

        let secret = lookup(handle)
            .map_err(|source| TemplateError::Resolve { handle: handle.to_string(), source })?;

        rendered.push_str(&template[last..token.start()]);
        rendered.push_str(secret.expose_secret());
        last = token.end();
    }

    check_literal(&template[last..])?;
    rendered.push_str(&template[last..]);

    Ok(Cow::Owned(rendered))
}

fn check_literal(literal: &str) -> Result<(), TemplateError> {
    if contains_secret_template(literal) {
        return Err(TemplateError::Malformed {
            reason: "unterminated secret token, expected '}'".to_string(),
        });
    }
    Ok(())
}
