//! Slash-delimited pattern literals (`/body/flags`).
//!
//! Authored `matches` rules carry their regular expression in the literal
//! form other ecosystems use: `/^[a-z]+$/i`. This module splits such a
//! literal into body and flags and translates the flags into the inline
//! `(?flags)` syntax the `regex` crate understands. Compilation itself is
//! left to the engine crate so this one stays dependency-light.

use thiserror::Error;

/// Reasons a pattern literal fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A literal opened with `/` but never closed.
    #[error("pattern literal `{0}` has no closing `/`")]
    Unterminated(String),

    /// A flag this engine cannot translate.
    #[error("pattern literal `{literal}` uses unsupported flag `{flag}`")]
    UnsupportedFlag {
        /// The offending literal.
        literal: String,
        /// The flag character that was rejected.
        flag: char,
    },

    /// The pattern body was empty.
    #[error("pattern literal has an empty body")]
    EmptyBody,
}

/// A parsed `/body/flags` literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLiteral {
    /// The regular expression body, verbatim.
    pub body: String,
    /// Retained flags, already reduced to ones with an inline translation.
    pub flags: String,
}

impl PatternLiteral {
    /// Parse a literal. A string without a leading `/` is taken verbatim as
    /// the body with no flags.
    ///
    /// `i`, `m`, `s` and `x` carry over to the regex crate's inline flags.
    /// `u` and `g` are accepted and dropped: Rust regexes are Unicode-aware
    /// and non-global by nature. Anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let Some(rest) = raw.strip_prefix('/') else {
            if raw.is_empty() {
                return Err(PatternError::EmptyBody);
            }
            return Ok(Self {
                body: raw.to_string(),
                flags: String::new(),
            });
        };

        let Some(split) = rest.rfind('/') else {
            return Err(PatternError::Unterminated(raw.to_string()));
        };
        let body = &rest[..split];
        if body.is_empty() {
            return Err(PatternError::EmptyBody);
        }

        let mut flags = String::new();
        for flag in rest[split + 1..].chars() {
            match flag {
                'i' | 'm' | 's' | 'x' => flags.push(flag),
                'u' | 'g' => {}
                other => {
                    return Err(PatternError::UnsupportedFlag {
                        literal: raw.to_string(),
                        flag: other,
                    });
                }
            }
        }

        Ok(Self {
            body: body.to_string(),
            flags,
        })
    }

    /// Source string suitable for `regex::Regex::new`.
    pub fn to_regex_source(&self) -> String {
        if self.flags.is_empty() {
            self.body.clone()
        } else {
            format!("(?{}){}", self.flags, self.body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_literal() {
        let lit = PatternLiteral::parse("/^[a-z]+$/").unwrap();
        assert_eq!(lit.body, "^[a-z]+$");
        assert_eq!(lit.flags, "");
        assert_eq!(lit.to_regex_source(), "^[a-z]+$");
    }

    #[test]
    fn test_parse_with_flags() {
        let lit = PatternLiteral::parse("/^ab+c$/im").unwrap();
        assert_eq!(lit.body, "^ab+c$");
        assert_eq!(lit.flags, "im");
        assert_eq!(lit.to_regex_source(), "(?im)^ab+c$");
    }

    #[test]
    fn test_ignored_flags_are_dropped() {
        let lit = PatternLiteral::parse("/x+/gu").unwrap();
        assert_eq!(lit.flags, "");
        assert_eq!(lit.to_regex_source(), "x+");
    }

    #[test]
    fn test_bare_string_is_body() {
        let lit = PatternLiteral::parse("[0-9]{4}").unwrap();
        assert_eq!(lit.body, "[0-9]{4}");
        assert_eq!(lit.flags, "");
    }

    #[test]
    fn test_body_may_contain_escaped_slash() {
        // rfind picks the last slash, so escaped slashes inside the body
        // survive as long as the literal is properly terminated
        let lit = PatternLiteral::parse(r"/a\/b/").unwrap();
        assert_eq!(lit.body, r"a\/b");
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(
            PatternLiteral::parse("/abc"),
            Err(PatternError::Unterminated("/abc".to_string()))
        );
    }

    #[test]
    fn test_unsupported_flag() {
        assert!(matches!(
            PatternLiteral::parse("/abc/y"),
            Err(PatternError::UnsupportedFlag { flag: 'y', .. })
        ));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(PatternLiteral::parse("//i"), Err(PatternError::EmptyBody));
        assert_eq!(PatternLiteral::parse(""), Err(PatternError::EmptyBody));
    }
}
