//! Line classification for extended M3U playlists

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::model::{Locator, Seconds};
use crate::domain::rules;
use crate::error::{ScreencapError, ScreencapResult};

pub const HEADER: &str = "#EXTM3U";
pub const OPTION_PREFIX: &str = "#EXTVLCOPT:";
pub const INFO_PREFIX: &str = "#EXTINF:";
pub const GROUP_PREFIX: &str = "#EXTGRP:";

pub const START_TIME_KEY: &str = "start-time";
pub const STOP_TIME_KEY: &str = "stop-time";

/// A classified playlist line with its 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub line: usize,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    FileHeader { text: String },
    Comment { text: String },
    Option { key: String, value: OptionValue },
    Info {
        duration: Option<Seconds>,
        label: String,
        tags: Vec<String>,
    },
    Group { name: String },
    Path(Locator),
}

/// `#EXTVLCOPT` payload; time bounds are decoded up front
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Time(Seconds),
    Text(String),
}

impl TokenKind {
    /// Directives attach to the next path line
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            TokenKind::Option { .. } | TokenKind::Info { .. } | TokenKind::Group { .. }
        )
    }
}

/// Classify every non-blank line of `text`
pub fn tokenize(text: &str) -> ScreencapResult<Vec<Token>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut tokens = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        if let Some(token) = classify_line(index + 1, raw)? {
            tokens.push(token);
        }
    }
    Ok(tokens)
}

/// Classify one line; blank lines produce nothing
pub fn classify_line(line: usize, raw: &str) -> ScreencapResult<Option<Token>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let kind = if trimmed.starts_with(HEADER) {
        TokenKind::FileHeader {
            text: trimmed.to_string(),
        }
    } else if let Some(rest) = trimmed.strip_prefix(OPTION_PREFIX) {
        parse_option(line, rest)?
    } else if let Some(rest) = trimmed.strip_prefix(INFO_PREFIX) {
        parse_info(line, rest)?
    } else if let Some(rest) = trimmed.strip_prefix(GROUP_PREFIX) {
        TokenKind::Group {
            name: rest.trim().to_string(),
        }
    } else if let Some(rest) = trimmed.strip_prefix('#') {
        TokenKind::Comment {
            text: rest.trim().to_string(),
        }
    } else {
        TokenKind::Path(Locator::parse(trimmed))
    };

    Ok(Some(Token { line, kind }))
}

fn parse_option(line: usize, rest: &str) -> ScreencapResult<TokenKind> {
    let (key, value) = rest
        .split_once('=')
        .ok_or_else(|| ScreencapError::format(line, "option directive without '='"))?;
    let key = key.trim().to_string();
    let value = value.trim();
    let value = if key == START_TIME_KEY || key == STOP_TIME_KEY {
        let seconds = Decimal::from_str(value).map_err(|_| {
            ScreencapError::format(line, format!("invalid {} value '{}'", key, value))
        })?;
        OptionValue::Time(seconds.normalize())
    } else {
        OptionValue::Text(value.to_string())
    };
    Ok(TokenKind::Option { key, value })
}

fn parse_info(line: usize, rest: &str) -> ScreencapResult<TokenKind> {
    let (head, tail) = rest
        .split_once(',')
        .ok_or_else(|| ScreencapError::format(line, "info directive without ','"))?;

    // attribute lists may follow the duration; only the number is read
    let number = head.split_whitespace().next().unwrap_or("");
    let duration = match number {
        "" | "-1" | "0" => None,
        _ => {
            let seconds = Decimal::from_str(number).map_err(|_| {
                ScreencapError::format(line, format!("invalid duration '{}'", number))
            })?;
            Some(seconds.normalize()).filter(|d| d.is_sign_positive() && !d.is_zero())
        }
    };

    let mut fields = tail.split(',');
    let label = rules::sanitize_label(fields.next().unwrap_or(""));
    let tags = fields.map(|t| t.trim().to_string()).collect();

    Ok(TokenKind::Info {
        duration,
        label,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(line: &str) -> TokenKind {
        classify_line(1, line).unwrap().unwrap().kind
    }

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_prefix_priority() {
        assert!(matches!(kind("#EXTM3U"), TokenKind::FileHeader { .. }));
        assert!(matches!(kind("#EXTGRP:Holidays"), TokenKind::Group { name } if name == "Holidays"));
        assert!(matches!(kind("# just a note"), TokenKind::Comment { text } if text == "just a note"));
        assert!(matches!(kind("#EXTVLCOPT:network-caching=1000"),
            TokenKind::Option { key, value: OptionValue::Text(v) } if key == "network-caching" && v == "1000"));
        assert!(matches!(kind("clips/a.mkv"), TokenKind::Path(Locator::Local(_))));
        assert!(matches!(kind("https://example.com/a.mp4"), TokenKind::Path(Locator::Remote(_))));
    }

    #[test]
    fn test_time_options_are_decimal() {
        assert_eq!(
            kind("#EXTVLCOPT:start-time=12.500"),
            TokenKind::Option {
                key: "start-time".to_string(),
                value: OptionValue::Time(dec("12.5")),
            }
        );
        let err = classify_line(7, "#EXTVLCOPT:stop-time=soon").unwrap_err();
        assert!(matches!(err, ScreencapError::Format { line: 7, .. }));
        assert!(classify_line(3, "#EXTVLCOPT:no-equals").is_err());
    }

    #[test]
    fn test_info_directive() {
        assert_eq!(
            kind("#EXTINF:123.40,Opening (2),The Band,extra"),
            TokenKind::Info {
                duration: Some(dec("123.4")),
                label: "Opening".to_string(),
                tags: vec!["The Band".to_string(), "extra".to_string()],
            }
        );
        assert!(matches!(kind("#EXTINF:-1,Live"), TokenKind::Info { duration: None, .. }));
        assert!(matches!(kind("#EXTINF:0,Zero"), TokenKind::Info { duration: None, .. }));
        assert!(matches!(kind("#EXTINF:,Blank"), TokenKind::Info { duration: None, .. }));
        assert!(matches!(
            kind(r#"#EXTINF:30 tvg-id="x",With attrs"#),
            TokenKind::Info { duration: Some(d), .. } if d == dec("30")
        ));
    }

    #[test]
    fn test_info_errors() {
        assert!(matches!(
            classify_line(4, "#EXTINF:12.0 no comma").unwrap_err(),
            ScreencapError::Format { line: 4, .. }
        ));
        assert!(classify_line(5, "#EXTINF:abc,Title").is_err());
    }

    #[test]
    fn test_tokenize_skips_blanks_and_bom() {
        let tokens = tokenize("\u{feff}#EXTM3U\n\n  \na.mkv\n").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 4);
        assert!(matches!(tokens[0].kind, TokenKind::FileHeader { .. }));
    }
}
