//! Folds classified lines into playlist entries

use tracing::{debug, trace};

use crate::domain::model::{DurationSource, Entry, Locator, Seconds, TitleSource};
use crate::error::{ScreencapError, ScreencapResult};
use crate::playlist::token::{OptionValue, Token, TokenKind, START_TIME_KEY, STOP_TIME_KEY};
use crate::playlist::{FloatingComment, Playlist};

/// Directives seen since the last path line
#[derive(Debug, Default)]
struct Pending {
    first_line: Option<usize>,
    start: Option<Seconds>,
    stop: Option<Seconds>,
    options: Vec<(String, String)>,
    info: Option<(Option<Seconds>, String, Vec<String>)>,
    group: Option<String>,
}

impl Pending {
    fn touch(&mut self, line: usize) {
        self.first_line.get_or_insert(line);
    }
}

/// Build a playlist from tokens in source order
pub fn parse_tokens(tokens: Vec<Token>) -> ScreencapResult<Playlist> {
    let mut playlist = Playlist::default();
    let mut pending = Pending::default();
    let mut comments: Vec<String> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::FileHeader { text } => {
                if playlist.header.is_none() {
                    playlist.header = Some(text);
                } else {
                    trace!(line = token.line, "ignoring repeated header");
                }
            }
            TokenKind::Comment { text } => comments.push(text),
            TokenKind::Option { key, value } => {
                pending.touch(token.line);
                match value {
                    OptionValue::Time(seconds) if key == START_TIME_KEY => pending.start = Some(seconds),
                    OptionValue::Time(seconds) if key == STOP_TIME_KEY => pending.stop = Some(seconds),
                    OptionValue::Time(seconds) => pending.options.push((key, seconds.to_string())),
                    OptionValue::Text(text) => pending.options.push((key, text)),
                }
            }
            TokenKind::Info { duration, label, tags } => {
                pending.touch(token.line);
                if pending.info.is_some() {
                    debug!(line = token.line, "second info directive replaces the first");
                }
                pending.info = Some((duration, label, tags));
            }
            TokenKind::Group { name } => {
                pending.touch(token.line);
                pending.group = Some(name).filter(|n| !n.is_empty());
            }
            TokenKind::Path(locator) => {
                let order = playlist.entries.len();
                for text in comments.drain(..) {
                    playlist.comments.push(FloatingComment {
                        before: Some(order),
                        text,
                    });
                }
                let entry = build_entry(token.line, locator, order, std::mem::take(&mut pending))?;
                playlist.entries.push(entry);
            }
        }
    }

    if playlist.entries.is_empty() {
        return Err(ScreencapError::EmptyPlaylist);
    }
    if let Some(line) = pending.first_line {
        return Err(ScreencapError::format(
            line,
            "directive is not followed by a path or URL",
        ));
    }
    for text in comments {
        playlist.comments.push(FloatingComment { before: None, text });
    }

    debug!(entries = playlist.entries.len(), "parsed playlist");
    Ok(playlist)
}

fn build_entry(
    line: usize,
    locator: Locator,
    order: usize,
    pending: Pending,
) -> ScreencapResult<Entry> {
    let mut entry = Entry::new(locator, order);
    entry
        .set_range(pending.start, pending.stop)
        .map_err(|e| ScreencapError::format(line, e.to_string()))?;
    if let Some((duration, label, tags)) = pending.info {
        entry.set_title(TitleSource::Playlist, Some(label));
        entry.set_duration(DurationSource::Playlist, duration);
        entry.tags = tags;
    }
    entry.group = pending.group;
    entry.options = pending.options;
    Ok(entry)
}
