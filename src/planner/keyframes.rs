//! Keyframe index with floor/ceiling lookup by frame number or timestamp

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::model::Seconds;
use crate::error::{ScreencapError, ScreencapResult};

/// One keyframe: 1-based frame number and presentation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FramePair {
    pub frame_number: u64,
    pub timestamp: Seconds,
}

impl FramePair {
    pub fn new(frame_number: u64, timestamp: Seconds) -> Self {
        Self {
            frame_number,
            timestamp,
        }
    }
}

/// Search direction for [`KeyframeIndex::find`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Rightmost keyframe at or before the value
    Before,
    /// Leftmost keyframe at or after the value
    After,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Before => write!(f, "at or before"),
            Direction::After => write!(f, "at or after"),
        }
    }
}

/// Which column a lookup searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeQuery {
    Frame(u64),
    Timestamp(Seconds),
}

impl fmt::Display for KeyframeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyframeQuery::Frame(frame) => write!(f, "frame {}", frame),
            KeyframeQuery::Timestamp(ts) => write!(f, "{}s", ts),
        }
    }
}

/// Immutable, sorted keyframe table
///
/// Both columns increase strictly, so either one can be binary searched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeIndex {
    pairs: Vec<FramePair>,
}

impl KeyframeIndex {
    /// Sort, drop exact duplicates and validate the columns
    pub fn new(mut pairs: Vec<FramePair>) -> ScreencapResult<Self> {
        pairs.sort();
        pairs.dedup();

        if let Some(bad) = pairs.iter().find(|p| p.frame_number == 0) {
            return Err(ScreencapError::InvalidKeyframes {
                message: format!("frame numbers start at 1, found 0 at {}s", bad.timestamp),
            });
        }
        if let Some(bad) = pairs.iter().find(|p| p.timestamp.is_sign_negative()) {
            return Err(ScreencapError::InvalidKeyframes {
                message: format!("negative timestamp {} at frame {}", bad.timestamp, bad.frame_number),
            });
        }
        for window in pairs.windows(2) {
            let (a, b) = (window[0], window[1]);
            if a.frame_number == b.frame_number || a.timestamp >= b.timestamp {
                return Err(ScreencapError::InvalidKeyframes {
                    message: format!(
                        "frames {} ({}s) and {} ({}s) are out of order",
                        a.frame_number, a.timestamp, b.frame_number, b.timestamp
                    ),
                });
            }
        }

        Ok(Self { pairs })
    }

    /// Parse `<frame_number> <timestamp>` lines in any order
    pub fn parse_listing(text: &str) -> ScreencapResult<Self> {
        let mut pairs = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(frame), Some(timestamp), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(ScreencapError::InvalidKeyframes {
                    message: format!("line {}: expected '<frame> <timestamp>'", index + 1),
                });
            };
            let frame = frame.parse::<u64>().map_err(|_| ScreencapError::InvalidKeyframes {
                message: format!("line {}: bad frame number '{}'", index + 1, frame),
            })?;
            let timestamp = Decimal::from_str(timestamp).map_err(|_| {
                ScreencapError::InvalidKeyframes {
                    message: format!("line {}: bad timestamp '{}'", index + 1, timestamp),
                }
            })?;
            pairs.push(FramePair::new(frame, timestamp.normalize()));
        }
        Self::new(pairs)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[FramePair] {
        &self.pairs
    }

    /// Floor (`Before`) or ceiling (`After`) lookup
    pub fn find(&self, query: KeyframeQuery, direction: Direction) -> ScreencapResult<FramePair> {
        let (before, at_or_before) = match query {
            KeyframeQuery::Frame(0) => {
                return Err(ScreencapError::InvalidKeyframes {
                    message: "frame numbers start at 1".to_string(),
                })
            }
            KeyframeQuery::Frame(frame) => (
                self.pairs.partition_point(|p| p.frame_number < frame),
                self.pairs.partition_point(|p| p.frame_number <= frame),
            ),
            KeyframeQuery::Timestamp(ts) => (
                self.pairs.partition_point(|p| p.timestamp < ts),
                self.pairs.partition_point(|p| p.timestamp <= ts),
            ),
        };

        let found = match direction {
            Direction::Before => at_or_before.checked_sub(1).map(|i| self.pairs[i]),
            Direction::After => self.pairs.get(before).copied(),
        };
        found.ok_or_else(|| ScreencapError::KeyframeNotFound {
            value: query.to_string(),
            direction: direction.to_string(),
        })
    }

    /// Timestamp floor, the usual way cut points are aligned
    pub fn floor_timestamp(&self, ts: Seconds) -> ScreencapResult<Seconds> {
        self.find(KeyframeQuery::Timestamp(ts), Direction::Before)
            .map(|p| p.timestamp)
    }

    /// Timestamp ceiling
    pub fn ceil_timestamp(&self, ts: Seconds) -> ScreencapResult<Seconds> {
        self.find(KeyframeQuery::Timestamp(ts), Direction::After)
            .map(|p| p.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn index() -> KeyframeIndex {
        KeyframeIndex::parse_listing("251 10.04\n1 0\n\n501 20.0\n").unwrap()
    }

    #[test]
    fn test_listing_is_sorted() {
        let index = index();
        let frames: Vec<u64> = index.pairs().iter().map(|p| p.frame_number).collect();
        assert_eq!(frames, vec![1, 251, 501]);
    }

    #[test]
    fn test_timestamp_floor_and_ceiling() {
        let index = index();
        let before = index.find(KeyframeQuery::Timestamp(d("15")), Direction::Before).unwrap();
        assert_eq!(before, FramePair::new(251, d("10.04")));
        let after = index.find(KeyframeQuery::Timestamp(d("15")), Direction::After).unwrap();
        assert_eq!(after.frame_number, 501);

        // exact hits return themselves in both directions
        assert_eq!(index.floor_timestamp(d("10.04")).unwrap(), d("10.04"));
        assert_eq!(index.ceil_timestamp(d("10.04")).unwrap(), d("10.04"));
    }

    #[test]
    fn test_not_found_at_both_ends() {
        let index = KeyframeIndex::parse_listing("10 1.0\n20 2.0").unwrap();
        assert!(matches!(
            index.find(KeyframeQuery::Timestamp(d("0.5")), Direction::Before),
            Err(ScreencapError::KeyframeNotFound { .. })
        ));
        assert!(matches!(
            index.find(KeyframeQuery::Timestamp(d("2.5")), Direction::After),
            Err(ScreencapError::KeyframeNotFound { .. })
        ));
        assert!(index.find(KeyframeQuery::Timestamp(d("2.5")), Direction::Before).is_ok());
        assert!(index.find(KeyframeQuery::Timestamp(d("0.5")), Direction::After).is_ok());
    }

    #[test]
    fn test_frame_column_is_independent() {
        let index = index();
        let pair = index.find(KeyframeQuery::Frame(300), Direction::Before).unwrap();
        assert_eq!(pair.frame_number, 251);
        let pair = index.find(KeyframeQuery::Frame(300), Direction::After).unwrap();
        assert_eq!(pair.frame_number, 501);
        // 20 as a frame number and as a timestamp land on different pairs
        assert_eq!(index.find(KeyframeQuery::Frame(20), Direction::Before).unwrap().frame_number, 1);
        assert_eq!(
            index.find(KeyframeQuery::Timestamp(d("20")), Direction::Before).unwrap().frame_number,
            501
        );
        assert!(index.find(KeyframeQuery::Frame(0), Direction::After).is_err());
    }

    #[test]
    fn test_duplicates_collapse_and_conflicts_fail() {
        let index = KeyframeIndex::parse_listing("1 0\n1 0\n5 0.2").unwrap();
        assert_eq!(index.len(), 2);

        assert!(KeyframeIndex::parse_listing("1 0\n5 0.2\n9 0.1").is_err());
        assert!(KeyframeIndex::parse_listing("1 0\n1 0.5").is_err());
        assert!(KeyframeIndex::parse_listing("0 0").is_err());
        assert!(KeyframeIndex::parse_listing("1 x").is_err());
        assert!(KeyframeIndex::parse_listing("1").is_err());
    }

    #[test]
    fn test_empty_index_finds_nothing() {
        let index = KeyframeIndex::default();
        assert!(index.is_empty());
        assert!(index.floor_timestamp(d("1")).is_err());
        assert!(index.ceil_timestamp(d("1")).is_err());
    }
}
