//! Core types for the canvas
//!
//! Defines the fundamental types for the mutation service:
//! - Grid configuration and coordinates
//! - Colors in canonical 24-bit hex form
//! - Participants and their bookkeeping
//! - Cells and committed mutations

use crate::error::RejectionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millisecond unix-epoch timestamp.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds since the unix epoch.
#[inline]
#[must_use]
pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// A grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column, `0 ≤ x < width`
    pub x: u32,
    /// Row, `0 ≤ y < height`
    pub y: u32,
}

impl Coord {
    /// Create a new coordinate
    #[inline]
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A 24-bit RGB color
///
/// Canonical form is a lowercase `#rrggbb` string; parsing accepts
/// mixed-case hex but always requires the leading `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Create a color from channel values
    #[inline]
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for Color {
    type Err = RejectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RejectionError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = RejectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// Opaque participant identifier
///
/// Supplied by the identity collaborator after an out-of-scope login flow;
/// the core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Create a participant id from any string-like value
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Participant bookkeeping owned by the rate gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque id
    pub id: ParticipantId,
    /// Human-readable name from the identity collaborator
    pub display_name: String,
    /// Timestamp of the last cooldown-gated success; `None` means never
    pub last_free_mutation_at: Option<Timestamp>,
    /// Monotonic count of committed mutations (free and paid)
    pub mutation_count: u64,
}

impl Participant {
    /// Create a fresh participant record
    #[inline]
    #[must_use]
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            last_free_mutation_at: None,
            mutation_count: 0,
        }
    }
}

/// Current state of one grid position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Current color
    pub color: Color,
    /// Who painted it last
    pub painted_by: ParticipantId,
    /// When the winning write committed; non-decreasing per cell
    pub committed_at: Timestamp,
}

/// The broadcast unit: one committed cell write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedMutation {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Committed color
    pub color: Color,
    /// Author
    pub painted_by: ParticipantId,
    /// Commit timestamp, non-decreasing per cell
    pub committed_at: Timestamp,
}

impl CommittedMutation {
    /// Coordinate of the mutated cell
    #[inline]
    #[must_use]
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Grid dimensions and cooldown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Minimum wait between free mutations, in milliseconds
    pub cooldown_ms: i64,
}

impl GridConfig {
    /// Create default configuration (320x320, 15-minute cooldown)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With grid dimensions
    #[inline]
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// With cooldown duration in milliseconds
    #[inline]
    #[must_use]
    pub fn with_cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Whether a coordinate falls inside the grid
    #[inline]
    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 320,
            cooldown_ms: 15 * 60 * 1000,
        }
    }
}
