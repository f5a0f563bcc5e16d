//! Coordinate keys for board squares.
//!
//! A square is an opaque key: algebraic for rectangular boards ("e4"),
//! axial for hex boards ("2,-1"), or a free-form name on custom graphs.
//! Equality and hashing are structural, and the string rendering round-trips
//! through `Display`/`From<String>` so JSON maps keyed by squares work
//! without a wrapper type.

use serde::{Deserialize, Serialize};

/// A board square key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Square {
    /// Rectangular-board square, zero-based file and rank ("a1" = 0,0).
    Algebraic {
        /// File index (0 = "a").
        file: i32,
        /// Rank index (0 = rank "1").
        rank: i32,
    },
    /// Hex-board square in axial coordinates.
    Axial {
        /// Axial column.
        q: i32,
        /// Axial row.
        r: i32,
    },
    /// Free-form key on a custom graph.
    Named(String),
}

impl Square {
    /// Creates an algebraic (rectangular) square from zero-based coordinates.
    pub fn alg(file: i32, rank: i32) -> Self {
        Square::Algebraic { file, rank }
    }

    /// Creates an axial (hex) square.
    pub fn axial(q: i32, r: i32) -> Self {
        Square::Axial { q, r }
    }

    /// Creates a named square for custom graphs.
    pub fn named(name: impl Into<String>) -> Self {
        Square::Named(name.into())
    }

    /// Returns the numeric coordinate pair, if this square has one.
    ///
    /// Algebraic squares yield `(file, rank)`, axial squares `(q, r)`.
    /// Named squares have no coordinates.
    pub fn coords(&self) -> Option<(i32, i32)> {
        match self {
            Square::Algebraic { file, rank } => Some((*file, *rank)),
            Square::Axial { q, r } => Some((*q, *r)),
            Square::Named(_) => None,
        }
    }

    /// Returns a square offset by `(dx, dy)` in the same coordinate system.
    ///
    /// Named squares cannot be offset.
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Square> {
        match self {
            Square::Algebraic { file, rank } => Some(Square::alg(file + dx, rank + dy)),
            Square::Axial { q, r } => Some(Square::axial(q + dx, r + dy)),
            Square::Named(_) => None,
        }
    }

    /// Whether this square is a light square by checkerboard parity.
    ///
    /// Named squares default to light.
    pub fn is_light(&self) -> bool {
        match self.coords() {
            Some((a, b)) => (a + b).rem_euclid(2) == 0,
            None => true,
        }
    }
}

/// Renders a zero-based file index as letters ("a".."z", "aa", ...).
fn file_letters(file: i32) -> String {
    if file < 0 {
        // Out-of-board files still need a stable rendering.
        return format!("({file})");
    }
    let mut n = file;
    let mut letters = Vec::new();
    loop {
        letters.push(b'a' + (n % 26) as u8);
        n = n / 26 - 1;
        if n < 0 {
            break;
        }
    }
    letters.reverse();
    String::from_utf8(letters).expect("ascii letters")
}

/// Parses letters back to a zero-based file index.
fn letters_file(s: &str) -> Option<i32> {
    let mut acc: i64 = 0;
    for c in s.chars() {
        if !c.is_ascii_lowercase() {
            return None;
        }
        acc = acc * 26 + (c as i64 - 'a' as i64 + 1);
        if acc > i32::MAX as i64 {
            return None;
        }
    }
    if s.is_empty() { None } else { Some(acc as i32 - 1) }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Square::Algebraic { file, rank } => {
                write!(f, "{}{}", file_letters(*file), rank + 1)
            }
            Square::Axial { q, r } => write!(f, "{q},{r}"),
            Square::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for Square {
    fn from(s: &str) -> Self {
        // "q,r" axial pair.
        if let Some((q, r)) = s.split_once(',')
            && let (Ok(q), Ok(r)) = (q.trim().parse::<i32>(), r.trim().parse::<i32>())
        {
            return Square::axial(q, r);
        }
        // Algebraic: letters followed by a rank number.
        let split = s.find(|c: char| c.is_ascii_digit());
        if let Some(idx) = split
            && idx > 0
            && let Some(file) = letters_file(&s[..idx])
            && let Ok(rank) = s[idx..].parse::<i32>()
        {
            return Square::alg(file, rank - 1);
        }
        Square::Named(s.to_string())
    }
}

impl From<String> for Square {
    fn from(s: String) -> Self {
        Square::from(s.as_str())
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}
