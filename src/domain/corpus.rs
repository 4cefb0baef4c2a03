// ============================================================
// Layer 3 — Corpus Domain Type
// ============================================================
// The raw training text plus where it came from.
// By the time a Corpus exists the bytes have already been
// decoded as UTF-8 by the data layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    /// File name or URL the text was read from
    pub source: String,

    /// The full decoded text
    pub text: String,
}

impl Corpus {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// Number of characters (Unicode scalar values), not bytes.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The first `n` characters, cut on a char boundary.
    pub fn head(&self, n: usize) -> &str {
        match self.text.char_indices().nth(n) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None                => &self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_chars_not_bytes() {
        let c = Corpus::new("t", "héllo");
        assert_eq!(c.char_len(), 5);
        assert_eq!(c.text.len(), 6);
    }

    #[test]
    fn test_head_respects_char_boundaries() {
        let c = Corpus::new("t", "ééé");
        assert_eq!(c.head(2), "éé");
        assert_eq!(c.head(10), "ééé");
        assert_eq!(c.head(0), "");
    }
}
