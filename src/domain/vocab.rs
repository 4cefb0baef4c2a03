// ============================================================
// Layer 3 — Character Vocabulary
// ============================================================
// Maps every distinct character of the corpus to an integer
// index and back. Indices run from 0 to len - 1 in sorted
// code-point order, so the same text always produces the
// same mapping.
//
// Example for the text "hello":
//   sorted unique chars: ['e', 'h', 'l', 'o']
//   char_to_index:       e→0, h→1, l→2, o→3
//   "hello" encodes to   [1, 0, 2, 2, 3]

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabError {
    #[error("cannot build a vocabulary from an empty corpus")]
    EmptyCorpus,

    #[error("character {0:?} is not in the vocabulary")]
    UnknownChar(char),

    #[error("index {index} is out of range for a vocabulary of {len} characters")]
    InvalidIndex { index: u32, len: usize },
}

/// Bijection between characters and indices `0..len`.
///
/// Serialised as the ordered list of characters only; the reverse
/// lookup table is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct CharVocab {
    index_to_char: Vec<char>,
    char_to_index: HashMap<char, u32>,
}

impl CharVocab {
    /// Build the vocabulary from the sorted set of distinct characters.
    pub fn from_text(text: &str) -> Result<Self, VocabError> {
        let unique: BTreeSet<char> = text.chars().collect();
        if unique.is_empty() {
            return Err(VocabError::EmptyCorpus);
        }
        Ok(Self::from(unique.into_iter().collect::<Vec<_>>()))
    }

    pub fn len(&self) -> usize {
        self.index_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_char.is_empty()
    }

    pub fn char_to_index(&self, c: char) -> Result<u32, VocabError> {
        self.char_to_index
            .get(&c)
            .copied()
            .ok_or(VocabError::UnknownChar(c))
    }

    pub fn index_to_char(&self, index: u32) -> Result<char, VocabError> {
        self.index_to_char
            .get(index as usize)
            .copied()
            .ok_or(VocabError::InvalidIndex { index, len: self.len() })
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>, VocabError> {
        text.chars().map(|c| self.char_to_index(c)).collect()
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String, VocabError> {
        ids.iter().map(|&i| self.index_to_char(i)).collect()
    }

    /// Characters in index order.
    pub fn chars(&self) -> &[char] {
        &self.index_to_char
    }
}

impl From<Vec<char>> for CharVocab {
    fn from(index_to_char: Vec<char>) -> Self {
        let char_to_index = index_to_char
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as u32))
            .collect();
        Self { index_to_char, char_to_index }
    }
}

impl From<CharVocab> for Vec<char> {
    fn from(v: CharVocab) -> Self {
        v.index_to_char
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_equals_distinct_chars() {
        let text  = "First Citizen:\nBefore we proceed any further, hear me speak.";
        let vocab = CharVocab::from_text(text).unwrap();
        let distinct: BTreeSet<char> = text.chars().collect();
        assert_eq!(vocab.len(), distinct.len());
    }

    #[test]
    fn test_indices_follow_sorted_order() {
        let vocab = CharVocab::from_text("hello").unwrap();
        assert_eq!(vocab.chars(), &['e', 'h', 'l', 'o']);
        assert_eq!(vocab.encode("hello").unwrap(), vec![1, 0, 2, 2, 3]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let text  = "ROMEO: wherefore art thou";
        let vocab = CharVocab::from_text(text).unwrap();
        let ids   = vocab.encode(text).unwrap();
        assert_eq!(vocab.decode(&ids).unwrap(), text);
    }

    #[test]
    fn test_unknown_char_is_error() {
        let vocab = CharVocab::from_text("abc").unwrap();
        assert_eq!(vocab.encode("abz"), Err(VocabError::UnknownChar('z')));
    }

    #[test]
    fn test_invalid_index_is_error() {
        let vocab = CharVocab::from_text("abc").unwrap();
        assert_eq!(
            vocab.decode(&[0, 3]),
            Err(VocabError::InvalidIndex { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_empty_corpus_is_error() {
        assert_eq!(CharVocab::from_text(""), Err(VocabError::EmptyCorpus));
    }

    #[test]
    fn test_json_round_trip_keeps_mapping() {
        let vocab = CharVocab::from_text("the quick fox").unwrap();
        let json  = serde_json::to_string(&vocab).unwrap();
        let back: CharVocab = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.char_to_index('q').unwrap(), vocab.char_to_index('q').unwrap());
    }
}
