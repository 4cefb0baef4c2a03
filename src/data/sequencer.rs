// ============================================================
// Layer 4 — Sequencer
// ============================================================
// Turns the encoded corpus into training examples for next-
// character prediction.
//
// The id stream is cut into consecutive, non-overlapping chunks
// of seq_length + 1 ids. Each chunk yields one example:
//
//   chunk:  H e l l o        (seq_length = 4)
//   input:  H e l l
//   target: e l l o          ← shifted one position right
//
// A trailing partial chunk is dropped, so every example has
// exactly seq_length steps.

/// How many full windows of `seq_length` fit in the text.
pub fn examples_per_epoch(text_len: usize, seq_length: usize) -> usize {
    assert!(seq_length > 0, "seq_length must be positive");
    text_len / seq_length
}

/// Split `ids` into chunks of `seq_length + 1`, dropping the remainder.
pub fn chunk_sequences(ids: &[u32], seq_length: usize) -> Vec<Vec<u32>> {
    assert!(seq_length > 0, "seq_length must be positive");
    ids.chunks_exact(seq_length + 1)
        .map(<[u32]>::to_vec)
        .collect()
}

/// Input is the chunk without its last id, target is the chunk without its first.
pub fn split_input_target(chunk: &[u32]) -> (Vec<u32>, Vec<u32>) {
    if chunk.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let input  = chunk[..chunk.len() - 1].to_vec();
    let target = chunk[1..].to_vec();
    (input, target)
}
