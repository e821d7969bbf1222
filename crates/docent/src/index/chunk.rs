//! Text chunking for embedding and retrieval
//!
//! Splits extracted document text into overlapping chunks sized for the
//! embedding model, preferring paragraph breaks, then line breaks, then
//! word boundaries. `chunk_size` is a target measured in characters; a
//! chunk may exceed it by at most the overlap carried from its
//! predecessor.

/// Split separators, coarsest first
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Split `text` into chunks of roughly `chunk_size` characters with
/// `overlap` characters carried between consecutive chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(chunk_size > 0);
    debug_assert!(overlap < chunk_size);

    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let segments = segment(text, 0, chunk_size);
    merge(segments, chunk_size, overlap)
}

/// Break text into pieces no longer than `chunk_size`, descending through
/// the separator hierarchy only where a piece is still too large.
fn segment(text: &str, level: usize, chunk_size: usize) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    if level >= SEPARATORS.len() {
        return hard_split(text, chunk_size);
    }

    let separator = SEPARATORS[level];
    if !text.contains(separator) {
        return segment(text, level + 1, chunk_size);
    }

    let mut pieces = Vec::new();
    for piece in text.split_inclusive(separator) {
        if char_len(piece) <= chunk_size {
            pieces.push(piece.to_string());
        } else {
            pieces.extend(segment(piece, level + 1, chunk_size));
        }
    }
    pieces
}

/// Greedily pack pieces into chunks, seeding each new chunk with the tail
/// of the previous one.
fn merge(segments: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut fresh = false;

    for seg in segments {
        if fresh && char_len(&current) + char_len(&seg) > chunk_size {
            let finished = std::mem::take(&mut current);
            current = char_tail(&finished, overlap);
            chunks.push(finished);
            fresh = false;
        }
        current.push_str(&seg);
        fresh = true;
    }

    if fresh && !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_tail(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let count = char_len(s);
    if count <= n {
        return s.to_string();
    }
    s.chars().skip(count - n).collect()
}

fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|c| c.iter().collect())
        .collect()
}
