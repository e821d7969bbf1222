//! Token filters
//!
//! A filter receives one text increment at a time from the generation
//! provider and decides what the client sees. Two variants exist: a
//! passthrough that forwards everything, and a delimiter-toggling scanner
//! that only exposes content between marker pairs. The variant is chosen
//! at construction time and never changes.

use super::channel::EventSender;
use super::events::StreamEvent;

/// Capability shared by every filter: receive a token increment, receive
/// the end-of-generation signal.
pub trait TokenHandler: Send {
    /// Process one text increment from the generator.
    fn on_token(&mut self, token: &str);

    /// Generation finished (successfully or not). Must send `EndStream`.
    fn on_end(&mut self);
}

/// Forwards every increment unchanged.
#[derive(Debug)]
pub struct PassthroughHandler {
    events: EventSender,
}

impl PassthroughHandler {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TokenHandler for PassthroughHandler {
    fn on_token(&mut self, token: &str) {
        self.events.send(StreamEvent::token(token));
    }

    fn on_end(&mut self) {
        self.events.send(StreamEvent::EndStream);
    }
}

/// Delimiter-toggling scanner.
///
/// Content between a matched pair of delimiter occurrences is streamed to
/// the client; everything outside is suppressed. The same string serves as
/// opener and closer: every complete match flips `emitting`. Matching state
/// carries across increment boundaries, so a delimiter split at any
/// character position over any number of increments behaves identically to
/// one delivered whole.
#[derive(Debug)]
pub struct DelimiterFilter {
    events: EventSender,
    delimiter: Vec<char>,
    match_index: usize,
    emitting: bool,
    buffer: String,
}

impl DelimiterFilter {
    /// Create a filter scanning for `delimiter`. The delimiter must be
    /// non-empty and is fixed for the lifetime of the filter.
    pub fn new(events: EventSender, delimiter: &str) -> Self {
        debug_assert!(!delimiter.is_empty());
        Self {
            events,
            delimiter: delimiter.chars().collect(),
            match_index: 0,
            emitting: false,
            buffer: String::new(),
        }
    }
}

impl TokenHandler for DelimiterFilter {
    fn on_token(&mut self, token: &str) {
        for c in token.chars() {
            if c == self.delimiter[self.match_index] {
                self.match_index += 1;

                if self.match_index == self.delimiter.len() {
                    self.match_index = 0;
                    self.emitting = !self.emitting;

                    // A closing match flushes the region as one flagged event
                    if !self.emitting && !self.buffer.is_empty() {
                        self.events
                            .send(StreamEvent::flush(std::mem::take(&mut self.buffer)));
                    }
                }
            } else {
                // The partially-matched prefix was real content; abandoned
                // prefixes are not re-scanned for new match starts.
                if self.emitting {
                    self.buffer.extend(&self.delimiter[..self.match_index]);
                    self.buffer.push(c);
                }
                self.match_index = 0;
            }
        }

        // Stream in-progress region content instead of waiting for the close
        if self.emitting && !self.buffer.is_empty() {
            self.events
                .send(StreamEvent::token(std::mem::take(&mut self.buffer)));
        }
    }

    fn on_end(&mut self) {
        // Unconditional: an unclosed region is the generator's problem
        self.events.send(StreamEvent::EndStream);
    }
}
