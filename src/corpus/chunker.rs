//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and implementations for splitting documents
//! into chunks suitable for embedding.

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document content into chunk texts, in document order.
    fn chunk(&self, content: &str) -> Vec<String>;
}

/// Keeps each document as a single chunk.
#[derive(Debug, Default)]
pub struct WholeDocument;

impl Chunker for WholeDocument {
    fn chunk(&self, content: &str) -> Vec<String> {
        vec![content.to_string()]
    }
}

/// Sentence-packing chunker.
///
/// Algorithm:
/// 1. Split on sentence terminators (`.`, `!`, `?`, `؟`, `。`) followed by whitespace
/// 2. Append sentences to the current chunk while it stays under `max_chars`
/// 3. Start a new chunk when the next sentence would overflow
///
/// A single sentence longer than `max_chars` becomes its own chunk rather
/// than being cut mid-sentence.
#[derive(Debug)]
pub struct SentenceChunker {
    max_chars: usize,
}

impl SentenceChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;

        for sentence in split_sentences(content) {
            let sentence_chars = sentence.chars().count();
            let joined = buffer_chars + usize::from(!buffer.is_empty()) + sentence_chars;

            if !buffer.is_empty() && joined > self.max_chars {
                chunks.push(std::mem::take(&mut buffer));
                buffer_chars = 0;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_chars += 1;
            }
            buffer.push_str(sentence);
            buffer_chars += sentence_chars;
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '؟' | '。')
}

/// Split text into trimmed, non-empty sentences.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        if let Some(&(next_i, next_c)) = chars.peek()
            && next_c.is_whitespace()
        {
            let sentence = text[start..next_i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = next_i;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}
