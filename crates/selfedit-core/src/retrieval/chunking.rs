//! Whitespace chunking of extracted text.

/// Split `text` into chunks of whole words.
///
/// Words are appended to the current chunk while counting each word's
/// length plus one separator; the chunk is closed as soon as that running
/// length exceeds `max_len`, so a chunk may overshoot by one word. A word
/// longer than `max_len` forms its own chunk.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        current.push(word);
        current_len += word.chars().count() + 1;
        if current_len > max_len {
            chunks.push(current.join(" "));
            current.clear();
            current_len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}
