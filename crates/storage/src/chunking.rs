//! Text chunking for email bodies.
//!
//! Splits text into overlapping chunks, preferring paragraph breaks, then
//! line breaks, then word boundaries, and only hard-cutting when a single
//! unbroken run exceeds the chunk size. Sizes are in characters.

/// Split `text` into chunks of at most `chunk_size` characters with
/// `overlap` characters carried between adjacent chunks.
///
/// Overlap is clamped below `chunk_size` so the cursor always advances.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        let only = text.trim();
        return if only.is_empty() {
            Vec::new()
        } else {
            vec![only.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let window_end = (start + chunk_size).min(chars.len());

        let end = if window_end == chars.len() {
            window_end
        } else {
            find_split(&chars, start, window_end)
        };

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end == chars.len() {
            break;
        }

        // Back up by the overlap, but always make forward progress.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Find the best split point in `chars[start..limit]`, scanning backward.
///
/// Prefers a paragraph break, then a newline, then a space. Falls back to
/// a hard cut at `limit`.
fn find_split(chars: &[char], start: usize, limit: usize) -> usize {
    // Only consider splits in the back half of the window so chunks stay
    // reasonably full.
    let floor = start + (limit - start) / 2;

    for i in (floor..limit).rev() {
        if chars[i] == '\n' && i > 0 && chars[i - 1] == '\n' {
            return i + 1;
        }
    }
    for i in (floor..limit).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }
    for i in (floor..limit).rev() {
        if chars[i] == ' ' {
            return i + 1;
        }
    }

    limit
}
