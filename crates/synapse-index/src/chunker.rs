//! Line-aware text chunking with character budget and overlap.

/// One chunk of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub file_path: String,
    /// 1-based inclusive line range.
    pub line_range: (usize, usize),
    pub content_hash: String,
}

/// Chunker configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters (default: 1500).
    pub chunk_size: usize,
    /// Characters of trailing context repeated at the start of the next chunk (default: 200).
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

/// Split `source` into chunks of whole lines, each at most `chunk_size` characters.
///
/// Lines longer than `chunk_size` are cut into fixed-size pieces. Consecutive chunks
/// share up to `chunk_overlap` characters of whole trailing lines. Whitespace-only
/// chunks are dropped.
#[must_use]
pub fn chunk_text(source: &str, file_path: &str, config: &ChunkerConfig) -> Vec<TextChunk> {
    let size = config.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut window: Vec<(usize, &str)> = Vec::new();
    let mut window_len = 0usize;

    for (idx, line) in source.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let line_len = line.chars().count();

        if line_len > size {
            flush(&mut chunks, &window, file_path);
            window.clear();
            window_len = 0;
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(size) {
                push_chunk(
                    &mut chunks,
                    piece.iter().collect(),
                    file_path,
                    (line_no, line_no),
                );
            }
            continue;
        }

        if !window.is_empty() && window_len + line_len > size {
            flush(&mut chunks, &window, file_path);
            let mut kept = 0usize;
            let mut start = window.len();
            while start > 0 {
                let len = window[start - 1].1.chars().count();
                if kept + len > config.chunk_overlap || kept + len + line_len > size {
                    break;
                }
                kept += len;
                start -= 1;
            }
            window.drain(..start);
            window_len = kept;
        }

        window.push((line_no, line));
        window_len += line_len;
    }

    flush(&mut chunks, &window, file_path);
    chunks
}

fn flush(chunks: &mut Vec<TextChunk>, window: &[(usize, &str)], file_path: &str) {
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return;
    };
    let content: String = window.iter().map(|(_, line)| *line).collect();
    push_chunk(chunks, content, file_path, (first.0, last.0));
}

fn push_chunk(
    chunks: &mut Vec<TextChunk>,
    content: String,
    file_path: &str,
    line_range: (usize, usize),
) {
    if content.trim().is_empty() {
        return;
    }
    let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();
    chunks.push(TextChunk {
        content,
        file_path: file_path.to_owned(),
        line_range,
        content_hash,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn small_file_is_single_chunk() {
        let src = "import os\n\nprint(os.getcwd())\n";
        let chunks = chunk_text(src, "main.py", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, src);
        assert_eq!(chunks[0].line_range, (1, 3));
        assert_eq!(chunks[0].file_path, "main.py");
    }

    #[test]
    fn empty_and_blank_sources_produce_nothing() {
        assert!(chunk_text("", "a.md", &ChunkerConfig::default()).is_empty());
        assert!(chunk_text("\n \n\t\n", "a.md", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn chunks_respect_size_limit() {
        let src: String = (0..100).map(|i| format!("line number {i:03}\n")).collect();
        let chunks = chunk_text(&src, "f.txt", &config(64, 20));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 64, "{chunk:?}");
        }
    }

    #[test]
    fn consecutive_chunks_overlap_by_whole_lines() {
        // each line is 16 chars including newline
        let src: String = (0..10).map(|i| format!("line number {i:03}\n")).collect();
        let chunks = chunk_text(&src, "f.txt", &config(48, 16));
        assert_eq!(chunks[0].line_range, (1, 3));
        assert_eq!(chunks[1].line_range, (3, 5));
        assert!(chunks[1].content.starts_with("line number 002"));
    }

    #[test]
    fn zero_overlap_never_repeats_lines() {
        let src: String = (0..10).map(|i| format!("line number {i:03}\n")).collect();
        let chunks = chunk_text(&src, "f.txt", &config(48, 0));
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn long_line_is_cut_into_pieces() {
        let long = "x".repeat(25);
        let src = format!("head\n{long}\ntail\n");
        let chunks = chunk_text(&src, "min.js", &config(10, 0));
        let long_pieces: Vec<_> = chunks.iter().filter(|c| c.line_range == (2, 2)).collect();
        assert_eq!(long_pieces.len(), 3);
        assert_eq!(chunks.first().unwrap().content, "head\n");
        assert_eq!(chunks.last().unwrap().content, "tail\n");
    }

    #[test]
    fn hash_is_deterministic_per_content() {
        let a = chunk_text("fn main() {}\n", "a.rs", &ChunkerConfig::default());
        let b = chunk_text("fn main() {}\n", "b.rs", &ChunkerConfig::default());
        assert_eq!(a[0].content_hash, b[0].content_hash);
        assert_eq!(a[0].content_hash.len(), 64);
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let src = "你好世界\n".repeat(4);
        let chunks = chunk_text(&src, "README.md", &config(10, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].line_range, (1, 2));
    }
}
