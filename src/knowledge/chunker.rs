/// Splits `text` into windows of `size` whitespace-separated words, each
/// sharing `overlap` words with the previous window.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || size == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn windows_overlap_by_configured_words() {
        let chunks = chunk_words(&words(10), 4, 1);
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]
        );
    }

    #[test]
    fn short_and_empty_texts() {
        assert_eq!(chunk_words("  one\n two ", 100, 20), vec!["one two"]);
        assert!(chunk_words(" \n\t", 100, 20).is_empty());
    }

    #[test]
    fn trailing_window_is_not_duplicated() {
        let chunks = chunk_words(&words(180), 100, 20);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("w80 "));
        assert!(chunks[1].ends_with(" w179"));
    }
}
