// ============== Text Splitting ==============

/// Split `text` into successive chunks of at most `max_len` bytes.
///
/// Chunks are as long as possible but never cut a UTF-8 code point. Empty input
/// yields no chunks.
pub fn split_text(text: &str, max_len: usize) -> Vec<&str> {
    let max_len = max_len.max(4); // room for any single code point
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > max_len {
        let mut cut = max_len;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

// ============== Credential Helpers ==============

/// Mask a bot token for logs: first 7 + `***` + last 4 chars.
///
/// Tokens of 11 chars or fewer are fully masked.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_long_text_into_max_len_chunks() {
        let mut text = "abcd".repeat(2048);
        text.push_str("This start at 8192.");

        let chunks = split_text(&text, 4096);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 4096);
        assert_eq!(chunks[2], "This start at 8192.");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunk_count_is_ceil_of_len() {
        for len in [0usize, 1, 4095, 4096, 4097, 8192, 8193] {
            let text = "x".repeat(len);
            let chunks = split_text(&text, 4096);
            assert_eq!(chunks.len(), len.div_ceil(4096), "len {len}");
            assert!(chunks.iter().all(|c| c.len() <= 4096));
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn never_cuts_a_code_point() {
        let text = "é".repeat(5); // 10 bytes
        let chunks = split_text(&text, 5);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn masks_tokens() {
        assert_eq!(mask_token(""), "***");
        assert_eq!(mask_token("123:abcdefg"), "***");
        assert_eq!(mask_token("123456:ABCdefGHIjkl"), "123456:***Ijkl");
    }
}
