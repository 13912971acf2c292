use serde::Serialize;

pub const DEFAULT_MAX_SEGMENT_CHARS: usize = 4000;

/// A contiguous slice of the document text. `start`/`end` are character
/// offsets, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl Segment<'_> {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Fixed-width splitter. Boundaries fall every `max_chars` characters and
/// ignore word and sentence structure.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// # Panics
    /// If `max_chars` is 0.
    pub fn new(max_chars: usize) -> Self {
        assert!(max_chars > 0, "segment size must be greater than 0");
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Every call starts a fresh pass over `text`.
    pub fn segments<'a>(&self, text: &'a str) -> Segments<'a> {
        Segments {
            text,
            max_chars: self.max_chars,
            byte_pos: 0,
            char_pos: 0,
            index: 0,
        }
    }

    pub fn segment_count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.max_chars)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEGMENT_CHARS)
    }
}

#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    max_chars: usize,
    byte_pos: usize,
    char_pos: usize,
    index: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.byte_pos..];
        if rest.is_empty() {
            return None;
        }

        let byte_len = rest
            .char_indices()
            .nth(self.max_chars)
            .map_or(rest.len(), |(idx, _)| idx);
        let piece = &rest[..byte_len];
        let chars = piece.chars().count();

        let segment = Segment {
            index: self.index,
            start: self.char_pos,
            end: self.char_pos + chars,
            text: piece,
        };

        self.byte_pos += byte_len;
        self.char_pos += chars;
        self.index += 1;
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_text_has_no_segments() {
        assert_eq!(Chunker::new(10).segments("").count(), 0);
        assert_eq!(Chunker::new(10).segment_count(""), 0);
    }

    #[test]
    fn last_segment_may_be_short() {
        let segments: Vec<_> = Chunker::new(4).segments("abcdefghij").collect();

        assert_eq!(
            segments.iter().map(|s| s.text).collect::<Vec<_>>(),
            vec!["abcd", "efgh", "ij"]
        );
        assert_eq!((segments[2].index, segments[2].start, segments[2].end), (2, 8, 10));
    }

    #[test]
    fn splits_mid_word() {
        let segments: Vec<_> = Chunker::new(5).segments("The cat sat").collect();
        assert_eq!(segments[0].text, "The c");
        assert_eq!(segments[1].text, "at sa");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let segments: Vec<_> = Chunker::new(2).segments("héllo wörld").collect();

        assert_eq!(segments.len(), 6);
        assert_eq!(segments[0].text, "hé");
        assert!(segments.iter().all(|s| s.char_len() <= 2));
    }

    #[test]
    fn segments_are_restartable() {
        let chunker = Chunker::new(3);
        let first: Vec<_> = chunker.segments("restartable").collect();
        let second: Vec<_> = chunker.segments("restartable").collect();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn segments_reassemble_the_text(text in "\\PC{0,300}", max in 1usize..64) {
            let chunker = Chunker::new(max);
            let segments: Vec<_> = chunker.segments(&text).collect();

            let rebuilt: String = segments.iter().map(|s| s.text).collect();
            prop_assert_eq!(&rebuilt, &text);

            let chars = text.chars().count();
            prop_assert_eq!(segments.len(), chars.div_ceil(max));
            prop_assert_eq!(segments.len(), chunker.segment_count(&text));

            let mut expected_start = 0;
            for (i, segment) in segments.iter().enumerate() {
                prop_assert_eq!(segment.index, i);
                prop_assert_eq!(segment.start, expected_start);
                prop_assert!(segment.char_len() <= max);
                prop_assert_eq!(segment.char_len(), segment.text.chars().count());
                expected_start = segment.end;
            }
            prop_assert_eq!(expected_start, chars);
        }
    }
}
