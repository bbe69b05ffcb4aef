//! Property tests for fixed-size chunk offsets.

use kratoshi_rag::chunking::{Chunker, FixedSizeChunker};
use kratoshi_rag::error::RagError;
use proptest::prelude::*;

/// Valid `(chunk_size, chunk_overlap)` pairs.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// *For any* text and valid window, the chunks tile `[0, len)` with a fixed
/// stride, every chunk but the last is exactly `chunk_size` long, chunk text
/// matches its offsets, and the last chunk ends at the end of the text.
mod prop_chunk_offsets {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_cover_text_with_fixed_stride(
            text in "\\PC{0,200}",
            (chunk_size, chunk_overlap) in arb_window(),
        ) {
            let chunker = FixedSizeChunker::new(chunk_size, chunk_overlap).unwrap();
            let chunks = chunker.chunk(&text, "prop.txt");
            let chars: Vec<char> = text.chars().collect();

            if chars.is_empty() {
                prop_assert!(chunks.is_empty());
                return Ok(());
            }

            prop_assert_eq!(chunks[0].metadata.start_char, 0);
            prop_assert_eq!(chunks.last().unwrap().metadata.end_char, chars.len());

            for (i, chunk) in chunks.iter().enumerate() {
                let meta = &chunk.metadata;
                prop_assert_eq!(meta.chunk_id, i);
                prop_assert_eq!(&meta.source, "prop.txt");
                prop_assert_eq!(meta.start_char, i * (chunk_size - chunk_overlap));
                prop_assert!(meta.start_char < meta.end_char);
                if i + 1 < chunks.len() {
                    prop_assert_eq!(meta.end_char - meta.start_char, chunk_size);
                } else {
                    prop_assert!(meta.end_char - meta.start_char <= chunk_size);
                }

                let expected: String = chars[meta.start_char..meta.end_char].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
            }

            for pair in chunks.windows(2) {
                prop_assert!(pair[1].metadata.start_char <= pair[0].metadata.end_char);
            }
        }

        #[test]
        fn overlap_not_smaller_than_size_is_rejected(size in 0usize..40, extra in 0usize..10) {
            prop_assert!(matches!(
                FixedSizeChunker::new(size, size + extra),
                Err(RagError::ConfigError(_))
            ));
        }

        #[test]
        fn short_text_is_a_single_chunk(text in "[a-z ]{1,30}") {
            let chunker = FixedSizeChunker::new(30, 5).unwrap();
            let chunks = chunker.chunk(&text, "short.txt");
            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].text, &text);
        }
    }
}

#[test]
fn worked_example_overlap_and_clipping() {
    let chunker = FixedSizeChunker::new(10, 2).unwrap();
    let chunks = chunker.chunk("abcdefghijklmno", "letters.txt");

    let starts: Vec<usize> = chunks.iter().map(|c| c.metadata.start_char).collect();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(starts, vec![0, 8]);
    assert_eq!(texts, vec!["abcdefghij", "ijklmno"]);
}

#[test]
fn chunking_is_deterministic() {
    let chunker = FixedSizeChunker::new(7, 3).unwrap();
    let text = "Alpha beta gamma delta epsilon zeta eta theta";
    assert_eq!(chunker.chunk(text, "greek.txt"), chunker.chunk(text, "greek.txt"));
}
