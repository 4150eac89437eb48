use proptest::prelude::*;
use qrfile::chunk::{chunk_count, split};
use qrfile::reassemble::{materialize, validate};
use qrfile::record::{decode_record, encode_record, RecordLayout, HEADER_WIDTH};
use qrfile::ChunkSet;

fn layout(capacity: usize) -> RecordLayout {
    RecordLayout::new(HEADER_WIDTH + capacity).unwrap()
}

proptest! {
    #[test]
    fn records_survive_text_roundtrip(
        data in proptest::collection::vec(any::<u8>(), 0..600),
        half_capacity in 1usize..64,
    ) {
        let layout = layout(half_capacity * 2);
        let set = split(&hex::encode(&data), &layout).unwrap();
        let mut parsed: Vec<_> = set
            .iter()
            .map(|c| {
                let text = encode_record(c, &layout);
                prop_assert_eq!(text.len(), layout.record_width());
                Ok(decode_record(&text, &layout).unwrap())
            })
            .collect::<Result<_, TestCaseError>>()?;
        // Scan order carries no meaning.
        parsed.reverse();
        let sorted = validate(ChunkSet::new(parsed)).unwrap();
        prop_assert_eq!(materialize(&sorted).unwrap(), data);
    }

    #[test]
    fn chunk_count_is_ceiling(len in 0usize..10_000, half_capacity in 1usize..800) {
        let capacity = half_capacity * 2;
        let payload = "a".repeat(len);
        let set = split(&payload, &layout(capacity)).unwrap();
        let expected = if len == 0 { 1 } else { (len + capacity - 1) / capacity };
        prop_assert_eq!(set.len(), expected);
        prop_assert_eq!(chunk_count(len, capacity), expected);
        for (i, c) in set.iter().enumerate() {
            prop_assert_eq!(c.index, i as u64);
            prop_assert_eq!(c.total_index, expected as u64 - 1);
            if i + 1 < expected {
                prop_assert_eq!(c.payload_length, capacity as u64);
            }
        }
    }

    #[test]
    fn any_missing_index_is_rejected(count in 2usize..20, drop in 0usize..20) {
        let drop = drop % count;
        let layout = layout(2);
        let payload = "ab".repeat(count);
        let set: ChunkSet = split(&payload, &layout)
            .unwrap()
            .into_iter()
            .filter(|c| c.index != drop as u64)
            .collect();
        let incomplete = matches!(validate(set), Err(qrfile::ValidateError::IncompleteSet { .. }));
        prop_assert!(incomplete);
    }
}
