//! Byte-key encoding for the RocksDB column families.
//!
//! Typed, sortable byte keys per column family, so that RocksDB's
//! native lexicographic iteration already gives FIFO order for the
//! priority lanes and score order for the processing/delayed sets.

use scheduler_core::task::TaskId;

/// Sequence number for a priority-lane entry, encoded so that
/// unsigned byte-lexicographic order matches signed numeric order
/// (flip the sign bit, matching the classic big-endian bias trick).
pub fn encode_seq(seq: i64) -> [u8; 8] {
    ((seq as u64) ^ 0x8000_0000_0000_0000u64).to_be_bytes()
}

pub fn decode_seq(bytes: &[u8]) -> i64 {
    let raw = u64::from_be_bytes(bytes.try_into().expect("8-byte seq key"));
    (raw ^ 0x8000_0000_0000_0000u64) as i64
}

/// `score ++ task_id`, for the processing and delayed ordered sets.
/// The `task_id` suffix breaks ties between equal scores (FIFO among
/// entries that became eligible/expired at the same second) and keeps
/// the key unique per task.
pub fn encode_score_key(score: i64, task_id: TaskId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&encode_seq(score));
    key.extend_from_slice(&encode_seq(task_id));
    key
}

pub fn decode_score(key: &[u8]) -> i64 {
    decode_seq(&key[0..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_encoding_preserves_ordering_across_sign() {
        let mut seqs = vec![-5_i64, 0, 3, -100, 42, i64::MIN, i64::MAX];
        let mut encoded: Vec<_> = seqs.iter().map(|s| encode_seq(*s)).collect();
        encoded.sort();
        let decoded: Vec<i64> = encoded.iter().map(|b| decode_seq(b)).collect();
        seqs.sort();
        assert_eq!(decoded, seqs);
    }

    #[test]
    fn score_key_breaks_ties_by_task_id() {
        let a = encode_score_key(100, 1);
        let b = encode_score_key(100, 2);
        assert!(a < b);
        assert_eq!(decode_score(&a), 100);
    }
}
