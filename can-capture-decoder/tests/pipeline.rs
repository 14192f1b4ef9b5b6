//! End-to-end tests over synthesized captures
//!
//! Captures are built record-by-record with the default layout and run
//! through the whole pipeline, including file-backed conversion and a
//! read-back of the measurement container.

use can_capture_decoder::{
    CsvExporter, DecodeError, Mf4Exporter, Pipeline, RecordLayout,
};

const FLAG_EXTENDED_ID: u8 = 0x02;

/// Build one default-layout record from its fields
fn record(ts: f32, flags: u8, pgn: u32, priority: u8, sa: u8, da: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 19];
    bytes[0..4].copy_from_slice(&ts.to_be_bytes());
    bytes[4] = flags;
    bytes[5] = (pgn & 0xFF) as u8;
    bytes[6] = ((pgn >> 8) & 0xFF) as u8;
    bytes[7] = ((pgn >> 16) & 0xFF) as u8;
    bytes[8] = priority;
    bytes[9] = sa;
    bytes[10] = da;
    bytes[11..11 + payload.len()].copy_from_slice(payload);
    bytes
}

fn flags(dlc: u8) -> u8 {
    FLAG_EXTENDED_ID | (dlc << 4)
}

/// A two-frame capture: one PDU2 broadcast, one PDU1 peer-to-peer
fn sample_capture() -> Vec<u8> {
    let mut capture = Vec::new();
    // PF=0xF0, PS=0x04, SA=0x17, priority 6
    capture.extend(record(
        0.25,
        flags(8),
        0xF004,
        6,
        0x17,
        0xFF,
        &[0x10, 0x21, 0, 0, 0, 0xFF, 0xD0, 0xFF],
    ));
    // PF=0xEA, destination 0x32, SA=0x05, priority 3
    capture.extend(record(0.5, flags(3), 0xEA00, 3, 0x05, 0x32, &[1, 2, 3]));
    capture
}

#[test]
fn test_decode_sample_capture() {
    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let rows = pipeline.decode(&sample_capture()).unwrap();
    assert_eq!(rows.len(), 2);

    let broadcast = &rows[0];
    assert_eq!(broadcast.frame.timestamp, 0.25);
    assert_eq!(broadcast.frame.raw_id, 0x18F0_0417);
    assert_eq!(broadcast.id.pgn(), 0xF004);
    assert_eq!(broadcast.id.source(), 0x17);
    assert_eq!(broadcast.id.destination(), None);

    let peer_to_peer = &rows[1];
    assert_eq!(peer_to_peer.frame.raw_id, 0x0CEA_3205);
    assert_eq!(peer_to_peer.id.pgn(), 0xEA00);
    assert_eq!(peer_to_peer.id.destination(), Some(0x32));
    assert_eq!(peer_to_peer.id.source(), 0x05);
    assert_eq!(peer_to_peer.frame.payload(), &[1, 2, 3]);
}

#[test]
fn test_pdu_boundary_formats() {
    let mut capture = Vec::new();
    capture.extend(record(0.0, flags(0), 239 << 8, 0, 0x01, 0x44, &[]));
    capture.extend(record(0.0, flags(0), (240 << 8) | 0x44, 0, 0x01, 0xFF, &[]));

    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let rows = pipeline.decode(&capture).unwrap();
    assert_eq!(rows[0].id.destination(), Some(0x44));
    assert_eq!(rows[0].id.pgn(), 239 << 8);
    assert_eq!(rows[1].id.destination(), None);
    assert_eq!(rows[1].id.pgn(), (240 << 8) | 0x44);
}

#[test]
fn test_row_counts_match_across_sinks() {
    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let rows = pipeline.decode(&sample_capture()).unwrap();

    let mut csv_bytes = Vec::new();
    CsvExporter::new().write(&rows, &mut csv_bytes).unwrap();
    let csv_text = String::from_utf8(csv_bytes).unwrap();
    assert_eq!(csv_text.lines().count(), rows.len() + 1);

    let mf4_bytes = Mf4Exporter::encode(&rows).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mf4_path = dir.path().join("sample.mf4");
    std::fs::write(&mf4_path, &mf4_bytes).unwrap();

    let mdf = mdf4_rs::MDF::from_file(mf4_path.to_str().unwrap()).unwrap();
    let groups = mdf.channel_groups();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.name().unwrap().as_deref(), Some("CAN_DataFrame"));

    // every channel carries one sample per decoded frame
    for channel in group.channels() {
        let values = channel.values().unwrap();
        assert_eq!(values.len(), rows.len());
    }
}

#[test]
fn test_mf4_id_channel_is_plain_unsigned() {
    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let rows = pipeline.decode(&sample_capture()).unwrap();
    let mf4_bytes = Mf4Exporter::encode(&rows).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mf4_path = dir.path().join("ids.mf4");
    std::fs::write(&mf4_path, &mf4_bytes).unwrap();

    let mdf = mdf4_rs::MDF::from_file(mf4_path.to_str().unwrap()).unwrap();
    let groups = mdf.channel_groups();
    let channels = groups[0].channels();
    let id_channel = channels
        .iter()
        .find(|c| c.name().unwrap().as_deref() == Some("CAN_DataFrame.ID"))
        .expect("ID channel missing");

    let expected: Vec<u64> = rows.iter().map(|r| r.frame.raw_id as u64).collect();
    let actual: Vec<u64> = id_channel
        .values()
        .unwrap()
        .into_iter()
        .map(|v| match v {
            Some(mdf4_rs::DecodedValue::UnsignedInteger(raw)) => raw,
            other => panic!("ID sample is not an unsigned integer: {other:?}"),
        })
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_determinism_across_runs() {
    let capture = sample_capture();
    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();

    let first = pipeline.decode(&capture).unwrap();
    let second = pipeline.decode(&capture).unwrap();
    assert_eq!(first, second);

    let mut csv_a = Vec::new();
    let mut csv_b = Vec::new();
    CsvExporter::new().write(&first, &mut csv_a).unwrap();
    CsvExporter::new().write(&second, &mut csv_b).unwrap();
    assert_eq!(csv_a, csv_b);
}

#[test]
fn test_truncated_capture_flushes_decoded_rows() {
    let mut capture = sample_capture();
    capture.extend_from_slice(&[0xAB, 0xCD, 0xEF]); // partial third record

    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();

    // the strict entry point surfaces the truncation
    match pipeline.decode(&capture) {
        Err(DecodeError::TruncatedRecord { offset, remaining, .. }) => {
            assert_eq!(offset, 38);
            assert_eq!(remaining, 3);
        }
        other => panic!("expected truncation, got {other:?}"),
    }

    // the flushing entry point keeps the valid prefix
    let outcome = pipeline.decode_flushing(&capture).unwrap();
    assert_eq!(outcome.rows.len(), 2);
    assert!(outcome.truncated);
}

#[test]
fn test_malformed_record_aborts_capture() {
    let mut capture = sample_capture();
    // third record declares a 9-byte payload
    capture.extend(record(1.0, FLAG_EXTENDED_ID | (9 << 4), 0xF004, 6, 0x17, 0xFF, &[]));

    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    match pipeline.decode_flushing(&capture) {
        Err(DecodeError::MalformedFrame { record, offset, .. }) => {
            assert_eq!(record, 2);
            assert_eq!(offset, 38);
        }
        other => panic!("expected malformed frame, got {other:?}"),
    }
}

#[test]
fn test_convert_file_writes_both_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("trip.bin");
    std::fs::write(&capture_path, sample_capture()).unwrap();
    let out_dir = dir.path().join("results");

    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let summary = pipeline.convert_file(&capture_path, &out_dir).unwrap();

    assert_eq!(summary.frames, 2);
    assert!(!summary.truncated);
    assert_eq!(summary.csv_path, out_dir.join("trip.csv"));
    assert_eq!(summary.mf4_path, out_dir.join("trip.mf4"));

    let csv_text = std::fs::read_to_string(&summary.csv_path).unwrap();
    assert!(csv_text.starts_with("Timestamp;IDE;ID"));
    assert_eq!(csv_text.lines().count(), 3);

    let mf4_bytes = std::fs::read(&summary.mf4_path).unwrap();
    assert_eq!(&mf4_bytes[0..3], b"MDF");
}

#[test]
fn test_convert_file_leaves_nothing_behind_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("broken.bin");
    // single record with an out-of-range priority byte
    std::fs::write(&capture_path, record(0.0, flags(0), 0xF004, 9, 0x17, 0xFF, &[])).unwrap();
    let out_dir = dir.path().join("results");

    let pipeline = Pipeline::new(RecordLayout::default()).unwrap();
    let err = pipeline.convert_file(&capture_path, &out_dir).unwrap_err();
    assert!(matches!(err, DecodeError::MalformedFrame { .. }));

    assert!(!out_dir.join("broken.csv").exists());
    assert!(!out_dir.join("broken.mf4").exists());
}
