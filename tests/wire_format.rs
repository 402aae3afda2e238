use livescribe::adapters::JsonLinesSink;
use livescribe::domain::{DomainError, TranscriptionSegment};
use livescribe::ports::SegmentSink;

#[test]
fn test_segment_serializes_to_exact_line() {
    let segment = TranscriptionSegment::new("Hello world", 1024, 2048, 0.92);

    assert_eq!(
        segment.to_json_line().unwrap(),
        "{\"text\":\"Hello world\",\"start_ms\":1024,\"end_ms\":2048,\"confidence\":0.92}\n"
    );
}

#[test]
fn test_sink_writes_one_line_per_segment() {
    let segments = vec![
        TranscriptionSegment::new("first", 0, 500, 0.5),
        TranscriptionSegment::new("with \"quotes\" and\nnewline", 500, 900, 1.0),
    ];
    let mut sink = JsonLinesSink::new(Vec::new());

    for segment in &segments {
        sink.accept(segment).unwrap();
    }
    sink.flush().unwrap();

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let parsed: Vec<TranscriptionSegment> = output
        .lines()
        .map(|line| TranscriptionSegment::from_json_line(line).unwrap())
        .collect();
    assert_eq!(parsed, segments);
}

#[test]
fn test_sink_rejects_malformed_segment_without_writing() {
    let mut sink = JsonLinesSink::new(Vec::new());

    let result = sink.accept(&TranscriptionSegment::new("   ", 0, 10, 0.5));

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(sink.written(), 0);
    assert!(sink.into_inner().is_empty());
}

#[test]
fn test_line_with_missing_field_does_not_parse() {
    let line = "{\"text\":\"x\",\"start_ms\":0,\"end_ms\":5}";

    let result = TranscriptionSegment::from_json_line(line);

    assert!(result.is_err());
}
