use pretty_assertions::assert_eq;
use stepscope::protocol::{check_sequence, parse_trace_output, EventType, TraceSummary};

const RUN: &str = r#"TRACE:{"step":1,"event_type":"method_entry","action":"Entering method main","vars":{"method":"main","args":"[]"},"timestamp":1700000000000}
starting
TRACE:{"step":2,"event_type":"variable_update","action":"Variable x = 5","vars":{"x":"5"},"timestamp":1700000000001}
TRACE:{"step":3,"event_type":"variable_update","action":"Variable s = say \"hi\"","vars":{"s":"say \"hi\"\n"},"timestamp":1700000000001}
Exception in thread "main" java.lang.RuntimeException: boom
TRACE:{"step":4,"event_type":"return","action":"Returning from main: 5","vars":{"method":"main","result":"5"},"timestamp":1700000000003}
"#;

#[test]
fn test_events_in_emission_order() {
    let events = parse_trace_output(RUN);
    let steps: Vec<u64> = events.iter().map(|event| event.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);
    assert_eq!(events[0].vars["args"], "[]");
    assert_eq!(events[2].vars["s"], "say \"hi\"\n");
    assert_eq!(events[3].event_type, EventType::Return);
    assert!(check_sequence(&events).is_empty());
}

#[test]
fn test_truncated_line_does_not_stop_parsing() {
    let raw = format!("{}TRACE:{{\"step\":5,\"event_ty\n{}", RUN, RUN.lines().next().unwrap());
    let events = parse_trace_output(&raw);
    assert_eq!(events.len(), 6);
    assert_eq!(events[4].event_type, EventType::ParseError);
    assert_eq!(events[4].timestamp, 1700000000003);
    assert_eq!(events[5].step, 1);
}

#[test]
fn test_sentinel_must_start_the_line() {
    let raw = "  TRACE:{\"step\":1,\"event_type\":\"call\",\"action\":\"\",\"vars\":{},\"timestamp\":1}\nsay TRACE:\n";
    assert!(parse_trace_output(raw).is_empty());
}

#[test]
fn test_summary_over_run() {
    let summary = TraceSummary::from_events(&parse_trace_output(RUN));
    assert_eq!(summary.total_events, 4);
    assert_eq!(summary.count(EventType::VariableUpdate), 2);
    assert_eq!(summary.count(EventType::MethodEntry), 1);
    assert_eq!(summary.duration_ms, 3);
    assert_eq!(summary.last_values["x"], "5");
}
