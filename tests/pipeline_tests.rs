use pretty_assertions::assert_eq;
use std::process::Command;
use stepscope::executor::ExecutorConfig;
use stepscope::pipeline::{FailureKind, TraceResult, Tracer, TracerConfig};
use stepscope::protocol::{check_sequence, EventType, TraceEvent};

const PROGRAM: &str = r#"
public class Main {
    public static void main(String[] args) {
        int x = 5;
        int y = x * 2;
        x = y + 1;
        int[] v = {1, 2};
        v[0] = x;
        System.out.println("x=" + x);
    }
}
"#;

fn jdk_available() -> bool {
    let found = Command::new("javac").arg("-version").output().is_ok_and(|o| o.status.success())
        && Command::new("java").arg("-version").output().is_ok_and(|o| o.status.success());
    if !found {
        eprintln!("javac/java not found on PATH, skipping");
    }
    found
}

#[test]
fn test_end_to_end_trace() {
    if !jdk_available() {
        return;
    }
    let tracer = Tracer::new(TracerConfig::default());
    let result = tracer.execute_and_trace("Main", "main", PROGRAM);

    let TraceResult::Success { events, raw_output, exit_code, .. } = result.clone() else {
        panic!("trace failed: {result:?}");
    };
    assert_eq!(exit_code, Some(0));
    assert!(raw_output.contains("x=11"));

    let actions: Vec<&str> = events.iter().map(|event| event.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "Entering method main",
            "Variable x = 5",
            "Variable y = 10",
            "Variable x = 11",
            "Variable v = [1, 2]",
            "Variable v = [11, 2]",
        ]
    );
    let steps: Vec<u64> = events.iter().map(|event| event.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4, 5, 6]);
    assert!(events.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert_eq!(events[0].vars["method"], "main");
}

#[test]
fn test_sum_scenario_is_deterministic() {
    if !jdk_available() {
        return;
    }
    let source = "public class Main { public static void main(String[] args) { int x = 5; int y = 10; int sum = x + y; } }";
    let tracer = Tracer::default();
    let strip = |result: TraceResult| -> Vec<(u64, EventType, String)> {
        result
            .events()
            .iter()
            .map(|event| (event.step, event.event_type, event.action.clone()))
            .collect()
    };

    let first = strip(tracer.execute_and_trace("Main", "main", source));
    let second = strip(tracer.execute_and_trace("Main", "main", source));
    assert_eq!(
        first,
        vec![
            (1, EventType::MethodEntry, "Entering method main".to_string()),
            (2, EventType::VariableUpdate, "Variable x = 5".to_string()),
            (3, EventType::VariableUpdate, "Variable y = 10".to_string()),
            (4, EventType::VariableUpdate, "Variable sum = 15".to_string()),
        ]
    );
    assert_eq!(first, second);
}

#[test]
fn test_end_to_end_nonzero_exit_is_success() {
    if !jdk_available() {
        return;
    }
    let source = r#"
class Main {
    public static void main(String[] args) {
        int code = 3;
        System.err.println("leaving");
        System.exit(code);
    }
}
"#;
    let result = Tracer::default().execute_and_trace("Main", "main", source);
    let TraceResult::Success { events, raw_output, exit_code, .. } = result.clone() else {
        panic!("trace failed: {result:?}");
    };
    assert_eq!(exit_code, Some(3));
    assert!(raw_output.contains("leaving"));
    assert_eq!(events.last().unwrap().event_type, EventType::VariableUpdate);
}

#[test]
fn test_end_to_end_compile_error() {
    if !jdk_available() {
        return;
    }
    let source = "class Main { public static void main(String[] args) { int x = \"text\"; } }";
    let result = Tracer::default().execute_and_trace("Main", "main", source);
    match result {
        TraceResult::Failure { kind, message } => {
            assert_eq!(kind, FailureKind::CompileError);
            assert!(message.contains("Main.java"));
        }
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[test]
fn test_end_to_end_timeout() {
    if !jdk_available() {
        return;
    }
    let source = "class Main { public static void main(String[] args) { while (true) { } } }";
    let config = TracerConfig::default().with_executor(
        ExecutorConfig::default().with_execution_timeout(std::time::Duration::from_secs(1)),
    );
    let result = Tracer::new(config).execute_and_trace("Main", "main", source);
    assert!(matches!(
        result,
        TraceResult::Failure { kind: FailureKind::ExecutionTimeout, .. }
    ));
}

fn traced(tracer: &Tracer, method: &str, source: &str) -> (Vec<TraceEvent>, String) {
    match tracer.execute_and_trace("Main", method, source) {
        TraceResult::Success { events, raw_output, .. } => (events, raw_output),
        other => panic!("trace failed: {other:?}"),
    }
}

fn actions(events: &[TraceEvent]) -> Vec<&str> {
    events.iter().map(|event| event.action.as_str()).collect()
}

#[test]
fn test_static_initializer_events_start_the_count() {
    if !jdk_available() {
        return;
    }
    let source = r#"
public class Main {
    static int a;
    static int b;
    static {
        a = 1;
        b = 2;
    }
    public static void main(String[] args) {
        int x = a + b;
    }
}
"#;
    let (events, _) = traced(&Tracer::default(), "main", source);
    assert_eq!(
        actions(&events),
        vec!["Variable a = 1", "Variable b = 2", "Entering method main", "Variable x = 3"]
    );
    let steps: Vec<u64> = events.iter().map(|event| event.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);
    assert!(check_sequence(&events).is_empty());
}

#[test]
fn test_narrow_return_types_compile_and_trace() {
    if !jdk_available() {
        return;
    }
    let source = r#"
public class Main {
    static byte pick(int n) {
        return 1;
    }
    static char pick(char c) {
        return 'z';
    }
    public static void main(String[] args) {
        byte b = pick(0);
        char c = pick('y');
    }
}
"#;
    let tracer = Tracer::new(TracerConfig::default().with_trace_returns(true));
    let (events, _) = traced(&tracer, "pick", source);
    assert_eq!(
        actions(&events),
        vec![
            "Entering method pick",
            "Returning from pick: 1",
            "Variable b = 1",
            "Entering method pick",
            "Returning from pick: z",
            "Variable c = z",
        ]
    );
}

#[test]
fn test_non_ascii_values_survive() {
    if !jdk_available() {
        return;
    }
    let source = "public class Main { public static void main(String[] args) { String s = \"héllo→\"; System.out.println(s); } }";
    let (events, raw_output) = traced(&Tracer::default(), "main", source);
    assert_eq!(events[1].action, "Variable s = héllo→");
    assert_eq!(events[1].vars["s"], "héllo→");
    assert!(raw_output.contains("héllo→\n"));
}

#[test]
fn test_partial_lines_do_not_hide_events() {
    if !jdk_available() {
        return;
    }
    let source = r#"
public class Main {
    public static void main(String[] args) {
        System.out.print("hi ");
        int x = 5;
        System.err.print("oops");
        int y = 6;
    }
}
"#;
    let (events, raw_output) = traced(&Tracer::default(), "main", source);
    assert_eq!(
        actions(&events),
        vec!["Entering method main", "Variable x = 5", "Variable y = 6"]
    );
    assert!(raw_output.contains("hi \nTRACE:"));
    assert!(raw_output.contains("oops\nTRACE:"));
}

#[test]
fn test_interface_designated_type_runs() {
    if !jdk_available() {
        return;
    }
    let source = "public interface Main { static void main(String[] args) { int x = 1; x += 2; } }";
    let (events, _) = traced(&Tracer::default(), "main", source);
    assert_eq!(
        actions(&events),
        vec!["Entering method main", "Variable x = 1", "Variable x = 3"]
    );
}

#[test]
fn test_records_sealed_types_and_enum_bodies_run() {
    if !jdk_available() {
        return;
    }
    let source = r#"
sealed interface Shape permits Square {}

final class Square implements Shape {}

enum Op {
    NEG {
        int apply(int v) {
            return -v;
        }
    };

    abstract int apply(int v);
}

public record Main(int n) {
    Main {
        n = Math.abs(n);
    }

    public static void main(String[] args) {
        Main m = new Main(-4);
        Shape s = new Square();
        int twice = Op.NEG.apply(m.n()) * -2;
    }
}
"#;
    let (events, _) = traced(&Tracer::default(), "main", source);
    let actions = actions(&events);
    assert_eq!(actions[..3], ["Entering method main", "Variable n = 4", "Variable m = Main[n=4]"]);
    assert!(actions[3].starts_with("Variable s = Square@"));
    assert_eq!(actions[4], "Variable twice = 8");
    assert_eq!(actions.len(), 5);
}

#[cfg(unix)]
mod stand_in_tools {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_events_decoded_from_runtime_output() {
        let tools = tempfile::tempdir().unwrap();
        let java = script(
            tools.path(),
            "java",
            r#"echo 'TRACE:{"step":1,"event_type":"method_entry","action":"Entering method main","vars":{"method":"main"},"timestamp":1}'
for arg; do last=$arg; done
echo "plain $last"
echo 'TRACE:{"step":2,"event_type":"variable_update","action":"Variable x = 5","vars":{"x":"5"},"timestamp":2}'"#,
        );
        let config = TracerConfig::default().with_executor(
            ExecutorConfig::default()
                .with_compiler(script(tools.path(), "javac", "exit 0"))
                .with_runtime(java),
        );

        let result = Tracer::new(config).execute_and_trace(
            "Main",
            "main",
            "package demo; public class Main { public static void main(String[] a) { int x = 5; } }",
        );
        let TraceResult::Success { events, raw_output, instrumented_source, .. } = result.clone() else {
            panic!("trace failed: {result:?}");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].vars["x"], "5");
        assert!(raw_output.contains("plain demo.Main"));
        assert!(instrumented_source.contains("Main.__traceVariable(\"x\", x);"));
    }

    #[test]
    fn test_compile_timeout_kind() {
        let tools = tempfile::tempdir().unwrap();
        let config = TracerConfig::default().with_executor(
            ExecutorConfig::default()
                .with_compiler(script(tools.path(), "javac", "exec sleep 10"))
                .with_runtime(script(tools.path(), "java", "exit 0"))
                .with_compile_timeout(std::time::Duration::from_millis(300)),
        );
        let result = Tracer::new(config).execute_and_trace(
            "Main",
            "main",
            "class Main { static void main(String[] a) {} }",
        );
        match result {
            TraceResult::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::CompileTimeout);
                assert!(message.starts_with("Compilation timeout"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_runtime_is_execution_error() {
        let tools = tempfile::tempdir().unwrap();
        let config = TracerConfig::default().with_executor(
            ExecutorConfig::default()
                .with_compiler(script(tools.path(), "javac", "exit 0"))
                .with_runtime(tools.path().join("no-such-java")),
        );
        let result = Tracer::new(config).execute_and_trace(
            "Main",
            "main",
            "class Main { static void main(String[] a) {} }",
        );
        assert!(matches!(
            result,
            TraceResult::Failure { kind: FailureKind::ExecutionError, .. }
        ));
    }
}
