use pretty_assertions::assert_eq;
use stepscope::instrument::{build_plan, instrument, InstrumentOptions, ValuePolicy};
use stepscope::syntax::parse_compilation_unit;
use stepscope::utils::error::InstrumentError;

fn instrumented(source: &str, options: &InstrumentOptions) -> String {
    instrument(parse_compilation_unit(source).unwrap(), options)
        .unwrap()
        .source
}

fn main_options() -> InstrumentOptions {
    InstrumentOptions::new("Main", "main")
}

#[test]
fn test_declarations_without_initializer_are_skipped() {
    let source = "class Main { static void main(String[] args) { int a, b = 2, c; a = 1; } }";
    let out = instrumented(source, &main_options());
    assert!(!out.contains("__traceVariable(\"c\""));
    assert_eq!(out.matches("__traceVariable(\"b\", b);").count(), 1);
    assert_eq!(out.matches("__traceVariable(\"a\", a);").count(), 1);
}

#[test]
fn test_hooks_keep_statement_order() {
    let source = "class Main { static void main(String[] args) { int x = 1; int y = 2; x = y; y += x; } }";
    let out = instrumented(source, &main_options());
    let order: Vec<usize> = [
        "int x = 1;",
        "Main.__traceVariable(\"x\", x);",
        "int y = 2;",
        "Main.__traceVariable(\"y\", y);",
        "x = y;",
        "y += x;",
    ]
    .iter()
    .map(|needle| out.find(needle).unwrap())
    .collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
}

#[test]
fn test_unknown_names_and_lambdas_are_not_traced() {
    let source = r#"
class Main {
    static int counter;
    static void main(String[] args) {
        other.value = 3;
        Runnable r = () -> { int inner = 1; };
        for (int i = 0; i < 2; i++) {
        }
    }
}
"#;
    let out = instrumented(source, &main_options());
    assert!(!out.contains("__traceVariable(\"inner\""));
    assert!(!out.contains("__traceVariable(\"other\""));
    assert!(!out.contains("__traceVariable(\"i\""));
    assert!(out.contains("Main.__traceVariable(\"r\", r);"));
}

#[test]
fn test_element_and_increment_updates() {
    let source = "class Main { static void main(String[] args) { int[] v = new int[2]; v[1] = 4; int n = 0; n++; --n; } }";
    let plan = build_plan(&parse_compilation_unit(source).unwrap(), &main_options());
    // v, v[1], n, n++, --n
    assert_eq!(plan.summary().variable_hooks, 5);
}

#[test]
fn test_other_classes_report_through_designated_class() {
    let source = r#"
class Helper {
    static void main(int seed) {
        int local = seed;
    }
}
public class Main {
    public static void main(String[] args) {
        Helper.main(1);
    }
}
"#;
    let result = instrument(parse_compilation_unit(source).unwrap(), &main_options()).unwrap();
    assert!(result.source.contains("Main.__traceVariable(\"local\", local);"));
    assert!(result.source.contains("Main.__traceMethodEntry(\"main\", \"seed\", seed);"));
    assert_eq!(result.file_stem(), "Main");
    assert_eq!(result.main_class(), "Main");
    assert_eq!(result.plan_summary.entry_hooks, 2);
}

#[test]
fn test_identity_policy_changes_runtime_only() {
    let source = "class Main { static void main(String[] args) { int[] a = {1}; } }";
    let deep = instrumented(source, &main_options());
    let identity = instrumented(source, &main_options().with_value_policy(ValuePolicy::Identity));
    assert!(deep.contains("deepToString"));
    assert!(!identity.contains("deepToString"));
    assert!(identity.contains("Main.__traceVariable(\"a\", a);"));
}

#[test]
fn test_returns_traced_only_when_enabled() {
    let source = "class Main { static int main(int n) { if (n > 0) return n; return -n; } }";
    let off = instrumented(source, &main_options());
    assert!(!off.contains("__traceReturn(\"main\""));

    let on = instrumented(source, &main_options().with_trace_returns(true));
    assert!(on.contains("return Main.__traceReturn(\"main\", n);"));
    assert!(on.contains("return Main.__traceReturn(\"main\", -n);"));
}

#[test]
fn test_missing_targets() {
    let unit = parse_compilation_unit("class Main { void run() {} }").unwrap();
    let err = instrument(unit, &main_options()).unwrap_err();
    assert!(matches!(err, InstrumentError::EntryMethodNotFound { ref method, .. } if method == "main"));

    let unit = parse_compilation_unit("class Main { void main() {} }").unwrap();
    let err = instrument(unit, &InstrumentOptions::new("Missing", "main")).unwrap_err();
    assert_eq!(err.to_string(), "Class not found in source: Missing");
}

#[test]
fn test_instrumented_source_reparses() {
    let source = r#"
package demo;

public class Main {
    public static void main(String[] args) {
        int total = 0;
        for (String arg : args) {
            try {
                total += Integer.parseInt(arg);
            } catch (NumberFormatException e) {
                total = -1;
            }
        }
        switch (total) {
            case 0:
                total = 10;
                break;
            default:
                total--;
        }
        System.out.println(total);
    }
}
"#;
    let out = instrumented(source, &main_options());
    let unit = parse_compilation_unit(&out).unwrap();
    assert_eq!(unit.qualified_name("Main"), "demo.Main");
    assert_eq!(out.matches("Main.__traceVariable(\"total\", total);").count(), 5);
}

#[test]
fn test_records_and_enum_bodies() {
    let source = r#"
record Main(int count, String label) {
    Main {
        count = Math.max(count, 0);
    }

    enum Mode {
        FAST {
            int weight() { int w = 1; return w; }
        },
        SLOW;

        int weight() { return 2; }
    }

    public static void main(String[] args) {
        Main m = new Main(3, "x");
        int size = m.count();
    }
}
"#;
    let out = instrumented(source, &main_options());
    // Compact constructor assigns a component
    assert!(out.contains("count = Math.max(count, 0);\n        Main.__traceVariable(\"count\", count);"));
    assert!(out.contains("Main.__traceVariable(\"size\", size);"));
    // Constant bodies are left alone
    assert!(!out.contains("__traceVariable(\"w\""));
    assert!(out.contains("record Main(int count, String label) {"));
    parse_compilation_unit(&out).unwrap();
}

#[test]
fn test_interface_designated_type() {
    let source = "interface Main { static void main(String[] args) { int x = 1; } }";
    let out = instrumented(source, &main_options());
    assert!(out.contains("Main.__traceVariable(\"x\", x);"));
    assert!(out.contains("static final class __traceRuntime {"));
    assert!(out.contains("static void __traceVariable(String name, Object value) {\n        __traceRuntime.variable(name, value);"));
}

#[test]
fn test_sealed_types_are_instrumented() {
    let source = r#"
sealed interface Shape permits Square {}
non-sealed class Square implements Shape {}
public final class Main {
    public static void main(String[] args) {
        Shape s = new Square();
    }
}
"#;
    let out = instrumented(source, &main_options());
    assert!(out.contains("sealed interface Shape permits Square {}"));
    assert!(out.contains("non-sealed class Square implements Shape {}"));
    assert!(out.contains("Main.__traceVariable(\"s\", s);"));
}
