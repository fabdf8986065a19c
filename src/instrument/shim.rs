//! Trace runtime injected into the designated type.
//!
//! The runtime is Java source text, parsed with the same parser as user code
//! and appended as members. The designated type only gets three static hook
//! methods; all state lives in the nested `__traceRuntime` class, which is
//! initialized on the first hook call. That keeps the counter independent of
//! the designated type's own static initialization order and lets interfaces,
//! enums and records carry the runtime too.
//!
//! Wire format of one emitted line:
//! `TRACE:{"step":N,"event_type":"...","action":"...","vars":{...},"timestamp":MS}`
//!
//! `System.out` and `System.err` are wrapped when the runtime initializes, so
//! a trace line is always preceded by a line break when the program left a
//! partial line on either stream.

use super::ValuePolicy;
use crate::syntax::ast::{Member, TypeDecl};
use crate::syntax::parse_members;
use crate::utils::error::SyntaxError;

/// Routine names the hooks call
pub const VARIABLE_HOOK: &str = "__traceVariable";
pub const ENTRY_HOOK: &str = "__traceMethodEntry";
pub const RETURN_HOOK: &str = "__traceReturn";

/// Nested class holding the counter and output state
pub const RUNTIME_CLASS: &str = "__traceRuntime";

const HOOKS: &str = r#"
static void __traceVariable(String name, Object value) {
    __traceRuntime.variable(name, value);
}

static void __traceMethodEntry(String method, Object... pairs) {
    __traceRuntime.methodEntry(method, pairs);
}

static <T> T __traceReturn(String method, T value) {
    __traceRuntime.methodReturn(method, value);
    return value;
}
"#;

const RUNTIME_OPEN: &str = r#"
static final class __traceRuntime {
"#;

const RUNTIME_CLOSE: &str = r#"
}
"#;

const COUNTER_AND_EMIT: &str = r#"
static int step;

static volatile boolean midLine;

static final java.io.PrintStream out = install();

static java.io.PrintStream install() {
    java.io.PrintStream traceOut = new java.io.PrintStream(new LineTracker(System.out), true, java.nio.charset.StandardCharsets.UTF_8);
    System.setOut(traceOut);
    System.setErr(new java.io.PrintStream(new LineTracker(System.err), true, java.nio.charset.StandardCharsets.UTF_8));
    return traceOut;
}

static synchronized void emit(String eventType, String action, String varsJson) {
    if (midLine) {
        out.println();
    }
    out.println("TRACE:{\"step\":" + (++step) + ",\"event_type\":\"" + eventType + "\",\"action\":\"" + escape(action) + "\",\"vars\":{" + varsJson + "},\"timestamp\":" + System.currentTimeMillis() + "}");
    out.flush();
}

static String escape(String text) {
    if (text == null) {
        return "null";
    }
    StringBuilder escaped = new StringBuilder();
    for (int i = 0; i < text.length(); i++) {
        char c = text.charAt(i);
        switch (c) {
            case '"':
                escaped.append("\\\"");
                break;
            case '\\':
                escaped.append("\\\\");
                break;
            case '\n':
                escaped.append("\\n");
                break;
            case '\r':
                escaped.append("\\r");
                break;
            case '\t':
                escaped.append("\\t");
                break;
            default:
                if (c < 0x20) {
                    escaped.append(String.format("\\u%04x", (int) c));
                } else {
                    escaped.append(c);
                }
        }
    }
    return escaped.toString();
}

static String field(String name, String text) {
    return "\"" + escape(name) + "\":\"" + escape(text) + "\"";
}
"#;

const RENDER_DEEP: &str = r#"
static String render(Object value) {
    if (value != null && value.getClass().isArray()) {
        String text = java.util.Arrays.deepToString(new Object[] {value});
        return text.substring(1, text.length() - 1);
    }
    return String.valueOf(value);
}
"#;

const RENDER_IDENTITY: &str = r#"
static String render(Object value) {
    return String.valueOf(value);
}
"#;

const EVENTS: &str = r#"
static void variable(String name, Object value) {
    String text = render(value);
    emit("variable_update", "Variable " + name + " = " + text, field(name, text));
}

static void methodEntry(String method, Object[] pairs) {
    StringBuilder vars = new StringBuilder(field("method", method));
    for (int i = 0; i + 1 < pairs.length; i += 2) {
        vars.append(",").append(field(String.valueOf(pairs[i]), render(pairs[i + 1])));
    }
    emit("method_entry", "Entering method " + method, vars.toString());
}

static void methodReturn(String method, Object value) {
    String text = render(value);
    emit("return", "Returning from " + method + ": " + text, field("method", method) + "," + field("result", text));
}
"#;

const LINE_TRACKER: &str = r#"
static final class LineTracker extends java.io.OutputStream {
    private final java.io.OutputStream target;

    LineTracker(java.io.OutputStream target) {
        this.target = target;
    }

    public void write(int b) throws java.io.IOException {
        target.write(b);
        midLine = b != '\n';
    }

    public void write(byte[] b, int off, int len) throws java.io.IOException {
        if (len > 0) {
            target.write(b, off, len);
            midLine = b[off + len - 1] != '\n';
        }
    }

    public void flush() throws java.io.IOException {
        target.flush();
    }
}
"#;

/// Java source of the runtime members for a value policy
pub fn shim_source(policy: ValuePolicy) -> String {
    let render = match policy {
        ValuePolicy::Deep => RENDER_DEEP,
        ValuePolicy::Identity => RENDER_IDENTITY,
    };
    [
        HOOKS,
        RUNTIME_OPEN,
        COUNTER_AND_EMIT,
        render,
        EVENTS,
        LINE_TRACKER,
        RUNTIME_CLOSE,
    ]
    .concat()
}

/// Parse the runtime into members, minting statement ids from `next_id`
pub fn shim_members(policy: ValuePolicy, next_id: &mut u32) -> Result<Vec<Member>, SyntaxError> {
    parse_members(&shim_source(policy), next_id)
}

/// Append the runtime to `decl`
///
/// **Public** - final step of instrumentation, after all hooks are placed
pub fn attach(decl: &mut TypeDecl, policy: ValuePolicy, next_id: &mut u32) -> Result<(), SyntaxError> {
    for member in shim_members(policy, next_id)? {
        decl.add_member(member);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::SHIM_PREFIX;

    #[test]
    fn test_shim_parses_for_every_policy() {
        for policy in [ValuePolicy::Deep, ValuePolicy::Identity] {
            let mut next_id = 0;
            let members = shim_members(policy, &mut next_id).unwrap();
            assert_eq!(members.len(), 4);
            assert!(next_id > 0);
        }
    }

    #[test]
    fn test_runtime_state_lives_in_nested_class() {
        let mut next_id = 0;
        let members = shim_members(ValuePolicy::Deep, &mut next_id).unwrap();
        let Some(Member::Type(runtime)) = members.last() else {
            panic!("runtime class missing");
        };
        assert_eq!(runtime.name, RUNTIME_CLASS);
        let names = runtime.member_names();
        for name in ["step", "midLine", "out", "emit", "render", "LineTracker"] {
            assert!(names.contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn test_counter_starts_from_default_zero() {
        let source = shim_source(ValuePolicy::Deep);
        // Emitted steps start at 1 whenever the first hook fires
        assert!(source.contains("static int step;"));
        assert!(source.contains("(++step)"));
    }

    #[test]
    fn test_interface_can_carry_runtime() {
        let mut next_id = 0;
        let mut decl = crate::syntax::parse_compilation_unit("interface Main { static void main(String[] a) {} }")
            .unwrap()
            .types
            .remove(0);
        attach(&mut decl, ValuePolicy::Deep, &mut next_id).unwrap();
        let mut direct = Vec::new();
        for member in &decl.members {
            if let Member::Method(method) = member {
                direct.extend(method.modifiers.keywords.iter().cloned());
            }
        }
        // Interfaces reject synchronized methods and mutable fields
        assert!(!direct.iter().any(|keyword| keyword == "synchronized"));
        assert!(!decl.members.iter().any(|member| matches!(member, Member::Field(_))));
    }

    #[test]
    fn test_all_members_use_reserved_prefix() {
        let mut next_id = 0;
        let mut decl = crate::syntax::parse_compilation_unit("class Main {}")
            .unwrap()
            .types
            .remove(0);
        attach(&mut decl, ValuePolicy::Deep, &mut next_id).unwrap();
        let names = decl.member_names();
        assert!(names.iter().all(|name| name.starts_with(SHIM_PREFIX)));
        for routine in [VARIABLE_HOOK, ENTRY_HOOK, RETURN_HOOK] {
            assert!(names.contains(&routine));
        }
    }

    #[test]
    fn test_render_policy_selects_array_handling() {
        assert!(shim_source(ValuePolicy::Deep).contains("deepToString"));
        assert!(!shim_source(ValuePolicy::Identity).contains("deepToString"));
    }
}
