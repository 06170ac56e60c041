//! Runtime environments a build variant targets.

/// Environment where the generated code will execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Node.js (full APIs, built-in modules stay external)
    Node,
    /// Browser (no built-in modules, browser globals are defined)
    Browser,
}

impl RuntimeEnvironment {
    pub fn externalizes_builtins(self) -> bool {
        matches!(self, Self::Node)
    }
}

/// Node.js built-in module names, without the `node:` prefix.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Whether `specifier` names a Node.js built-in (`fs`, `fs/promises`, `node:test`).
pub fn is_node_builtin(specifier: &str) -> bool {
    // Everything behind `node:` is a built-in, including ones only reachable that way.
    if specifier.starts_with("node:") {
        return true;
    }
    NODE_BUILTINS.contains(&specifier)
}
