//! Interpretation of execution events: `*stopped` records and the
//! breakpoint/watchpoint tuples they carry.

use crate::output::{
    AsyncClass, AsyncKind, Output, OutputKind, ResultClass, ResultNode, Value,
};
use strum_macros::{Display, EnumString};

/// Why the debuggee stopped. The string form parses from the wire keyword
/// and displays as a human explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum StopReason {
    #[strum(serialize = "breakpoint-hit", to_string = "Hit a breakpoint")]
    BreakpointHit,
    #[strum(serialize = "watchpoint-trigger", to_string = "Write watchpoint")]
    WatchpointTrigger,
    #[strum(serialize = "read-watchpoint-trigger", to_string = "Read watchpoint")]
    ReadWatchpointTrigger,
    #[strum(serialize = "access-watchpoint-trigger", to_string = "Access watchpoint")]
    AccessWatchpointTrigger,
    #[strum(serialize = "watchpoint-scope", to_string = "Watchpoint out of scope")]
    WatchpointScope,
    #[strum(serialize = "function-finished", to_string = "Function finished")]
    FunctionFinished,
    #[strum(serialize = "location-reached", to_string = "Location reached")]
    LocationReached,
    #[strum(serialize = "end-stepping-range", to_string = "End of stepping")]
    EndSteppingRange,
    #[strum(serialize = "exited-signalled", to_string = "Exited signalled")]
    ExitedSignalled,
    #[strum(serialize = "exited", to_string = "Exited with error")]
    Exited,
    #[strum(serialize = "exited-normally", to_string = "Exited normally")]
    ExitedNormally,
    #[strum(serialize = "signal-received", to_string = "Signal received")]
    SignalReceived,
    #[default]
    #[strum(serialize = "unknown (temp bkpt?)", to_string = "Unknown (temp bkp?)")]
    Unknown,
}

/// One stack frame as reported inside stop events and backtraces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub level: i32,
    pub addr: u64,
    pub func: Option<String>,
    pub file: Option<String>,
    pub line: u32,
    pub args: Vec<ResultNode>,
}

impl Frame {
    /// Decode the children of a `frame={...}` tuple.
    pub fn from_results(results: &[ResultNode]) -> Frame {
        let mut frame = Frame::default();
        for r in results {
            let Some(name) = r.name.as_deref() else {
                continue;
            };
            match (&r.value, name) {
                (Value::Const(v), "level") => frame.level = to_i32(v),
                (Value::Const(v), "addr") => frame.addr = to_addr(v),
                (Value::Const(v), "func") => frame.func = Some(v.clone()),
                (Value::Const(v), "file") => frame.file = Some(v.clone()),
                (Value::Const(v), "line") => frame.line = to_u32(v),
                (Value::List(args), "args") => frame.args = args.clone(),
                _ => {}
            }
        }
        frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    #[default]
    Unknown,
    Write,
    Read,
    Access,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchpoint {
    pub number: i32,
    pub exp: Option<String>,
    pub mode: WatchMode,
}

impl Watchpoint {
    /// Decode the children of a `wpt`/`hw-rwpt`/`hw-awpt` tuple.
    pub fn from_results(results: &[ResultNode], mode: WatchMode) -> Watchpoint {
        let mut wp = Watchpoint {
            mode,
            ..Watchpoint::default()
        };
        for r in results {
            match (r.value.as_const(), r.name.as_deref()) {
                (Some(v), Some("number")) => wp.number = to_i32(v),
                (Some(v), Some("exp")) => wp.exp = Some(v.to_string()),
                _ => {}
            }
        }
        wp
    }

    /// Find the watchpoint tuple inside a result record, whatever mode key
    /// it was reported under.
    pub fn from_output(output: &Output) -> Option<Watchpoint> {
        for r in &output.results {
            let mode = match r.name.as_deref() {
                Some("wpt") => WatchMode::Write,
                Some("hw-rwpt") => WatchMode::Read,
                Some("hw-awpt") => WatchMode::Access,
                _ => continue,
            };
            return match &r.value {
                Value::Tuple(children) => Some(Watchpoint::from_results(children, mode)),
                _ => None,
            };
        }
        None
    }
}

/// Decoded `*stopped` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stop {
    pub reason: StopReason,
    pub thread_id: Option<i32>,
    pub bkptno: Option<i32>,
    pub exit_code: Option<i32>,
    pub gdb_result_var: Option<String>,
    pub return_value: Option<String>,
    pub signal_name: Option<String>,
    pub signal_meaning: Option<String>,
    pub wp: Option<Watchpoint>,
    pub wp_old: Option<String>,
    pub wp_val: Option<String>,
    pub frame: Option<Frame>,
}

impl Stop {
    /// Decode a stop record produced by the parser.
    pub fn from_output(output: &Output) -> Stop {
        let mut stop = Stop::default();
        for r in &output.results {
            let Some(name) = r.name.as_deref() else {
                continue;
            };
            match &r.value {
                Value::Const(v) => match name {
                    "reason" => stop.reason = v.parse().unwrap_or_default(),
                    "thread-id" if stop.thread_id.is_none() => {
                        stop.thread_id = Some(to_i32(v));
                    }
                    "bkptno" if stop.bkptno.is_none() => stop.bkptno = Some(to_i32(v)),
                    "exit-code" if stop.exit_code.is_none() => {
                        stop.exit_code = Some(to_i32(v));
                    }
                    "gdb-result-var" => stop.gdb_result_var = Some(v.clone()),
                    "return-value" => stop.return_value = Some(v.clone()),
                    "signal_name" => stop.signal_name = Some(v.clone()),
                    "signal_meaning" => stop.signal_meaning = Some(v.clone()),
                    _ => {}
                },
                Value::Tuple(children) | Value::List(children) => match name {
                    "frame" => stop.frame = Some(Frame::from_results(children)),
                    "wpt" if stop.wp.is_none() => {
                        stop.wp = Some(Watchpoint::from_results(children, WatchMode::Write));
                    }
                    "hw-rwpt" if stop.wp.is_none() => {
                        stop.wp = Some(Watchpoint::from_results(children, WatchMode::Read));
                    }
                    "hw-awpt" if stop.wp.is_none() => {
                        stop.wp = Some(Watchpoint::from_results(children, WatchMode::Access));
                    }
                    "value" if stop.wp_old.is_none() && stop.wp_val.is_none() => {
                        for p in children {
                            match (p.value.as_const(), p.name.as_deref()) {
                                (Some(v), Some("value")) | (Some(v), Some("new")) => {
                                    stop.wp_val = Some(v.to_string());
                                }
                                (Some(v), Some("old")) => stop.wp_old = Some(v.to_string()),
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                },
            }
        }
        stop
    }
}

/// First exec-async stopped record in a batch.
pub fn stop_record(batch: &[Output]) -> Option<&Output> {
    batch.iter().find(|o| {
        matches!(
            o.kind,
            OutputKind::Async {
                kind: AsyncKind::Exec,
                class: AsyncClass::Stopped,
            }
        )
    })
}

/// Outcome of scanning a response for the stop condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// An exec-async stopped record was found.
    Stopped(StopReason),
    /// gdb answered with an error record instead.
    GdbError(Option<String>),
}

/// Scan a batch for the stop condition the way interactive frontends do:
/// an error record short-circuits with its message, a stopped record yields
/// its reason, and a stopped record with no reason field reports
/// [`StopReason::Unknown`] (a temporary breakpoint leaves no reason behind).
pub fn async_stop_reason(batch: &[Output]) -> Option<StopOutcome> {
    let mut found_stopped = false;
    for o in batch {
        match o.kind {
            OutputKind::Result(ResultClass::Error) => {
                let msg = o
                    .results
                    .first()
                    .and_then(|r| r.value.as_const())
                    .map(str::to_string);
                return Some(StopOutcome::GdbError(msg));
            }
            OutputKind::Async {
                kind: AsyncKind::Exec,
                class: AsyncClass::Stopped,
            } => {
                found_stopped = true;
                if let Some(reason) = o.find("reason").and_then(|r| r.value.as_const()) {
                    return Some(StopOutcome::Stopped(reason.parse().unwrap_or_default()));
                }
            }
            _ => {}
        }
    }
    found_stopped.then_some(StopOutcome::Stopped(StopReason::Unknown))
}

/// Breakpoint kind slot. `type` and `disp` report into the same slot:
/// `type="breakpoint"` maps to `Breakpoint`, `disp="keep"` to `Keep`, and
/// anything else, `disp="del"` included, collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakpointKind {
    #[default]
    Unknown,
    Breakpoint,
    Keep,
}

/// One breakpoint as reported in a `bkpt={...}` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub number: i32,
    pub kind: BreakpointKind,
    pub enabled: bool,
    pub addr: u64,
    pub func: Option<String>,
    pub file: Option<String>,
    pub line: u32,
    pub times: i32,
    /// `-1` when gdb did not report a thread restriction.
    pub thread: i32,
    /// `-1` when gdb did not report an ignore count.
    pub ignore: i32,
    pub cond: Option<String>,
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self {
            number: 0,
            kind: BreakpointKind::Unknown,
            enabled: false,
            addr: 0,
            func: None,
            file: None,
            line: 0,
            times: 0,
            thread: -1,
            ignore: -1,
            cond: None,
        }
    }
}

impl Breakpoint {
    /// Decode the children of a `bkpt={...}` tuple.
    pub fn from_results(results: &[ResultNode]) -> Breakpoint {
        let mut bkpt = Breakpoint::default();
        for r in results {
            let (Some(v), Some(name)) = (r.value.as_const(), r.name.as_deref()) else {
                continue;
            };
            match name {
                "number" => bkpt.number = to_i32(v),
                "type" => {
                    bkpt.kind = if v == "breakpoint" {
                        BreakpointKind::Breakpoint
                    } else {
                        BreakpointKind::Unknown
                    };
                }
                "disp" => {
                    if v == "keep" {
                        bkpt.kind = BreakpointKind::Keep;
                    } else if v == "del" {
                        bkpt.kind = BreakpointKind::Unknown;
                    }
                }
                "enabled" => bkpt.enabled = v.starts_with('y'),
                "addr" => bkpt.addr = to_addr(v),
                "func" => bkpt.func = Some(v.to_string()),
                "file" => bkpt.file = Some(v.to_string()),
                "line" => bkpt.line = to_u32(v),
                "times" => bkpt.times = to_i32(v),
                "ignore" => bkpt.ignore = to_i32(v),
                "cond" => bkpt.cond = Some(v.to_string()),
                _ => {}
            }
        }
        bkpt
    }
}

fn to_i32(s: &str) -> i32 {
    s.parse().unwrap_or(0)
}

fn to_u32(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}

fn to_addr(s: &str) -> u64 {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).unwrap_or(0)
    } else {
        s.parse().unwrap_or(0)
    }
}
