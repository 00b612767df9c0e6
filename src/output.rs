//! Parsed gdb output records and the generic tree-query primitives that
//! command wrappers are built on.
//!
//! One line of gdb output becomes one [`Output`]. A complete response is a
//! batch (`Vec<Output>`) of the records accumulated between two prompts.
//! Nodes own their children, so releasing a subtree is a drop and extracting
//! one node from a fresh response is a [`take`](Output::take) that leaves the
//! rest of the batch to be dropped in place.

/// Completion class of a result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

/// Out-of-band async record kind, selected by the line prefix
/// (`*` exec, `+` status, `=` notify).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncKind {
    Exec,
    Status,
    Notify,
}

/// Async record class. Only `stopped` is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncClass {
    Stopped,
}

/// Stream record kind, selected by the line prefix
/// (`~` console, `@` target, `&` log).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Console,
    Target,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Result(ResultClass),
    Async { kind: AsyncKind, class: AsyncClass },
    Stream(StreamKind),
}

/// One parsed line of gdb output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub kind: OutputKind,
    /// Ordered fields of the record. A stream record carries exactly one
    /// unnamed const child holding the decoded text.
    pub results: Vec<ResultNode>,
}

/// One `name=value` field, or a bare value when `name` is `None`
/// (an element of a homogeneous value list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultNode {
    pub name: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Decoded quoted string.
    Const(String),
    /// `{...}`, ordered named children.
    Tuple(Vec<ResultNode>),
    /// `[...]`, either named children (record list) or unnamed children
    /// (value list).
    List(Vec<ResultNode>),
}

impl Output {
    /// True for a result record of the given class.
    pub fn is_class(&self, class: ResultClass) -> bool {
        self.kind == OutputKind::Result(class)
    }

    /// First field with the given name, in emission order.
    pub fn find(&self, name: &str) -> Option<&ResultNode> {
        self.results.iter().find(|r| r.name.as_deref() == Some(name))
    }

    /// Extract the first field with the given name, leaving the rest of the
    /// record behind. Dropping the record afterwards releases everything but
    /// the taken node.
    pub fn take(&mut self, name: &str) -> Option<ResultNode> {
        let at = self
            .results
            .iter()
            .position(|r| r.name.as_deref() == Some(name))?;
        Some(self.results.remove(at))
    }

    /// Decoded text of a stream record.
    pub fn stream_text(&self) -> Option<&str> {
        match self.kind {
            OutputKind::Stream(_) => self.results.first().and_then(|r| r.value.as_const()),
            _ => None,
        }
    }
}

impl ResultNode {
    pub fn as_const(&self) -> Option<&str> {
        self.value.as_const()
    }

    pub fn children(&self) -> Option<&[ResultNode]> {
        self.value.children()
    }
}

impl Value {
    pub fn as_const(&self) -> Option<&str> {
        match self {
            Value::Const(s) => Some(s),
            _ => None,
        }
    }

    /// Children of a tuple or list value.
    pub fn children(&self) -> Option<&[ResultNode]> {
        match self {
            Value::Tuple(c) | Value::List(c) => Some(c),
            Value::Const(_) => None,
        }
    }

    /// First named child of a tuple or list value.
    pub fn find(&self, name: &str) -> Option<&ResultNode> {
        self.children()?
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
    }

    /// Extract one named child, leaving the rest of the subtree behind.
    pub fn take(&mut self, name: &str) -> Option<ResultNode> {
        let children = match self {
            Value::Tuple(c) | Value::List(c) => c,
            Value::Const(_) => return None,
        };
        let at = children
            .iter()
            .position(|r| r.name.as_deref() == Some(name))?;
        Some(children.remove(at))
    }
}

/// First result record in a batch.
pub fn find_result_record(batch: &[Output]) -> Option<&Output> {
    batch
        .iter()
        .find(|o| matches!(o.kind, OutputKind::Result(_)))
}

/// Find the result record of a batch, check its class, and extract one named
/// field. The rest of the batch is released on return.
pub fn take_result_var(batch: Vec<Output>, class: ResultClass, name: &str) -> Option<ResultNode> {
    let mut record = batch
        .into_iter()
        .find(|o| matches!(o.kind, OutputKind::Result(_)))?;
    if !record.is_class(class) {
        return None;
    }
    record.take(name)
}

#[cfg(test)]
mod test {
    use super::*;

    fn const_node(name: &str, value: &str) -> ResultNode {
        ResultNode {
            name: Some(name.to_string()),
            value: Value::Const(value.to_string()),
        }
    }

    fn done_record(results: Vec<ResultNode>) -> Output {
        Output {
            kind: OutputKind::Result(ResultClass::Done),
            results,
        }
    }

    #[test]
    fn test_take_detaches_single_node() {
        let mut record = done_record(vec![
            const_node("a", "1"),
            const_node("b", "2"),
            const_node("c", "3"),
        ]);

        let taken = record.take("b").unwrap();
        assert_eq!(taken, const_node("b", "2"));
        assert_eq!(record.results.len(), 2);
        assert!(record.find("b").is_none());

        // first and last position
        assert_eq!(record.take("a").unwrap(), const_node("a", "1"));
        assert_eq!(record.take("c").unwrap(), const_node("c", "3"));
        assert!(record.results.is_empty());
    }

    #[test]
    fn test_take_absent_is_noop() {
        let mut record = done_record(vec![const_node("a", "1")]);
        assert!(record.take("nope").is_none());
        assert_eq!(record.results.len(), 1);
    }

    #[test]
    fn test_take_from_nested_value() {
        let mut frame = Value::Tuple(vec![const_node("level", "0"), const_node("func", "main")]);
        let func = frame.take("func").unwrap();
        assert_eq!(func.as_const(), Some("main"));
        assert_eq!(frame.children().unwrap().len(), 1);
        assert!(Value::Const("x".to_string()).take("func").is_none());
    }

    #[test]
    fn test_find_returns_first_match() {
        let record = done_record(vec![const_node("x", "1"), const_node("x", "2")]);
        assert_eq!(record.find("x").unwrap().as_const(), Some("1"));
    }

    #[test]
    fn test_take_result_var_checks_class() {
        let batch = vec![done_record(vec![const_node("value", "41")])];
        assert!(take_result_var(batch, ResultClass::Running, "value").is_none());

        let batch = vec![
            Output {
                kind: OutputKind::Stream(StreamKind::Console),
                results: vec![ResultNode {
                    name: None,
                    value: Value::Const("noise".to_string()),
                }],
            },
            done_record(vec![const_node("value", "41")]),
        ];
        let var = take_result_var(batch, ResultClass::Done, "value").unwrap();
        assert_eq!(var.as_const(), Some("41"));
    }

    #[test]
    fn test_find_result_record_skips_oob() {
        let batch = vec![
            Output {
                kind: OutputKind::Async {
                    kind: AsyncKind::Exec,
                    class: AsyncClass::Stopped,
                },
                results: vec![],
            },
            done_record(vec![]),
        ];
        assert!(find_result_record(&batch).unwrap().is_class(ResultClass::Done));
        assert!(find_result_record(&[]).is_none());
    }
}
