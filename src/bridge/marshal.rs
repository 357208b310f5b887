//! Adapts a callable's parameter list to the untyped JSON-array calling
//! convention used by script call sites, and folds its outputs back into a
//! JSON payload plus a status.

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tracing::warn;

use crate::error::CallError;

/// Outcome reported to the script side. `Ok` resolves the call, `Failed`
/// rejects it with the payload as the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    Failed,
}

impl CallStatus {
    /// Status code understood by the native `return` entry point.
    pub fn code(self) -> i32 {
        match self {
            CallStatus::Ok => 0,
            CallStatus::Failed => -1,
        }
    }
}

/// What a callable hands back, classified by output arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputArity {
    /// No outputs.
    Nothing,
    /// A single error-capable output.
    Error,
    /// A single value.
    Value,
    /// A value followed by an error.
    ValueAndError,
}

impl OutputArity {
    pub fn count(self) -> usize {
        match self {
            OutputArity::Nothing => 0,
            OutputArity::Error | OutputArity::Value => 1,
            OutputArity::ValueAndError => 2,
        }
    }
}

/// Parameter and output layout of a bound callable, computed once at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    params: Vec<Cow<'static, str>>,
    variadic: bool,
    outputs: OutputArity,
}

impl FunctionShape {
    pub fn new(params: Vec<Cow<'static, str>>, variadic: bool, outputs: OutputArity) -> Self {
        let variadic = variadic && !params.is_empty();
        Self {
            params,
            variadic,
            outputs,
        }
    }

    /// Declared parameter types, the variadic tail (if any) last.
    pub fn params(&self) -> &[Cow<'static, str>] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn outputs(&self) -> OutputArity {
        self.outputs
    }

    /// Number of arguments a call site must supply at minimum.
    pub fn required_args(&self) -> usize {
        if self.variadic {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }

    pub fn check_arity(&self, got: usize) -> Result<(), CallError> {
        let required = self.required_args();
        let accepted = if self.variadic {
            got >= required
        } else {
            got == required
        };
        if accepted {
            return Ok(());
        }
        let expected = if self.variadic {
            format!("at least {required}")
        } else {
            required.to_string()
        };
        Err(CallError::ArgCountMismatch { expected, got })
    }
}

impl fmt::Display for FunctionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && index == last {
                f.write_str("...")?;
            }
            f.write_str(param)?;
        }
        f.write_str(")")?;
        match self.outputs {
            OutputArity::Nothing => Ok(()),
            OutputArity::Error => f.write_str(" -> error"),
            OutputArity::Value => f.write_str(" -> value"),
            OutputArity::ValueAndError => f.write_str(" -> (value, error)"),
        }
    }
}

/// Split the raw request into unparsed positional elements.
pub fn parse_request(raw_args: &str) -> Result<Vec<Box<RawValue>>, CallError> {
    serde_json::from_str(raw_args).map_err(CallError::MalformedRequest)
}

/// Decode one positional argument into its declared type.
pub fn decode_arg<T: DeserializeOwned>(index: usize, raw: &RawValue) -> Result<T, CallError> {
    serde_json::from_str(raw.get()).map_err(|source| CallError::ArgDecodeError { index, source })
}

/// A value output, already run through the JSON encoder.
pub type Encoded = Result<String, serde_json::Error>;

/// Outputs of one invocation, before they are folded into a reply.
#[derive(Debug)]
pub enum Outputs {
    Nothing,
    Error(Option<String>),
    Value(Encoded),
    ValueAndError(Encoded, Option<String>),
}

/// JSON payload plus status delivered through the native `return` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: CallStatus,
    pub payload: String,
}

impl Reply {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self {
            status: CallStatus::Ok,
            payload: payload.into(),
        }
    }

    /// Failed reply whose payload is `message` as a JSON string.
    pub fn failed(message: &str) -> Self {
        Self {
            status: CallStatus::Failed,
            payload: quote(message),
        }
    }

    pub fn from_call_error(err: &CallError) -> Self {
        Self::failed(&err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == CallStatus::Ok
    }
}

/// Fold a callable's outputs into a reply. Never panics.
pub fn encode(outputs: Outputs) -> Reply {
    match outputs {
        Outputs::Nothing | Outputs::Error(None) => Reply::ok("null"),
        Outputs::Error(Some(message)) | Outputs::ValueAndError(_, Some(message)) => {
            Reply::failed(&message)
        }
        Outputs::Value(encoded) | Outputs::ValueAndError(encoded, None) => match encoded {
            Ok(json) => Reply::ok(json),
            Err(source) => {
                let err = CallError::ResultEncode(source);
                warn!(target: "bridge", error = %err, "failed to encode bound function result");
                Reply::from_call_error(&err)
            }
        },
    }
}

/// JSON string literal for `message`. Falls back to escaping by hand if the
/// encoder refuses, so the payload is valid JSON either way.
pub fn quote(message: &str) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| quote_by_hand(message))
}

fn quote_by_hand(message: &str) -> String {
    let mut quoted = String::with_capacity(message.len() + 2);
    quoted.push('"');
    for ch in message.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if (c as u32) < 0x20 => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
