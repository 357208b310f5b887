//! Callables whose signature is only known at runtime, for example functions
//! forwarded from another scripting host.

use std::borrow::Cow;
use std::sync::Arc;

use serde::de::Error as _;
use serde_json::Value as JsonValue;

use super::handler::Invoker;
use super::marshal::{decode_arg, FunctionShape, OutputArity, Outputs};
use crate::error::{BindError, CallError};

/// JSON kind a dynamic parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Null,
    Bool,
    Number,
    Integer,
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Null => "null",
            ParamType::Bool => "boolean",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    pub fn accepts(self, value: &JsonValue) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::Null => value.is_null(),
            ParamType::Bool => value.is_boolean(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::String => value.is_string(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Kind of one declared output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Value,
    Error,
}

/// Runtime description of a dynamic callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<ParamType>,
    /// The last entry of `params` absorbs any remaining arguments.
    pub variadic: bool,
    pub outputs: Vec<OutputKind>,
}

impl Signature {
    pub fn new(params: Vec<ParamType>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn returns(mut self, outputs: Vec<OutputKind>) -> Self {
        self.outputs = outputs;
        self
    }

    fn output_arity(&self) -> Result<OutputArity, BindError> {
        match self.outputs.as_slice() {
            [] => Ok(OutputArity::Nothing),
            [OutputKind::Error] => Ok(OutputArity::Error),
            [OutputKind::Value] => Ok(OutputArity::Value),
            [OutputKind::Value, OutputKind::Error] => Ok(OutputArity::ValueAndError),
            _ => Err(BindError::TooManyReturns),
        }
    }

    fn param_type(&self, index: usize) -> ParamType {
        match self.params.get(index) {
            Some(param) => *param,
            None if self.variadic => self.params.last().copied().unwrap_or(ParamType::Any),
            None => ParamType::Any,
        }
    }
}

/// One output produced by a dynamic call.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicOutput {
    Value(JsonValue),
    Error(Option<String>),
}

/// A callable described at runtime rather than by its Rust type.
pub trait DynamicFunction: Send + Sync + 'static {
    /// `None` when the underlying object cannot be invoked.
    fn signature(&self) -> Option<Signature>;

    /// Invoke with arguments already checked against `signature`.
    fn call(&self, args: Vec<JsonValue>) -> Vec<DynamicOutput>;
}

/// Validate a dynamic callable and adapt it to the uniform calling convention.
pub fn adapt_dynamic(
    function: Arc<dyn DynamicFunction>,
) -> Result<(FunctionShape, Invoker), BindError> {
    let signature = function.signature().ok_or(BindError::NotAFunction)?;
    let arity = signature.output_arity()?;
    let shape = FunctionShape::new(
        signature
            .params
            .iter()
            .map(|param| Cow::Borrowed(param.name()))
            .collect(),
        signature.variadic,
        arity,
    );

    let invoker: Invoker = Box::new(move |raw| {
        let mut args = Vec::with_capacity(raw.len());
        for (index, value) in raw.iter().enumerate() {
            let decoded: JsonValue = decode_arg(index, value)?;
            let expected = signature.param_type(index);
            if !expected.accepts(&decoded) {
                let source = serde_json::Error::custom(format!(
                    "invalid type: {}, expected {}",
                    kind_of(&decoded),
                    expected.name()
                ));
                return Err(CallError::ArgDecodeError { index, source });
            }
            args.push(decoded);
        }
        Ok(collect_outputs(arity, function.call(args)))
    });

    Ok((shape, invoker))
}

fn collect_outputs(arity: OutputArity, outputs: Vec<DynamicOutput>) -> Outputs {
    let mut value = None;
    let mut error = None;
    for output in outputs {
        match output {
            DynamicOutput::Value(v) => value = Some(v),
            DynamicOutput::Error(e) => error = e,
        }
    }
    let encoded = || serde_json::to_string(&value.clone().unwrap_or(JsonValue::Null));
    match arity {
        OutputArity::Nothing => Outputs::Nothing,
        OutputArity::Error => Outputs::Error(error),
        OutputArity::Value => Outputs::Value(encoded()),
        OutputArity::ValueAndError => Outputs::ValueAndError(encoded(), error),
    }
}
