//! Typed adapters that turn ordinary Rust closures into bindings.
//!
//! The shape of a closure is read off its type once, at bind time, and the
//! resulting invoker only decodes positional arguments and encodes outputs.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;

use super::marshal::{decode_arg, FunctionShape, OutputArity, Outputs};
use crate::error::CallError;

/// Uniform calling convention every binding is adapted to.
pub type Invoker = Box<dyn Fn(&[Box<RawValue>]) -> Result<Outputs, CallError> + Send + Sync>;

/// Trailing parameter that absorbs zero or more remaining arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Variadic<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Return wrapper for any serializable value without a dedicated `IntoReply` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Return types a bound closure may produce.
pub trait IntoReply {
    const OUTPUTS: OutputArity;

    fn into_outputs(self) -> Outputs;
}

impl IntoReply for () {
    const OUTPUTS: OutputArity = OutputArity::Nothing;

    fn into_outputs(self) -> Outputs {
        Outputs::Nothing
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: Serialize,
    E: Display,
{
    const OUTPUTS: OutputArity = OutputArity::ValueAndError;

    fn into_outputs(self) -> Outputs {
        match self {
            Ok(value) => Outputs::ValueAndError(serde_json::to_string(&value), None),
            Err(err) => Outputs::ValueAndError(Ok("null".to_string()), Some(err.to_string())),
        }
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    const OUTPUTS: OutputArity = OutputArity::Value;

    fn into_outputs(self) -> Outputs {
        Outputs::Value(serde_json::to_string(&self.0))
    }
}

macro_rules! value_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                const OUTPUTS: OutputArity = OutputArity::Value;

                fn into_outputs(self) -> Outputs {
                    Outputs::Value(serde_json::to_string(&self))
                }
            }
        )*
    };
}

value_reply!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, JsonValue,
);

impl<T: Serialize> IntoReply for Vec<T> {
    const OUTPUTS: OutputArity = OutputArity::Value;

    fn into_outputs(self) -> Outputs {
        Outputs::Value(serde_json::to_string(&self))
    }
}

impl<T: Serialize> IntoReply for Option<T> {
    const OUTPUTS: OutputArity = OutputArity::Value;

    fn into_outputs(self) -> Outputs {
        Outputs::Value(serde_json::to_string(&self))
    }
}

impl<K, V, S> IntoReply for HashMap<K, V, S>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
    S: BuildHasher,
{
    const OUTPUTS: OutputArity = OutputArity::Value;

    fn into_outputs(self) -> Outputs {
        Outputs::Value(serde_json::to_string(&self))
    }
}

impl<K: Serialize, V: Serialize> IntoReply for BTreeMap<K, V> {
    const OUTPUTS: OutputArity = OutputArity::Value;

    fn into_outputs(self) -> Outputs {
        Outputs::Value(serde_json::to_string(&self))
    }
}

#[doc(hidden)]
pub struct Fixed;

#[doc(hidden)]
pub struct VariadicTail;

/// Closures that can be bound under a name. `M` only disambiguates the
/// fixed-arity and variadic-tail impls and is always inferred.
///
/// Arguments decode strictly: script `undefined` arrives as `null`, which
/// only an `Option<T>` (or `serde_json::Value`) parameter accepts. A plain
/// `i64` given `null` rejects the call with a decode error instead of
/// substituting zero.
pub trait IntoHandler<M>: Send + Sync + 'static {
    fn shape() -> FunctionShape;

    fn into_invoker(self) -> Invoker;
}

fn arg<'a>(raw: &'a [Box<RawValue>], index: usize) -> Result<&'a RawValue, CallError> {
    raw.get(index)
        .map(|value| &**value)
        .ok_or_else(|| CallError::ArgCountMismatch {
            expected: (index + 1).to_string(),
            got: raw.len(),
        })
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, R, $($param,)*> IntoHandler<(Fixed, $($param,)*)> for F
        where
            F: Fn($($param),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $($param: DeserializeOwned,)*
        {
            fn shape() -> FunctionShape {
                FunctionShape::new(
                    vec![$(Cow::Borrowed(std::any::type_name::<$param>()),)*],
                    false,
                    R::OUTPUTS,
                )
            }

            fn into_invoker(self) -> Invoker {
                Box::new(move |raw| {
                    let mut index = 0;
                    $(
                        let $param: $param = decode_arg(index, arg(raw, index)?)?;
                        index += 1;
                    )*
                    Ok((self)($($param),*).into_outputs())
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, R, T, $($param,)*> IntoHandler<(VariadicTail, $($param,)* Variadic<T>)> for F
        where
            F: Fn($($param,)* Variadic<T>) -> R + Send + Sync + 'static,
            R: IntoReply,
            T: DeserializeOwned,
            $($param: DeserializeOwned,)*
        {
            fn shape() -> FunctionShape {
                FunctionShape::new(
                    vec![
                        $(Cow::Borrowed(std::any::type_name::<$param>()),)*
                        Cow::Borrowed(std::any::type_name::<T>()),
                    ],
                    true,
                    R::OUTPUTS,
                )
            }

            fn into_invoker(self) -> Invoker {
                Box::new(move |raw| {
                    let mut index = 0;
                    $(
                        let $param: $param = decode_arg(index, arg(raw, index)?)?;
                        index += 1;
                    )*
                    let rest = raw
                        .iter()
                        .enumerate()
                        .skip(index)
                        .map(|(position, value)| decode_arg::<T>(position, value))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok((self)($($param,)* Variadic(rest)).into_outputs())
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Shape and invoker of a typed closure.
pub fn adapt<M, F: IntoHandler<M>>(f: F) -> (FunctionShape, Invoker) {
    (F::shape(), f.into_invoker())
}
