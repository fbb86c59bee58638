use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::lenient::Lenient;

/// Argument shape of a declared event, fixed when the schema is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventShape {
    /// No value; client arguments are ignored.
    SenderOnly,
    /// Exactly one argument.
    Single,
    /// Exactly `n` arguments, or one array of `n` elements.
    Tuple(usize),
    /// One variant, by name (case-insensitive) or ordinal.
    Enumeration(&'static [&'static str]),
    /// Streamed file content, delivered outside the argument list.
    Upload,
}

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("argument has the wrong shape: {0}")]
    Coercion(#[source] serde_json::Error),

    #[error("'{0}' is not a variant of this event")]
    UnknownVariant(String),
}

/// Tuples that can be rebuilt from a positional argument list.
pub trait EventTuple: DeserializeOwned + Send + 'static {
    const ARITY: usize;
}

macro_rules! event_tuple {
    ($arity:expr => $($name:ident),+) => {
        impl<$($name),+> EventTuple for ($($name,)+)
        where
            $($name: DeserializeOwned + Send + 'static),+
        {
            const ARITY: usize = $arity;
        }
    };
}

event_tuple!(2 => A, B);
event_tuple!(3 => A, B, C);
event_tuple!(4 => A, B, C, D);
event_tuple!(5 => A, B, C, D, E);

/// Rebuilds a `T` from raw client arguments according to a fixed shape.
#[derive(Debug, Clone)]
pub struct ArgDecoder<T> {
    shape: EventShape,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ArgDecoder<T> {
    pub fn single() -> Self {
        Self::with_shape(EventShape::Single)
    }

    pub fn tuple(arity: usize) -> Self {
        Self::with_shape(EventShape::Tuple(arity))
    }

    pub fn enumeration(variants: &'static [&'static str]) -> Self {
        Self::with_shape(EventShape::Enumeration(variants))
    }

    fn with_shape(shape: EventShape) -> Self {
        Self {
            shape,
            _marker: PhantomData,
        }
    }

    pub fn shape(&self) -> &EventShape {
        &self.shape
    }

    pub fn decode(&self, args: &[Value]) -> Result<T, ArgError> {
        match &self.shape {
            EventShape::Single => match args {
                [value] => coerce(value),
                _ => Err(ArgError::Arity {
                    expected: 1,
                    actual: args.len(),
                }),
            },
            EventShape::Tuple(arity) => match args {
                [Value::Array(items)] if items.len() == *arity => coerce(&args[0]),
                _ if args.len() == *arity => coerce(&Value::Array(args.to_vec())),
                _ => Err(ArgError::Arity {
                    expected: *arity,
                    actual: args.len(),
                }),
            },
            EventShape::Enumeration(variants) => match args {
                [value] => coerce(&Value::String(variant(variants, value)?.to_string())),
                _ => Err(ArgError::Arity {
                    expected: 1,
                    actual: args.len(),
                }),
            },
            EventShape::SenderOnly | EventShape::Upload => Err(ArgError::Arity {
                expected: 0,
                actual: args.len(),
            }),
        }
    }
}

fn variant(variants: &'static [&'static str], value: &Value) -> Result<&'static str, ArgError> {
    let ordinal = match value {
        Value::String(name) => {
            if let Some(found) = variants.iter().copied().find(|v| v.eq_ignore_ascii_case(name)) {
                return Ok(found);
            }
            name.trim().parse::<usize>().ok()
        }
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| usize::try_from(n).ok()),
        _ => None,
    };
    ordinal
        .and_then(|index| variants.get(index).copied())
        .ok_or_else(|| ArgError::UnknownVariant(value.to_string()))
}

/// Deserialize `value` as `T`, accepting numeric strings and integral
/// floats wherever `T` expects a number.
fn coerce<T: DeserializeOwned>(value: &Value) -> Result<T, ArgError> {
    T::deserialize(Lenient(value)).map_err(ArgError::Coercion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Align {
        Start,
        Center,
        End,
    }

    const ALIGN: &[&str] = &["Start", "Center", "End"];

    #[test]
    fn single_requires_one_argument() {
        let decoder = ArgDecoder::<i32>::single();
        assert_eq!(decoder.decode(&[json!(7)]).unwrap(), 7);
        assert!(matches!(
            decoder.decode(&[]),
            Err(ArgError::Arity {
                expected: 1,
                actual: 0
            })
        ));
        assert!(matches!(
            decoder.decode(&[json!(1), json!(2)]),
            Err(ArgError::Arity { .. })
        ));
    }

    #[test]
    fn single_is_lenient_with_numbers() {
        let decoder = ArgDecoder::<i32>::single();
        assert_eq!(decoder.decode(&[json!("42")]).unwrap(), 42);
        assert_eq!(decoder.decode(&[json!(3.0)]).unwrap(), 3);
        assert!(matches!(
            decoder.decode(&[json!(3.5)]),
            Err(ArgError::Coercion(_))
        ));
        assert!(matches!(
            decoder.decode(&[json!("forty")]),
            Err(ArgError::Coercion(_))
        ));
    }

    #[test]
    fn strings_stay_strings() {
        let decoder = ArgDecoder::<String>::single();
        assert_eq!(decoder.decode(&[json!("42")]).unwrap(), "42");
    }

    #[test]
    fn tuple_accepts_positional_or_array() {
        let decoder = ArgDecoder::<(i32, String)>::tuple(2);
        assert_eq!(
            decoder.decode(&[json!(1), json!("a")]).unwrap(),
            (1, "a".to_string())
        );
        assert_eq!(
            decoder.decode(&[json!([2, "b"])]).unwrap(),
            (2, "b".to_string())
        );
    }

    #[test]
    fn tuple_coercion_follows_element_types() {
        let decoder = ArgDecoder::<(String, i64)>::tuple(2);
        assert_eq!(
            decoder.decode(&[json!("007"), json!("5")]).unwrap(),
            ("007".to_string(), 5)
        );
        assert_eq!(
            decoder.decode(&[json!(["42", 2.0])]).unwrap(),
            ("42".to_string(), 2)
        );
        assert!(matches!(
            decoder.decode(&[json!(7), json!(5)]),
            Err(ArgError::Coercion(_))
        ));
    }

    #[test]
    fn record_fields_are_coerced() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Person {
            name: String,
            age: u32,
            admin: bool,
        }

        let decoder = ArgDecoder::<Person>::single();
        assert_eq!(
            decoder
                .decode(&[json!({"name": "1984", "age": "42", "admin": "false"})])
                .unwrap(),
            Person {
                name: "1984".to_string(),
                age: 42,
                admin: false,
            }
        );
        assert!(matches!(
            decoder.decode(&[json!({"name": "x", "age": "-1", "admin": true})]),
            Err(ArgError::Coercion(_))
        ));
    }

    #[test]
    fn tuple_arity_mismatch() {
        let decoder = ArgDecoder::<(i32, i32)>::tuple(2);
        assert!(matches!(
            decoder.decode(&[json!(1)]),
            Err(ArgError::Arity {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            decoder.decode(&[json!(1), json!(2), json!(3)]),
            Err(ArgError::Arity { actual: 3, .. })
        ));
        assert!(decoder.decode(&[json!([1, 2, 3])]).is_err());
    }

    #[test]
    fn enumeration_by_name_or_ordinal() {
        let decoder = ArgDecoder::<Align>::enumeration(ALIGN);
        assert_eq!(decoder.decode(&[json!("center")]).unwrap(), Align::Center);
        assert_eq!(decoder.decode(&[json!("END")]).unwrap(), Align::End);
        assert_eq!(decoder.decode(&[json!(0)]).unwrap(), Align::Start);
        assert_eq!(decoder.decode(&[json!("2")]).unwrap(), Align::End);
        assert!(matches!(
            decoder.decode(&[json!(7)]),
            Err(ArgError::UnknownVariant(_))
        ));
        assert!(matches!(
            decoder.decode(&[json!("middle")]),
            Err(ArgError::UnknownVariant(_))
        ));
    }

    #[test]
    fn tuple_arities() {
        assert_eq!(<(u8, u8) as EventTuple>::ARITY, 2);
        assert_eq!(<(u8, u8, u8, u8) as EventTuple>::ARITY, 4);
    }
}
