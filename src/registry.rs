//! Converter registry: the only extension point of the codec.
//!
//! A converter is a (decode hook, encode hook) pair for opaque leaf types.
//! Hooks answer `Ok(None)` for values they do not recognize so later hooks get
//! a chance; `Err` means the hook recognized the value but could not convert
//! it. Hooks are consulted in registration order and the first match wins.

use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, trace};

use crate::value::{Opaque, Typed};

pub type HookError = Box<dyn std::error::Error + Send + Sync>;
pub type DecodeHook = dyn Fn(&str, &Value) -> Result<Option<Typed>, HookError> + Send + Sync;
pub type EncodeHook = dyn Fn(&Opaque) -> Result<Option<Value>, HookError> + Send + Sync;

#[derive(Clone)]
struct Converter {
    decode: Arc<DecodeHook>,
    encode: Arc<EncodeHook>,
}

/// Append-only list of converters. Register during startup, before documents
/// are decoded; registration is serialized behind a lock either way.
#[derive(Default)]
pub struct Registry {
    converters: RwLock<Vec<Converter>>,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Registers a converter with the process-wide registry.
pub fn register<D, E>(decode: D, encode: E)
where
    D: Fn(&str, &Value) -> Result<Option<Typed>, HookError> + Send + Sync + 'static,
    E: Fn(&Opaque) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
{
    Registry::global().register(decode, encode);
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// The registry [`Decoder`](crate::Decoder) and [`Encoder`](crate::Encoder) use unless told otherwise.
    pub fn global() -> &'static Registry { &GLOBAL }

    pub fn register<D, E>(&self, decode: D, encode: E)
    where
        D: Fn(&str, &Value) -> Result<Option<Typed>, HookError> + Send + Sync + 'static,
        E: Fn(&Opaque) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        let mut converters = self.converters.write().unwrap_or_else(PoisonError::into_inner);
        converters.push(Converter { decode: Arc::new(decode), encode: Arc::new(encode) });
        debug!(converters = converters.len(), "registered converter");
    }

    pub fn len(&self) -> usize {
        self.converters.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    // Hooks run outside the lock so one may register further converters.
    fn snapshot(&self) -> Vec<Converter> {
        self.converters.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn try_decode(&self, type_name: &str, raw: &Value) -> Result<Option<Typed>, HookError> {
        for (index, converter) in self.snapshot().iter().enumerate() {
            trace!(index, type_name, "trying decode hook");
            if let Some(value) = (converter.decode)(type_name, raw)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub fn try_encode(&self, value: &Opaque) -> Result<Option<Value>, HookError> {
        for (index, converter) in self.snapshot().iter().enumerate() {
            trace!(index, type_name = value.type_name(), "trying encode hook");
            if let Some(json) = (converter.encode)(value)? {
                return Ok(Some(json));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Celsius(i64);

    #[derive(Debug, PartialEq)]
    struct Kelvin(i64);

    fn celsius_registry() -> Registry {
        let registry = Registry::new();
        registry.register(
            |name: &str, raw: &Value| match (name, raw.as_i64()) {
                ("celsius", Some(c)) => Ok(Some(Typed::Opaque(Opaque::new(Celsius(c))))),
                _ => Ok(None),
            },
            |value: &Opaque| Ok(value.downcast_ref::<Celsius>().map(|c| json!(c.0))),
        );
        registry
    }

    #[test]
    fn empty_registry_matches_nothing() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.try_decode("celsius", &json!(3)).unwrap().is_none());
        assert!(registry.try_encode(&Opaque::new(Celsius(3))).unwrap().is_none());
    }

    #[test]
    fn falls_through_to_later_hooks() {
        let registry = celsius_registry();
        registry.register(
            |name: &str, raw: &Value| match (name, raw.as_i64()) {
                ("kelvin", Some(k)) => Ok(Some(Typed::Opaque(Opaque::new(Kelvin(k))))),
                _ => Ok(None),
            },
            |value: &Opaque| Ok(value.downcast_ref::<Kelvin>().map(|k| json!(k.0))),
        );
        assert_eq!(registry.len(), 2);

        let kelvin = registry.try_decode("kelvin", &json!(273)).unwrap().unwrap();
        assert_eq!(kelvin, Typed::Opaque(Opaque::new(Kelvin(273))));
        assert_eq!(registry.try_encode(&Opaque::new(Kelvin(273))).unwrap(), Some(json!(273)));
    }

    #[test]
    fn first_registered_match_wins() {
        let registry = celsius_registry();
        registry.register(
            |_: &str, _: &Value| Ok(Some(Typed::Text("shadowed".into()))),
            |_: &Opaque| Ok(Some(json!("shadowed"))),
        );
        let decoded = registry.try_decode("celsius", &json!(20)).unwrap();
        assert_eq!(decoded, Some(Typed::Opaque(Opaque::new(Celsius(20)))));
        assert_eq!(registry.try_decode("other", &json!(20)).unwrap(), Some(Typed::Text("shadowed".into())));
    }

    #[test]
    fn hook_errors_propagate() {
        let registry = Registry::new();
        registry.register(
            |_: &str, _: &Value| Err("broken".into()),
            |_: &Opaque| Ok(None),
        );
        let err = registry.try_decode("anything", &json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "broken");
    }
}
