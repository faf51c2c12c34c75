//! W3C trace-context injection into outgoing HTTP headers

use opentelemetry::propagation::{Injector, TextMapPropagator};
use opentelemetry::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Adapter writing propagator fields into a reqwest header map
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Headers carrying `cx` for the given propagator
///
/// Empty when `cx` holds no valid span context.
pub fn inject_context<P: TextMapPropagator>(propagator: &P, cx: &Context) -> HeaderMap {
    let mut headers = HeaderMap::new();
    propagator.inject_context(cx, &mut HeaderInjector(&mut headers));
    headers
}
