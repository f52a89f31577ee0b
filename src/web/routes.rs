//! Route table and route actions.
//!
//! Routes are built once at startup and looked up by exact path. The method
//! is not used for routing.

use super::assets::AssetStore;
use super::response::content_type;
use super::templates::led_label;
use crate::config::Config;
use crate::device::{DeviceError, DeviceHandle};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Path of the dashboard, also the catch-all
pub const INDEX_PATH: &str = "/";

/// Computes a JSON body from the device
pub type DeviceAction = fn(&DeviceHandle) -> Result<Value, DeviceError>;

/// What a route answers with
#[derive(Debug, Clone)]
pub enum Handler {
    /// Dashboard page rendered from an asset template
    HtmlPage { asset: &'static str },

    /// Asset served verbatim
    StaticAsset {
        content_type: &'static str,
        asset: &'static str,
    },

    /// One JSON object per request
    JsonAction(DeviceAction),

    /// Long-lived SSE stream sampling the device every `interval`
    EventStream {
        event: &'static str,
        interval: Duration,
        sample: DeviceAction,
    },

    /// 404 for unknown paths when the catch-all is disabled
    NotFound,
}

/// A path and its handler
#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub handler: Handler,
}

/// Immutable path → handler table
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Route,
}

impl Router {
    /// Build the node's route table
    pub fn new(sse_interval: Duration, fallback_to_index: bool) -> Self {
        let index = Route {
            path: INDEX_PATH,
            handler: Handler::HtmlPage {
                asset: "index.html",
            },
        };

        let fallback = if fallback_to_index {
            index.clone()
        } else {
            Route {
                path: "*",
                handler: Handler::NotFound,
            }
        };

        let routes = vec![
            index,
            Route {
                path: "/style.css",
                handler: Handler::StaticAsset {
                    content_type: content_type::CSS,
                    asset: "style.css",
                },
            },
            Route {
                path: "/script.js",
                handler: Handler::StaticAsset {
                    content_type: content_type::JS,
                    asset: "script.js",
                },
            },
            Route {
                path: "/led/toggle",
                handler: Handler::JsonAction(toggle_led),
            },
            Route {
                path: "/ldr",
                handler: Handler::JsonAction(read_light),
            },
            Route {
                path: "/events/ldr",
                handler: Handler::EventStream {
                    event: "ldrData",
                    interval: sse_interval,
                    sample: sample_light,
                },
            },
        ];

        Self { routes, fallback }
    }

    /// Build the route table from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sse_interval(), config.fallback_to_index)
    }

    /// Find the route for `path`, or the fallback route
    pub fn resolve(&self, _method: &str, path: &str) -> &Route {
        self.routes
            .iter()
            .find(|route| route.path == path)
            .unwrap_or(&self.fallback)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub device: DeviceHandle,
    pub router: Arc<Router>,
    pub assets: Arc<AssetStore>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(config: &Config, device: DeviceHandle) -> Self {
        Self {
            device,
            router: Arc::new(Router::from_config(config)),
            assets: Arc::new(AssetStore::with_override_dir(config.asset_dir.clone())),
            request_timeout: config.request_timeout(),
        }
    }
}

/// GET /led/toggle - flip the LED, report the new state
pub fn toggle_led(device: &DeviceHandle) -> Result<Value, DeviceError> {
    let on = device.toggle_led();
    tracing::info!("LED now {}", led_label(on));
    Ok(json!({ "led": led_label(on) }))
}

/// GET /ldr - one light reading
pub fn read_light(device: &DeviceHandle) -> Result<Value, DeviceError> {
    let percent = device.read_light_percent()?;
    tracing::debug!("LDR reads {:.2}%", percent);
    Ok(json!({ "graph1": percent }))
}

/// Payload of each `ldrData` event
pub fn sample_light(device: &DeviceHandle) -> Result<Value, DeviceError> {
    Ok(json!({ "ldrData": device.read_light_percent()? }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceState, SimulatedHardware};

    fn router() -> Router {
        Router::new(Duration::from_millis(250), true)
    }

    #[test]
    fn resolves_registered_paths() {
        let router = router();
        for path in ["/", "/style.css", "/script.js", "/led/toggle", "/ldr", "/events/ldr"] {
            assert_eq!(router.resolve("GET", path).path, path);
        }
    }

    #[test]
    fn method_is_not_discriminated() {
        let router = router();
        for method in ["GET", "POST", "DELETE", "BREW"] {
            assert!(matches!(
                router.resolve(method, "/led/toggle").handler,
                Handler::JsonAction(_)
            ));
        }
    }

    #[test]
    fn unknown_paths_fall_back_to_dashboard() {
        let router = router();
        for path in ["/nope", "/led", "/ldr/", "/LED/TOGGLE", "", "/events"] {
            let route = router.resolve("GET", path);
            assert_eq!(route.path, INDEX_PATH, "{path}");
            assert!(matches!(route.handler, Handler::HtmlPage { .. }));
        }
    }

    #[test]
    fn strict_router_answers_not_found() {
        let router = Router::new(Duration::from_millis(250), false);
        assert!(matches!(
            router.resolve("GET", "/nope").handler,
            Handler::NotFound
        ));
        assert!(matches!(
            router.resolve("GET", "/").handler,
            Handler::HtmlPage { .. }
        ));
    }

    #[test]
    fn event_stream_uses_configured_interval() {
        let router = Router::new(Duration::from_millis(40), true);
        match &router.resolve("GET", "/events/ldr").handler {
            Handler::EventStream {
                event, interval, ..
            } => {
                assert_eq!(*event, "ldrData");
                assert_eq!(*interval, Duration::from_millis(40));
            }
            other => panic!("unexpected handler {other:?}"),
        }
    }

    #[test]
    fn toggle_alternates_on_off() {
        let device = DeviceHandle::new(DeviceState::new(Box::new(
            SimulatedHardware::with_sample(0),
        )));
        assert_eq!(toggle_led(&device).unwrap(), json!({"led": "ON"}));
        assert_eq!(toggle_led(&device).unwrap(), json!({"led": "OFF"}));
        assert!(!device.read_led());
    }

    #[test]
    fn light_payloads() {
        let device = DeviceHandle::new(DeviceState::new(Box::new(
            SimulatedHardware::with_sample(u16::MAX),
        )));
        assert_eq!(read_light(&device).unwrap(), json!({"graph1": 100.0}));
        assert_eq!(sample_light(&device).unwrap(), json!({"ldrData": 100.0}));
    }
}
