//! # MapFy Core
//!
//! Editor core for the MapFy map editor: the state machines that keep an
//! asynchronous external map engine, a vector-edit overlay, derived
//! measurements and server persistence coherent.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                  mapfy-core                    │
//! ├────────────────────────────────────────────────┤
//! │  MapLifecycle      │  DrawTools                │
//! │  - container wait  │  - mode machine           │
//! │  - style reloads   │  - attach/detach          │
//! │  - readiness epoch │  - store/restore snapshot │
//! ├────────────────────────────────────────────────┤
//! │  MeasurementCoordinator │ PersistenceCoordinator│
//! │  - selection/hover      │ - save/load/autosave  │
//! │  - area/length units    │ - single-flight saves │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! The map and drawing engines themselves are external collaborators,
//! reached only through the traits in [`engine`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod api;
pub mod coordinator;
pub mod document;
pub mod draw;
pub mod editor;
pub mod engine;
pub mod error;
pub mod feature;
pub mod lifecycle;
pub mod measure;
pub mod persist;
pub mod retry;
pub mod session;
pub mod viewport;

pub use api::{AuthApi, AuthSuccess, GoogleAuthRequest, LoginRequest, MapsApi, RegisterRequest};
pub use coordinator::{HoverReading, MeasurementCoordinator};
pub use document::{Center, MapDocument, MapPayload, MapSummary};
pub use draw::{DrawMode, DrawTool, DrawTools};
pub use editor::EditorSession;
pub use engine::{
    Container, ContainerHost, DrawOverlay, EngineEvent, MapEngine, MarkerStyle, OverlayEvent,
    OverlayMode, OverlayStyle,
};
pub use error::{EngineError, MapError, MapResult};
pub use feature::{Feature, FeatureCollection, FeatureId, Geometry, LngLat};
pub use lifecycle::{MapLifecycle, MapPhase, ReadySignal};
pub use measure::{measure, ElevationProfile, Measurement};
pub use persist::{PersistenceCoordinator, SavedMapRef};
pub use retry::{attach_with_backoff, RetryConfig};
pub use session::{Session, UserIdentity};
pub use viewport::{StyleReference, Viewport};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
