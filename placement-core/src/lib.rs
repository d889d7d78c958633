//! # Placement Core
//!
//! Spatial placement and manipulation engine for previewing wall art through
//! a device camera. Compiles to WASM so the browser page that owns the camera
//! and XR session can drive it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     placement-core                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pose Source Adapter  │  Gesture Interpreter                │
//! │  - Hit-test results   │  - Pointer tracking                 │
//! │  - Fallback rays      │  - Pan / pinch-rotate deltas        │
//! ├───────────────────────┼─────────────────────────────────────┤
//! │  Reticle Tracker      │  Manipulation State Machine         │
//! │  - Wall filtering     │  - Idle/Searching/Placed/Manip.     │
//! │                       │  - Scale clamping                   │
//! ├───────────────────────┴─────────────────────────────────────┤
//! │  Placement Store (bounded FIFO)   │  ArSession (lifecycle)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod gesture;
pub mod manipulation;
pub mod reticle;
pub mod session;
pub mod source;
pub mod spatial;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::EngineConfig;
pub use error::{PlacementError, PlacementResult};
pub use event::{PointerEvent, PointerPhase};
pub use gesture::{
    GestureDelta, GestureInterpreter, GestureKind, GesturePhase, GestureSignal, GestureState,
};
pub use manipulation::{ActiveTransform, ManipulationMachine, ManipulationPhase, ScaleStep};
pub use reticle::{ReticleState, ReticleTracker};
pub use session::{
    ArSession, FnSubscription, FrameInput, FrameSummary, SessionSnapshot, SessionStatus,
    TrackingMode, TrackingSubscription,
};
pub use source::{HitSource, NativeHit, PoseSourceAdapter, SurfaceHit};
pub use spatial::{Mat4, Pose, Quat, Ray, Vec3, Viewer};
pub use store::{AnchorId, AnchoredObject, CommitOutcome, PlacementStore};

/// Placement core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
