//! WebAssembly bindings for placement-core.
//!
//! This module provides JavaScript-callable functions when compiled to WASM.
//! Structured values cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::{
    ArSession, CommitOutcome, EngineConfig, FnSubscription, FrameInput, PointerEvent,
    PointerPhase, ScaleStep, TrackingMode, TrackingSubscription,
};

/// Initialize the placement WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Placement session instance for WASM.
#[wasm_bindgen]
pub struct WasmPlacementSession {
    session: ArSession,
}

#[wasm_bindgen]
impl WasmPlacementSession {
    /// Create a session, optionally from a JSON [`EngineConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON is malformed or the config invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmPlacementSession, String> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        let session = ArSession::new(config).map_err(|e| e.to_string())?;
        Ok(Self { session })
    }

    /// Report that tracking started (`"hit-test"` or `"fallback"`).
    ///
    /// `cancel` is invoked once when the session ends.
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown mode.
    pub fn start(&mut self, mode: &str, cancel: Option<js_sys::Function>) -> Result<(), String> {
        let mode = match mode {
            "hit-test" | "webxr" => TrackingMode::HitTest,
            "fallback" | "webxr-fallback" | "quicklook" => TrackingMode::Fallback,
            other => return Err(format!("Unknown tracking mode: {other}")),
        };
        let subscription = cancel.map(|f| {
            Box::new(FnSubscription::new(move || {
                if let Err(e) = f.call0(&JsValue::NULL) {
                    tracing::warn!("Tracking cancel callback threw: {e:?}");
                }
            })) as Box<dyn TrackingSubscription>
        });
        self.session.start(mode, subscription);
        Ok(())
    }

    /// Report that tracking could not be started.
    #[wasm_bindgen(js_name = reportStartFailure)]
    pub fn report_start_failure(&mut self, reason: &str) {
        self.session.report_start_failure(reason);
    }

    /// Queue a pointer event. Returns `false` for an unknown phase name.
    #[wasm_bindgen(js_name = onPointerEvent)]
    pub fn on_pointer_event(&mut self, id: u32, phase: &str, x: f32, y: f32) -> bool {
        let Some(phase) = PointerPhase::parse(phase) else {
            return false;
        };
        self.session.on_pointer_event(PointerEvent::new(id, phase, x, y));
        true
    }

    /// Advance one frame from a JSON [`FrameInput`]; returns the frame summary.
    ///
    /// # Errors
    ///
    /// Returns an error string for malformed input or a stopped session.
    #[wasm_bindgen(js_name = advanceFrame)]
    pub fn advance_frame(&mut self, frame_json: &str) -> Result<String, String> {
        let frame: FrameInput = serde_json::from_str(frame_json).map_err(|e| e.to_string())?;
        let summary = self
            .session
            .advance_frame(&frame)
            .map_err(|e| e.to_string())?;
        Ok(to_json(&summary))
    }

    /// Place at the reticle; returns the commit outcome as JSON.
    pub fn commit(&mut self) -> String {
        to_json(&self.session.commit())
    }

    /// Place where a fallback ray through `(x, y)` lands.
    #[wasm_bindgen(js_name = placeAtPointer)]
    pub fn place_at_pointer(&mut self, x: f32, y: f32) -> String {
        to_json(&self.session.place_at_pointer(x, y))
    }

    /// Whether the last commit outcome JSON means an object was placed.
    #[wasm_bindgen(js_name = isPlacedOutcome)]
    #[must_use]
    pub fn is_placed_outcome(outcome_json: &str) -> bool {
        serde_json::from_str::<CommitOutcome>(outcome_json).is_ok_and(|o| o.is_placed())
    }

    /// Grow the active object one step.
    #[wasm_bindgen(js_name = scaleUp)]
    pub fn scale_up(&mut self) -> String {
        to_json(&self.session.step_scale(ScaleStep::Up))
    }

    /// Shrink the active object one step.
    #[wasm_bindgen(js_name = scaleDown)]
    pub fn scale_down(&mut self) -> String {
        to_json(&self.session.step_scale(ScaleStep::Down))
    }

    /// Rotate the active object one step.
    #[wasm_bindgen(js_name = rotateStep)]
    pub fn rotate_step(&mut self) -> String {
        to_json(&self.session.rotate_step())
    }

    /// Reset the active object.
    pub fn reset(&mut self) -> String {
        to_json(&self.session.reset_active())
    }

    /// Hold or release reticle-follow repositioning (controller select).
    #[wasm_bindgen(js_name = setRepositioning)]
    pub fn set_repositioning(&mut self, hold: bool) {
        self.session.set_repositioning(hold);
    }

    /// End the session.
    pub fn end(&mut self) {
        self.session.end();
    }

    /// Reticle state as JSON.
    #[wasm_bindgen(js_name = getReticleState)]
    #[must_use]
    pub fn get_reticle_state(&self) -> String {
        to_json(&self.session.reticle_state())
    }

    /// Placed objects as a JSON array, oldest first.
    #[wasm_bindgen(js_name = getPlacedObjects)]
    #[must_use]
    pub fn get_placed_objects(&self) -> String {
        to_json(&self.session.placed_objects().collect::<Vec<_>>())
    }

    /// Active transform as JSON (`null` when nothing is placed).
    #[wasm_bindgen(js_name = getActiveTransform)]
    #[must_use]
    pub fn get_active_transform(&self) -> String {
        to_json(&self.session.active_transform())
    }

    /// Objects to release renderer resources for, as a JSON array.
    #[wasm_bindgen(js_name = drainDisposed)]
    pub fn drain_disposed(&mut self) -> String {
        to_json(&self.session.drain_disposed())
    }

    /// Full session snapshot as JSON.
    #[wasm_bindgen(js_name = getSnapshot)]
    #[must_use]
    pub fn get_snapshot(&self) -> String {
        to_json(&self.session.snapshot())
    }
}
