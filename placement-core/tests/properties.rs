//! Property tests for the placement engine invariants.

use placement_core::{
    ArSession, EngineConfig, FrameInput, GestureDelta, ManipulationMachine, NativeHit,
    PlacementStore, PointerEvent, Pose, PoseSourceAdapter, ReticleState, ReticleTracker,
    TrackingMode, Vec3, Viewer,
};
use proptest::prelude::*;

fn visible_reticle(x: f32) -> ReticleState {
    ReticleState {
        visible: true,
        pose: Pose::at(Vec3::new(x, 0.0, -2.0)),
    }
}

fn placed_session() -> ArSession {
    let mut session = ArSession::new(EngineConfig::default()).expect("valid config");
    session.start(TrackingMode::Fallback, None);
    session
        .advance_frame(&FrameInput::new(Viewer::default()))
        .expect("running");
    assert!(session.commit().is_placed());
    session
}

fn arb_normal() -> impl Strategy<Value = Vec3> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
        .prop_filter("non-degenerate", |(x, y, z)| x.abs() + y.abs() + z.abs() > 0.1)
        .prop_map(|(x, y, z)| Vec3::new(x, y, z).normalize())
}

proptest! {
    #[test]
    fn prop_store_never_exceeds_capacity(
        capacity in 1usize..16,
        commits in 0usize..40
    ) {
        let mut store = PlacementStore::new(capacity);
        for i in 0..commits {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32;
            store.commit(&visible_reticle(x));
            prop_assert!(store.len() <= capacity);
        }

        let disposed = store.drain_disposed();
        prop_assert_eq!(store.len(), commits.min(capacity));
        prop_assert_eq!(store.len() + disposed.len(), commits);

        // Oldest go first.
        let mut created: Vec<_> = disposed.iter().map(|o| o.created_at).collect();
        created.extend(store.iter().map(|o| o.created_at));
        prop_assert!(created.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_pinch_scale_always_clamped(
        baseline in 0.3f32..3.0,
        factor in prop_oneof![0.0f32..0.01, 0.01f32..10.0, 10.0f32..1.0e6],
        rotation in -10.0f32..10.0
    ) {
        let config = EngineConfig::default();
        let mut machine = ManipulationMachine::new(config.clone());
        machine.commit(&visible_reticle(0.0));

        let transform = machine
            .apply_delta(
                &GestureDelta::pinch_rotate(factor, rotation),
                (baseline, 0.0),
                &Viewer::default(),
            )
            .expect("active object");

        prop_assert!(transform.scale >= config.min_scale);
        prop_assert!(transform.scale <= config.max_scale);
        prop_assert!(transform.rotation_z >= 0.0);
        prop_assert!(transform.rotation_z < std::f32::consts::TAU);
    }

    #[test]
    fn prop_reticle_accepts_only_walls(normal in arb_normal()) {
        let threshold = 0.2;
        prop_assume!((normal.y.abs() - threshold).abs() > 1e-3);

        let mut reticle = ReticleTracker::new(threshold);
        let hit = NativeHit::from_pose(&Pose::at(Vec3::new(0.0, 0.0, -2.0))).with_normal(normal);
        let adapter = PoseSourceAdapter::default();
        let surface = adapter.normalize(&hit, &Pose::identity());
        reticle.update(surface.as_ref());

        prop_assert_eq!(reticle.is_visible(), normal.y.abs() < threshold);
    }

    #[test]
    fn prop_stationary_pinch_changes_nothing(
        ax in 100.0f32..700.0,
        ay in 100.0f32..500.0,
        bx in 100.0f32..700.0,
        by in 100.0f32..500.0,
        repeats in 1usize..20
    ) {
        let mut session = placed_session();
        session.on_pointer_event(PointerEvent::down(1, 400.0, 300.0));
        session.on_pointer_event(PointerEvent::moved(1, ax, ay));
        session.on_pointer_event(PointerEvent::down(2, bx, by));
        session.advance_frame(&FrameInput::new(Viewer::default())).expect("running");
        let before = session.active_transform().expect("placed");

        for _ in 0..repeats {
            session.on_pointer_event(PointerEvent::moved(1, ax, ay));
            session.on_pointer_event(PointerEvent::moved(2, bx, by));
        }
        session.advance_frame(&FrameInput::new(Viewer::default())).expect("running");
        let after = session.active_transform().expect("placed");

        prop_assert!((after.scale - before.scale).abs() < 1e-6);
        prop_assert!((after.rotation_z - before.rotation_z).abs() < 1e-6);
        prop_assert_eq!(after.position, before.position);
    }

    #[test]
    fn prop_pan_depends_only_on_endpoints(
        path in prop::collection::vec((0.0f32..800.0, 0.0f32..600.0), 1..20)
    ) {
        let mut session = placed_session();
        let start = session.active_transform().expect("placed").position;

        session.on_pointer_event(PointerEvent::down(1, 400.0, 300.0));
        for &(x, y) in &path {
            session.on_pointer_event(PointerEvent::moved(1, x, y));
        }
        session.advance_frame(&FrameInput::new(Viewer::default())).expect("running");

        let (last_x, last_y) = path[path.len() - 1];
        let end = session.active_transform().expect("placed").position;
        let sensitivity = session.config().pan_sensitivity;
        prop_assert!((end.x - start.x - (last_x - 400.0) * sensitivity).abs() < 1e-3);
        prop_assert!((end.y - start.y + (last_y - 300.0) * sensitivity).abs() < 1e-3);
        prop_assert!((end.z - start.z).abs() < 1e-6);
    }

    #[test]
    fn prop_hostile_pointer_input_keeps_transform_finite(
        events in prop::collection::vec(
            (
                0u32..4,
                0u8..4,
                prop_oneof![Just(f32::NAN), Just(f32::INFINITY), -1.0e4f32..1.0e4],
                prop_oneof![Just(f32::NAN), Just(f32::NEG_INFINITY), -1.0e4f32..1.0e4],
            ),
            0..40
        )
    ) {
        let mut session = placed_session();
        for (id, phase, x, y) in events {
            let event = match phase {
                0 => PointerEvent::down(id, x, y),
                1 => PointerEvent::moved(id, x, y),
                2 => PointerEvent::up(id, x, y),
                _ => PointerEvent::cancel(id),
            };
            session.on_pointer_event(event);
        }
        session.advance_frame(&FrameInput::new(Viewer::default())).expect("running");

        let transform = session.active_transform().expect("placed");
        prop_assert!(transform.position.is_finite());
        prop_assert!(transform.scale.is_finite());
        prop_assert!(transform.rotation_z.is_finite());
        prop_assert!(session.gesture_state().pointers.len() <= 2);
    }
}
