pub mod drag;
pub mod throttle;

pub use drag::{
    hit_test, DragFinish, DragRestore, DragState, Gesture, GestureOutcome, PendingCommit,
    PointerTarget, Refusal,
};
pub use throttle::FrameThrottle;
