//! Input subsystem.
//!
//! The public API does not expose winit types. The runtime translates
//! platform events into `InputEvent`s and feeds them to `InputState`.

mod frame;
mod state;
mod translate;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub(crate) use translate::translate_window_event;
pub use types::{InputEvent, Key, KeyState, MouseButton, PointerMoveEvent};
