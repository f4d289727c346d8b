//! Presentation boundary.
//!
//! The core never draws: it hands each agent to a [`Surface`] and asks for
//! repaints from the `play` loop's tick callback. Windows, menus, image
//! export and settings dialogs all live on the other side of this trait.

use crate::agent::Agent;

/// Rendering callback implemented by the presentation layer.
///
/// A `Surface` shared with a thread other than the one driving the engine
/// must be synchronized externally; the core holds no locks.
pub trait Surface {
    /// Draw one agent. `scale` converts world units to surface units.
    /// Implementations typically vary the visual state with
    /// [`Agent::moved`].
    fn draw_agent(&mut self, agent: &Agent, scale: f64);

    /// Present everything drawn since the last repaint.
    fn repaint(&mut self);
}
