//! The consumer-side visual slot a value is bound to.

use crate::binding::types::Placeholder;

/// A visual slot (list cell image, say) that values and placeholders are
/// painted into.
///
/// Targets carry a *tag*: the key of whatever was most recently bound to the
/// slot. Recycling lists rebind slots constantly, so an asynchronously
/// delivered result is only painted if the tag still equals the key it was
/// loaded for; implementations just store and return whatever the binder
/// sets.
///
/// A target handle travels into the loader's worker pool and back, so it
/// must be `Send`; painting itself, however, only ever happens on the
/// consumer context. Handles that point at shared slot state (the common
/// case for recycled cells) should be cheap to clone.
pub trait BindTarget<K, V> {
    /// The key currently bound to this slot, if any.
    fn tag(&self) -> Option<K>;

    /// Bind the slot to `tag` (or clear it with `None`).
    fn set_tag(&mut self, tag: Option<K>);

    /// Paint a loaded value.
    fn show_value(&mut self, value: &V);

    /// Paint a placeholder.
    fn show_placeholder(&mut self, placeholder: Placeholder);
}
