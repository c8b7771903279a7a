/// RenderQueue — sink receiving the objects accepted by a visibility flood.
///
/// The scene manager never renders. It hands every visible object, in
/// discovery order, to whatever queue the caller passes in.

use super::scene_object::ObjectKey;

pub trait RenderQueue {
    /// Queue one visible object.
    fn enqueue(&mut self, object: ObjectKey);
}

impl RenderQueue for Vec<ObjectKey> {
    fn enqueue(&mut self, object: ObjectKey) {
        self.push(object);
    }
}
