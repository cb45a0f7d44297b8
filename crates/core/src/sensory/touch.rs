use crate::types::{PointerEvent, TriggerEvent, TriggerSource};

/// A stroke is a touch drag, or a mouse drag with the primary button held.
pub fn is_stroke(event: PointerEvent) -> bool {
    match event {
        PointerEvent::TouchMove => true,
        PointerEvent::MouseMove { primary_pressed } => primary_pressed,
        PointerEvent::Down | PointerEvent::Up => false,
    }
}

pub fn classify(event: PointerEvent) -> Option<TriggerEvent> {
    is_stroke(event).then(|| TriggerEvent::new(TriggerSource::Touch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strokes() {
        assert!(is_stroke(PointerEvent::TouchMove));
        assert!(is_stroke(PointerEvent::MouseMove { primary_pressed: true }));
        assert!(!is_stroke(PointerEvent::MouseMove { primary_pressed: false }));
        assert!(!is_stroke(PointerEvent::Down));
        assert!(!is_stroke(PointerEvent::Up));
    }
}
