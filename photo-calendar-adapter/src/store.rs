/// External UI-state store that persists the scroll position.
///
/// The controller only computes positions; where they are kept is up to the adapter.
pub trait ScrollPositionStore {
    fn scroll_position(&self) -> f64;
    fn set_scroll_position(&mut self, value: f64);
}

impl<S: ScrollPositionStore + ?Sized> ScrollPositionStore for Box<S> {
    fn scroll_position(&self) -> f64 {
        (**self).scroll_position()
    }

    fn set_scroll_position(&mut self, value: f64) {
        (**self).set_scroll_position(value);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InMemoryScrollStore {
    position: f64,
}

impl InMemoryScrollStore {
    pub fn new(position: f64) -> Self {
        Self { position }
    }
}

impl ScrollPositionStore for InMemoryScrollStore {
    fn scroll_position(&self) -> f64 {
        self.position
    }

    fn set_scroll_position(&mut self, value: f64) {
        self.position = value;
    }
}
