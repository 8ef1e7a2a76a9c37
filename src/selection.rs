//! User-driven background selection shared with the per-cycle pipeline read
//!
//! One writer path (`SelectionControl`) publishes whole snapshots through a
//! `watch` channel; the pipeline reads one consistent snapshot per cycle via
//! `SelectionReader`. A selection change lands on the next cycle at the
//! latest.

use crate::error::SelectionError;
use tokio::sync::watch;

/// What to lay behind the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundSelection {
    /// Camera feed shown as-is
    None,
    /// Blur the live background by the given radius (0 behaves like `None`)
    Blur(u32),
    /// Replace the background with the library image at this index
    Image(usize),
}

impl BackgroundSelection {
    /// Whether compositing changes anything for this selection
    pub fn has_effect(self) -> bool {
        match self {
            BackgroundSelection::None => false,
            BackgroundSelection::Blur(radius) => radius > 0,
            BackgroundSelection::Image(_) => true,
        }
    }
}

/// Immutable view of the selection state; `version` bumps on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    pub image: Option<usize>,
    /// 0 when blur is off
    pub blur_radius: u32,
    pub version: u64,
}

impl SelectionSnapshot {
    /// An image replaces the live background; otherwise blur wins over the
    /// plain feed
    pub fn selection(&self) -> BackgroundSelection {
        match (self.image, self.blur_radius) {
            (Some(index), _) => BackgroundSelection::Image(index),
            (None, 0) => BackgroundSelection::None,
            (None, radius) => BackgroundSelection::Blur(radius),
        }
    }

    pub fn blur_enabled(&self) -> bool {
        self.blur_radius > 0
    }

    /// Radius to blur the selected image by; 0 without an image or blur
    pub fn image_blur(&self) -> u32 {
        if self.image.is_some() {
            self.blur_radius
        } else {
            0
        }
    }
}

/// Writer side of the selection state
#[derive(Debug, Clone)]
pub struct SelectionControl {
    tx: watch::Sender<SelectionSnapshot>,
    library_len: usize,
    blur_radius: u32,
}

/// Reader side, consulted once per cycle
#[derive(Debug, Clone)]
pub struct SelectionReader {
    rx: watch::Receiver<SelectionSnapshot>,
}

impl SelectionControl {
    /// Create the selection state for a library of `library_len` images
    pub fn new(library_len: usize, blur_radius: u32) -> (Self, SelectionReader) {
        let (tx, rx) = watch::channel(SelectionSnapshot::default());
        let control = Self {
            tx,
            library_len,
            blur_radius,
        };
        (control, SelectionReader { rx })
    }

    /// Select a background image, or `None` for the camera feed
    ///
    /// Out-of-range indices are rejected and leave the state untouched.
    pub fn set_background(&self, index: Option<usize>) -> Result<(), SelectionError> {
        if let Some(index) = index {
            if index >= self.library_len {
                return Err(SelectionError::IndexOutOfRange {
                    index,
                    len: self.library_len,
                });
            }
        }

        self.tx.send_if_modified(|state| {
            if state.image == index {
                return false;
            }
            state.image = index;
            state.version += 1;
            true
        });
        tracing::info!("Background set to {:?}", index);
        Ok(())
    }

    pub fn set_blur(&self, enabled: bool) {
        let radius = if enabled { self.blur_radius } else { 0 };
        self.tx.send_if_modified(|state| {
            if state.blur_radius == radius {
                return false;
            }
            state.blur_radius = radius;
            state.version += 1;
            true
        });
        tracing::info!("Blur {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        *self.tx.borrow()
    }

    pub fn library_len(&self) -> usize {
        self.library_len
    }
}

impl SelectionReader {
    /// Latest published state, read as a single unit
    pub fn snapshot(&self) -> SelectionSnapshot {
        *self.rx.borrow()
    }
}
