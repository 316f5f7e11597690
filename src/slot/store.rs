//! Single-slot frame store
//!
//! The one piece of state shared between a stream's producer task and its
//! consumers.

use std::sync::Arc;

use parking_lot::Mutex;

use super::frame::{Frame, Resolution};

/// Latest-wins frame cell
///
/// Thread-safe via a `parking_lot::Mutex` that is held only for the swap on
/// write or the reference-count bump on read, never across I/O. Cloning the
/// slot clones the handle; all clones see the same frame.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotInner>>,
}

#[derive(Debug)]
struct SlotInner {
    frame: Option<Frame>,
    /// Declared size, used for the placeholder
    resolution: Resolution,
    /// Number of writes so far
    version: u64,
}

impl FrameSlot {
    /// Create an empty slot with the given placeholder resolution
    pub fn new(resolution: Resolution) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner {
                frame: None,
                resolution,
                version: 0,
            })),
        }
    }

    /// Replace the stored frame
    pub fn write(&self, frame: Frame) {
        let mut inner = self.inner.lock();
        inner.frame = Some(frame);
        inner.version += 1;
    }

    /// Get the latest frame, or a zero frame of the declared resolution
    pub fn read(&self) -> Frame {
        self.read_versioned().1
    }

    /// Get the latest frame together with its write version
    ///
    /// Version 0 means nothing has been written and the frame is the
    /// placeholder. Two reads returning the same version returned the same
    /// frame.
    pub fn read_versioned(&self) -> (u64, Frame) {
        let (version, frame, resolution) = {
            let inner = self.inner.lock();
            (inner.version, inner.frame.clone(), inner.resolution)
        };

        // Allocate the placeholder outside the lock
        (version, frame.unwrap_or_else(|| Frame::blank(resolution)))
    }

    /// Current write version
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Whether any frame has been written
    pub fn has_frame(&self) -> bool {
        self.inner.lock().frame.is_some()
    }

    /// Declared placeholder resolution
    pub fn resolution(&self) -> Resolution {
        self.inner.lock().resolution
    }

    /// Change the placeholder resolution (e.g. once a stream negotiated it)
    pub fn set_resolution(&self, resolution: Resolution) {
        self.inner.lock().resolution = resolution;
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new(Resolution::default())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_empty_slot_returns_placeholder() {
        let slot = FrameSlot::new(Resolution::new(640, 480));

        let (version, frame) = slot.read_versioned();
        assert_eq!(version, 0);
        assert_eq!(frame.resolution(), Resolution::new(640, 480));
        assert!(frame.is_blank());
        assert!(!slot.has_frame());
    }

    #[test]
    fn test_write_overwrites() {
        let slot = FrameSlot::new(Resolution::new(4, 4));

        slot.write(Frame::filled(Resolution::new(4, 4), 1));
        slot.write(Frame::filled(Resolution::new(4, 4), 2));

        let (version, frame) = slot.read_versioned();
        assert_eq!(version, 2);
        assert_eq!(frame, Frame::filled(Resolution::new(4, 4), 2));
    }

    #[test]
    fn test_clones_share_state() {
        let slot = FrameSlot::new(Resolution::new(2, 2));
        let reader = slot.clone();

        slot.write(Frame::filled(Resolution::new(2, 2), 9));
        assert!(reader.has_frame());
        assert_eq!(reader.read().pixel(0, 0), Some([9, 9, 9]));
    }

    #[test]
    fn test_set_resolution_changes_placeholder() {
        let slot = FrameSlot::default();
        slot.set_resolution(Resolution::new(1920, 1080));

        assert_eq!(slot.read().resolution(), Resolution::new(1920, 1080));
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let res = Resolution::new(64, 64);
        let slot = FrameSlot::new(res);

        let writer = {
            let slot = slot.clone();
            thread::spawn(move || {
                for value in 1..=200u8 {
                    slot.write(Frame::filled(res, value));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let frame = slot.read();
                        let first = frame.data()[0];
                        // Every byte must come from the same write
                        assert!(frame.data().iter().all(|&b| b == first));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(slot.version(), 200);
        assert_eq!(slot.read(), Frame::filled(res, 200));
    }
}
