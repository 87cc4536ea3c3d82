use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Run of queued samples that belong to one track
#[derive(Debug)]
struct Segment {
    track_id: String,
    remaining: usize,
}

struct TrackQueueInner {
    samples: HeapRb<i16>,
    segments: VecDeque<Segment>,
    /// Track audible right now; cleared once the queue runs dry
    current: Option<String>,
    /// Samples played so far, per track
    played: HashMap<String, u64>,
    /// Tracks cut off by an interrupt; later audio for them is dropped
    interrupted: HashSet<String>,
    /// Bumped by every interrupt and reset
    generation: u64,
}

/// Thread-safe playback queue that remembers which track every sample belongs to.
///
/// The output callback drains it with [`TrackQueue::fill`]; an interrupt
/// reports the audible track and how many of its samples were played.
pub struct TrackQueue {
    inner: Arc<Mutex<TrackQueueInner>>,
}

impl TrackQueue {
    /// Create a new queue holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackQueueInner {
                samples: HeapRb::new(capacity.max(1)),
                segments: VecDeque::new(),
                current: None,
                played: HashMap::new(),
                interrupted: HashSet::new(),
                generation: 0,
            })),
        }
    }

    /// Queue samples for `track_id`.
    /// Returns the number of samples actually queued.
    pub fn push(&self, track_id: &str, samples: &[i16]) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.interrupted.contains(track_id) {
            debug!("Dropping {} samples for interrupted track {}", samples.len(), track_id);
            return 0;
        }

        let written = inner.samples.push_slice(samples);
        if written < samples.len() {
            warn!(
                "Playback queue full, dropped {} samples of track {}",
                samples.len() - written,
                track_id
            );
        }
        if written == 0 {
            return 0;
        }

        // Extend the tail segment when the same track keeps streaming
        let same_track = inner
            .segments
            .back()
            .is_some_and(|segment| segment.track_id == track_id);
        if same_track {
            if let Some(segment) = inner.segments.back_mut() {
                segment.remaining += written;
            }
        } else {
            inner.segments.push_back(Segment {
                track_id: track_id.to_string(),
                remaining: written,
            });
        }

        written
    }

    /// Move queued samples into `out`, oldest first.
    /// Returns the number of samples written; the rest of `out` is untouched.
    pub fn fill(&self, out: &mut [i16]) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let count = inner.samples.pop_slice(out);

        let mut left = count;
        while left > 0 {
            let Some(segment) = inner.segments.front_mut() else {
                break;
            };
            let taken = segment.remaining.min(left);
            segment.remaining -= taken;
            left -= taken;

            let track_id = segment.track_id.clone();
            if segment.remaining == 0 {
                inner.segments.pop_front();
            }

            *inner.played.entry(track_id.clone()).or_insert(0) += taken as u64;
            inner.current = Some(track_id);
        }

        if inner.segments.is_empty() {
            // Drained: nothing is audible any more. Keep the count of the
            // last track in case more of it arrives.
            let last = inner.current.take();
            inner.played.retain(|id, _| last.as_ref() == Some(id));
        }

        count
    }

    /// Stop everything: clear queued audio and report the audible track.
    ///
    /// Returns `(track_id, samples_played)` for the track being played, or
    /// `None` if the queue had already run dry or nothing has played since
    /// the previous interrupt.
    pub fn interrupt(&self) -> Option<(String, u64)> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        inner.samples.clear();
        inner.segments.clear();
        inner.generation += 1;

        let track_id = inner.current.take()?;
        let offset = inner.played.get(&track_id).copied().unwrap_or(0);
        inner.played.clear();
        inner.interrupted.insert(track_id.clone());

        debug!("Interrupted track {} at sample {}", track_id, offset);
        Some((track_id, offset))
    }

    /// Forget all queued audio, counts and interrupted tracks
    pub fn reset(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        inner.samples.clear();
        inner.segments.clear();
        inner.current = None;
        inner.played.clear();
        inner.interrupted.clear();
        inner.generation += 1;
    }

    /// Changes whenever queued audio is discarded by an interrupt or reset
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Samples played so far for `track_id`
    pub fn played(&self, track_id: &str) -> u64 {
        self.inner.lock().played.get(track_id).copied().unwrap_or(0)
    }

    /// Track being played, if the queue has not run dry
    pub fn current_track(&self) -> Option<String> {
        self.inner.lock().current.clone()
    }

    /// Get the number of samples waiting to be played
    pub fn len(&self) -> usize {
        self.inner.lock().samples.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }

    /// Get the capacity of the queue
    pub fn capacity(&self) -> usize {
        self.inner.lock().samples.capacity().get()
    }
}

impl Clone for TrackQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
