//! Sample-accurate parameter values
//!
//! A [`SampleAccurateValue`] holds the plain value of one continuous
//! parameter plus the automation breakpoints the host queued for the current
//! block. Advancing by `n` samples consumes every breakpoint that falls inside
//! the span and ramps linearly towards the next one, so the cost is bounded
//! by the number of breakpoints rather than the number of samples.

/// One automation point: a normalized value reached at a sample offset
/// within the current host block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breakpoint {
    pub offset: u32,
    pub value: f64,
}

impl Breakpoint {
    pub fn new(offset: u32, value: f64) -> Self {
        Self { offset, value }
    }
}

/// Time-tagged stream of normalized values for one parameter.
///
/// Any host transport can feed the patch store by implementing this; slices,
/// arrays and vectors of [`Breakpoint`] already do.
pub trait ValueQueue {
    /// Number of points in the stream
    fn len(&self) -> usize;

    /// Point at `index`, in offset order
    fn point(&self, index: usize) -> Option<Breakpoint>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Final point of the stream
    fn last_point(&self) -> Option<Breakpoint> {
        self.len().checked_sub(1).and_then(|i| self.point(i))
    }
}

impl ValueQueue for [Breakpoint] {
    fn len(&self) -> usize {
        <[Breakpoint]>::len(self)
    }

    fn point(&self, index: usize) -> Option<Breakpoint> {
        self.get(index).copied()
    }
}

impl<const N: usize> ValueQueue for [Breakpoint; N] {
    fn len(&self) -> usize {
        N
    }

    fn point(&self, index: usize) -> Option<Breakpoint> {
        self.get(index).copied()
    }
}

impl ValueQueue for Vec<Breakpoint> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn point(&self, index: usize) -> Option<Breakpoint> {
        self.get(index).copied()
    }
}

/// Next target the value is ramping towards.
#[derive(Clone, Copy, Debug)]
struct Pending {
    /// Plain target value
    value: f64,
    /// Per-sample increment towards `value`
    ramp: f64,
    /// Samples until `value` is reached; negative once the queue is drained
    offset: i64,
}

impl Pending {
    fn idle(value: f64) -> Self {
        Self {
            value,
            ramp: 0.0,
            offset: -1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SampleAccurateValue {
    min: f64,
    max: f64,
    current: f64,
    queue: Vec<Breakpoint>,
    next_index: usize,
    pending: Pending,
    sample_counter: i64,
    active: bool,
}

impl SampleAccurateValue {
    /// Creates a value with plain range `min..=max`, starting at `value`.
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        debug_assert!(max > min);
        Self {
            min,
            max,
            current: value,
            queue: Vec::new(),
            next_index: 0,
            pending: Pending::idle(value),
            sample_counter: 0,
            active: false,
        }
    }

    /// Current plain value
    #[inline]
    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether a breakpoint queue is installed for the current block
    pub fn has_changes(&self) -> bool {
        self.active
    }

    /// Converts a normalized value into this value's plain range.
    #[inline]
    pub fn to_plain(&self, normalized: f64) -> f64 {
        self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min)
    }

    /// Current value mapped back into `0..=1`
    pub fn normalized(&self) -> f64 {
        (self.current - self.min) / (self.max - self.min)
    }

    /// Jumps to a plain value, dropping any queued changes. Non-finite
    /// values are ignored.
    pub fn set_value(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.current = value.clamp(self.min, self.max);
        self.queue.clear();
        self.next_index = 0;
        self.sample_counter = 0;
        self.active = false;
        self.pending = Pending::idle(self.current);
    }

    pub fn set_normalized(&mut self, normalized: f64) {
        self.set_value(self.to_plain(normalized));
    }

    /// Installs the breakpoints for the upcoming block.
    ///
    /// Returns `false` when a queue is already active (the new one is
    /// ignored) or when `queue` is empty.
    pub fn begin_changes<Q: ValueQueue + ?Sized>(&mut self, queue: &Q) -> bool {
        if self.active || queue.is_empty() {
            return false;
        }

        self.queue.clear();
        let mut last_offset = 0;
        for point in (0..queue.len())
            .filter_map(|i| queue.point(i))
            .filter(|p| p.value.is_finite())
        {
            // Offsets must not go backwards within a block
            let offset = point.offset.max(last_offset);
            last_offset = offset;
            self.queue.push(Breakpoint::new(offset, point.value));
        }
        if self.queue.is_empty() {
            return false;
        }

        self.next_index = 0;
        self.sample_counter = 0;
        self.active = true;
        self.pending = self.next_point();
        true
    }

    /// Advances the value by `num_samples`, consuming every breakpoint
    /// reached within that span.
    pub fn advance(&mut self, num_samples: usize) {
        if !self.active {
            return;
        }

        let mut remaining = num_samples as i64;
        while self.pending.offset >= 0 && self.pending.offset < remaining {
            self.sample_counter += self.pending.offset;
            remaining -= self.pending.offset;
            self.current = self.pending.value;
            self.pending = self.next_point();
        }

        self.current += self.pending.ramp * remaining as f64;
        self.pending.offset -= remaining;
        self.sample_counter += remaining;
    }

    /// Jumps straight to the final breakpoint.
    pub fn flush_changes(&mut self) {
        if !self.active {
            return;
        }
        while self.active {
            self.current = self.pending.value;
            self.pending = self.next_point();
        }
        self.current = self.pending.value;
    }

    /// Flushes and releases the queue at the end of the host block.
    pub fn end_changes(&mut self) {
        self.flush_changes();
        self.queue.clear();
        self.next_index = 0;
        self.sample_counter = 0;
    }

    fn next_point(&mut self) -> Pending {
        let Some(point) = self.queue.get(self.next_index).copied() else {
            self.active = false;
            return Pending::idle(self.current);
        };
        self.next_index += 1;

        let value = self.to_plain(point.value);
        let offset = point.offset as i64 - self.sample_counter;
        let ramp = if offset == 0 {
            value - self.current
        } else {
            (value - self.current) / offset as f64
        };
        Pending {
            value,
            ramp,
            offset,
        }
    }
}

impl Default for SampleAccurateValue {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}
