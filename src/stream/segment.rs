use std::ops::Range;
use std::sync::Arc;

use crate::config::ScopeConfig;
use crate::stream::buffer::{ChannelBuffer, Sample};
use crate::stream::scroll::ScrollManager;
use crate::types::{Bounds, Point};

/// Gap between the channel's bottom edge and the top guide line.
const GUIDE_OFFSET: f64 = 4.0;
/// Inset kept free at the lower bound of the drawable range.
const LOWER_INSET: f64 = 2.0;

/// Clamp a scaled value into `[-height/2 + 2, height/2]`. NaN goes to the lower bound.
pub fn trim(y: f64, height: f64) -> f64 {
    let upper = height / 2.0;
    // Very short channels would otherwise invert the range.
    let lower = (-height / 2.0 + LOWER_INSET).min(upper);
    if y.is_nan() || y <= lower {
        lower
    } else if y >= upper {
        upper
    } else {
        y
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
}

impl PathOp {
    pub fn point(&self) -> Point {
        match *self {
            PathOp::MoveTo(p) | PathOp::LineTo(p) => p,
        }
    }
}

/// Drawable geometry of one window, in segment-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub ops: Vec<PathOp>,
    /// Runs of missing samples (sample-index ranges) where the pen lifts.
    pub breaks: Vec<Range<usize>>,
    /// Horizontal guide drawn just outside the channel's bottom edge.
    pub guide: [Point; 2],
    /// Horizontal extent, `W * timeScale`.
    pub span: f64,
}

impl Polyline {
    pub fn subpath_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PathOp::MoveTo(_)))
            .count()
    }

    pub fn is_continuous(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// An emitted window on the scrolling timeline.
///
/// The geometry is shared and never changes; only `x` (the right edge)
/// moves as the timeline scrolls.
#[derive(Debug, Clone)]
pub struct WaveformSegment {
    x: f64,
    shape: Arc<Polyline>,
}

impl WaveformSegment {
    pub fn new(x: f64, shape: Polyline) -> Self {
        Self {
            x,
            shape: Arc::new(shape),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn left(&self) -> f64 {
        self.x - self.shape.span
    }

    pub fn shape(&self) -> &Arc<Polyline> {
        &self.shape
    }

    pub(crate) fn shift(&mut self, dx: f64) {
        self.x -= dx;
    }
}

/// Cuts a channel's intake queue into fixed windows.
#[derive(Clone, Copy, Debug)]
pub struct WindowEmitter {
    window_size: usize,
    time_scale: f64,
    value_scale: f64,
}

impl WindowEmitter {
    pub fn new(window_size: usize, time_scale: f64, value_scale: f64) -> Self {
        Self {
            window_size,
            time_scale,
            value_scale,
        }
    }

    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.window_size, config.time_scale, config.value_scale)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn span(&self) -> f64 {
        self.window_size as f64 * self.time_scale
    }

    /// Emit every full window queued in `buffer` onto `live`.
    ///
    /// Consecutive windows share one sample: `W` are read, `W - 1` removed.
    pub fn drain(
        &self,
        buffer: &mut ChannelBuffer,
        live: &mut ScrollManager,
        bounds: Bounds,
    ) -> Vec<WaveformSegment> {
        let mut emitted = Vec::new();
        while let Some(data) = buffer.peek_window(self.window_size) {
            buffer.discard_front(self.window_size - 1);
            let x = match live.last() {
                Some(prev) => prev.x() + self.span(),
                None => bounds.width + self.span(),
            };
            let segment = WaveformSegment::new(x, self.build(&data, bounds));
            live.push(segment.clone());
            emitted.push(segment);
        }
        emitted
    }

    pub fn build(&self, data: &[Sample], bounds: Bounds) -> Polyline {
        let mut ops = Vec::with_capacity(data.len());
        let mut breaks: Vec<Range<usize>> = Vec::new();
        let mut pen_up = true;
        for (i, sample) in data.iter().enumerate() {
            match sample {
                Sample::Missing => {
                    match breaks.last_mut() {
                        Some(run) if run.end == i => run.end = i + 1,
                        _ => breaks.push(i..i + 1),
                    }
                    pen_up = true;
                }
                Sample::Value(v) => {
                    let p = Point::new(
                        i as f64 * self.time_scale,
                        trim(v * self.value_scale * bounds.height, bounds.height),
                    );
                    ops.push(if pen_up {
                        PathOp::MoveTo(p)
                    } else {
                        PathOp::LineTo(p)
                    });
                    pen_up = false;
                }
            }
        }
        let span = self.span();
        let guide_y = -bounds.height / 2.0 - GUIDE_OFFSET;
        Polyline {
            ops,
            breaks,
            guide: [Point::new(0.0, guide_y), Point::new(span, guide_y)],
            span,
        }
    }
}
