use std::time::{Duration, Instant};

use serde::Serialize;

use pagelens_core::{TooltipContent, Tuning};
use pagelens_dom::{BoundingBox, NodeId, ViewportInfo};

/// Where the singleton tooltip goes, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Set when the tooltip flipped below the target.
    pub below: bool,
}

const PLACEMENT_MARGIN: f64 = 10.0;

/// Two-step placement: above the target and left-aligned by default,
/// flipped below when the top edge would sit above the scroll offset,
/// then clamped inward at the right and top. Good-enough positioning,
/// not a no-overlap guarantee.
pub fn place(rect: &BoundingBox, size: (f64, f64), viewport: &ViewportInfo) -> Placement {
    let (tip_w, tip_h) = size;
    let scroll_x = viewport.scroll_x;
    let scroll_y = viewport.scroll_y;

    let mut below = false;
    let mut top = rect.y + scroll_y - tip_h - PLACEMENT_MARGIN;
    let mut left = rect.x + scroll_x;

    if top < scroll_y {
        top = rect.bottom() + scroll_y + PLACEMENT_MARGIN;
        below = true;
    }
    if left + tip_w > viewport.width as f64 + scroll_x {
        left = viewport.width as f64 + scroll_x - tip_w - PLACEMENT_MARGIN;
    }
    if left < PLACEMENT_MARGIN {
        left = PLACEMENT_MARGIN;
    }
    if top < PLACEMENT_MARGIN {
        top = PLACEMENT_MARGIN;
    }

    Placement {
        x: left,
        y: top,
        width: tip_w,
        height: tip_h,
        below,
    }
}

/// Deterministic content size estimate standing in for a rendered
/// measurement. Width is fixed; height grows with the content.
pub fn estimate_size(content: &TooltipContent) -> (f64, f64) {
    let mut height = 40.0;
    height += content.fields.len() as f64 * 32.0;
    height += (content.warnings.len() + content.notes.len()) as f64 * 18.0;
    if let Some(insight) = &content.insight {
        height += 18.0 + (insight.len() as f64 / 40.0).ceil() * 14.0;
    }
    (280.0, height)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Hidden,
    /// Show requested, reveal timer running.
    Pending(NodeId),
    /// Measured and positioned, enter-transition timer running.
    Positioned(NodeId),
    Visible(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Reveal,
    Enter,
    AutoHide,
    Hide,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    kind: TimerKind,
}

/// What a fired timer asks the driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipFire {
    /// Reveal delay elapsed: measure the target now and either
    /// `present` a placement or `abort_show`.
    Reveal { target: NodeId },
    /// Enter transition done; the tooltip is now visible.
    Shown { target: NodeId },
    /// Hide or auto-hide completed.
    Hidden,
}

/// The tooltip lifecycle: `hidden -> pending -> positioned -> visible`
/// and back. One timer slot; every request replaces it, so the most
/// recent request always wins and stale timers cannot fire.
#[derive(Debug)]
pub struct TooltipController {
    phase: Phase,
    timer: Option<Timer>,
    reveal_delay: Duration,
    hide_delay: Duration,
    enter_delay: Duration,
    auto_hide: Duration,
}

impl TooltipController {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            phase: Phase::Hidden,
            timer: None,
            reveal_delay: Duration::from_millis(tuning.tooltip_reveal_ms),
            hide_delay: Duration::from_millis(tuning.tooltip_hide_ms),
            enter_delay: Duration::from_millis(tuning.tooltip_enter_ms),
            auto_hide: Duration::from_millis(tuning.tooltip_auto_hide_ms),
        }
    }

    /// Starts the reveal countdown for `target`, canceling any pending
    /// reveal, hide, or auto-hide.
    pub fn request_show(&mut self, target: NodeId, now: Instant) {
        self.phase = Phase::Pending(target);
        self.timer = Some(Timer {
            deadline: now + self.reveal_delay,
            kind: TimerKind::Reveal,
        });
    }

    /// Cancels a pending reveal outright; a visible tooltip hides after
    /// the hide delay. Idempotent.
    pub fn request_hide(&mut self, now: Instant) {
        match self.phase {
            Phase::Hidden => self.timer = None,
            Phase::Pending(_) | Phase::Positioned(_) => {
                self.phase = Phase::Hidden;
                self.timer = None;
            }
            Phase::Visible(_) => {
                self.timer = Some(Timer {
                    deadline: now + self.hide_delay,
                    kind: TimerKind::Hide,
                });
            }
        }
    }

    /// The driver measured the target and has a placement; arms the
    /// enter transition. Returns false if the show was superseded.
    pub fn present(&mut self, target: NodeId, now: Instant) -> bool {
        if self.phase != Phase::Pending(target) {
            return false;
        }
        self.phase = Phase::Positioned(target);
        self.timer = Some(Timer {
            deadline: now + self.enter_delay,
            kind: TimerKind::Enter,
        });
        true
    }

    /// The target vanished or no longer classifies; drop the pending
    /// show without any hide delay.
    pub fn abort_show(&mut self) {
        if matches!(self.phase, Phase::Pending(_) | Phase::Positioned(_)) {
            self.phase = Phase::Hidden;
            self.timer = None;
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    pub fn target(&self) -> Option<NodeId> {
        match self.phase {
            Phase::Hidden => None,
            Phase::Pending(t) | Phase::Positioned(t) | Phase::Visible(t) => Some(t),
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.phase, Phase::Visible(_))
    }

    /// Advances the state machine when the armed timer has elapsed.
    pub fn fire(&mut self, now: Instant) -> Option<TooltipFire> {
        let timer = self.timer?;
        if now < timer.deadline {
            return None;
        }
        self.timer = None;

        match (timer.kind, self.phase) {
            (TimerKind::Reveal, Phase::Pending(target)) => Some(TooltipFire::Reveal { target }),
            (TimerKind::Enter, Phase::Positioned(target)) => {
                self.phase = Phase::Visible(target);
                self.timer = Some(Timer {
                    deadline: now + self.auto_hide,
                    kind: TimerKind::AutoHide,
                });
                Some(TooltipFire::Shown { target })
            }
            (TimerKind::AutoHide, Phase::Visible(_)) | (TimerKind::Hide, Phase::Visible(_)) => {
                self.phase = Phase::Hidden;
                Some(TooltipFire::Hidden)
            }
            // A timer that no longer matches the phase is stale.
            _ => {
                if self.phase == Phase::Hidden {
                    None
                } else {
                    self.phase = Phase::Hidden;
                    None
                }
            }
        }
    }
}
