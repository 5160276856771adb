//! Blend curves for transitions.

use crate::model::transition::TransitionKind;
use crate::rendering::plan::Ramp;

/// Opacity multipliers for the two sides of a transition at one progress value.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BlendWeights {
    pub outgoing: f64,
    pub incoming: f64,
}

/// Curve value at `progress` (clamped to 0..1).
pub fn weights(kind: &TransitionKind, progress: f64) -> BlendWeights {
    let p = progress.clamp(0.0, 1.0);
    match kind {
        TransitionKind::CrossDissolve => BlendWeights {
            outgoing: 1.0 - p,
            incoming: p,
        },
        // Outgoing fades to black over the first half, incoming fades up over the second.
        TransitionKind::DipToBlack if p < 0.5 => BlendWeights {
            outgoing: 1.0 - p * 2.0,
            incoming: 0.0,
        },
        TransitionKind::DipToBlack => BlendWeights {
            outgoing: 0.0,
            incoming: (p - 0.5) * 2.0,
        },
        // Wipes reveal through a mask driven by progress; both layers stay opaque.
        TransitionKind::Wipe { .. } => BlendWeights {
            outgoing: 1.0,
            incoming: 1.0,
        },
    }
}

/// Outgoing and incoming opacity ramps over a segment spanning `progress`.
///
/// Callers split segments at [`TransitionKind::breakpoints`], so the curve is linear
/// between the two ends.
pub fn ramps(kind: &TransitionKind, progress: Ramp) -> (Ramp, Ramp) {
    let (a, b) = (weights(kind, progress.start), weights(kind, progress.end));
    (
        Ramp::new(a.outgoing, b.outgoing),
        Ramp::new(a.incoming, b.incoming),
    )
}
