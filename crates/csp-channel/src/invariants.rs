//! Debug assertion macros for the invariants documented in `SPEC_FULL.md` §3.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds. Mirrors the `INV-*` macro
//! convention used by the `ringmpsc`/`ringmpsc-stream` crates this
//! workspace is patterned on.

// =============================================================================
// I1: Monotonic State
// =============================================================================

/// Assert that `state` only ever advances: `Open -> Closed -> Ended`.
///
/// Used in: `state::transition`
macro_rules! debug_assert_monotonic_state {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "I1 violated: state regressed from {:?} to {:?}",
            $old,
            $new
        )
    };
}

// =============================================================================
// I4: Bounded Buffer
// =============================================================================
//
// `buffered_slide`'s Phase B never pushes past `buf.full()`, which is the
// structural enforcement of "buf.length <= buf.size". There is no active
// debug_assert! for it here: a transform expansion can transiently leave
// `buf` over its nominal size after the slide engine has returned control
// (documented in DESIGN.md's "buffer overshoot on expansion" decision), so
// the invariant does not hold at *every* observable point and a blanket
// assertion would misfire on that documented, intentional case.

// =============================================================================
// I5: At Most One Active Slide
// =============================================================================

/// Assert that a slide loop never observes `sliding` already claimed by
/// itself (i.e. the claim-or-bail check in `kick` is exclusive).
///
/// Used in: `slide::kick`
macro_rules! debug_assert_single_slider {
    ($already_claimed:expr) => {
        debug_assert!(
            !$already_claimed,
            "I5 violated: a second slide loop was started while one was active"
        )
    };
}

// =============================================================================
// I6: Flush Runs At Most Once
// =============================================================================

/// Assert that `flush` is not re-entered while already flushing.
///
/// Used in: `state::flush`
macro_rules! debug_assert_flush_once {
    ($already_flushing:expr) => {
        debug_assert!(
            !$already_flushing,
            "I6 violated: flush re-entered while already flushing"
        )
    };
}

// =============================================================================
// I7/I8/I9: Put/Take Resolution On Non-Open Channels
// =============================================================================

/// Assert that a put/tail accepted while `Open` was not also resolved
/// `Done`, and vice versa.
///
/// Used in: `channel::put`, `channel::tail`
macro_rules! debug_assert_put_outcome_matches_state {
    ($is_open:expr, $outcome_is_done:expr) => {
        debug_assert!(
            $is_open != $outcome_is_done,
            "I7/I8 violated: put outcome done={} inconsistent with open={}",
            $outcome_is_done,
            $is_open
        )
    };
}

pub(crate) use debug_assert_flush_once;
pub(crate) use debug_assert_monotonic_state;
pub(crate) use debug_assert_put_outcome_matches_state;
pub(crate) use debug_assert_single_slider;
