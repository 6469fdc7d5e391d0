//! Schedule engine: timetable synthesis and route assignment.
//!
//! Explicit timetables are decoded in `loading::timetable`; when none
//! are available the synthesizer in this module produces a plausible
//! service day from route geometry and stop spacing.

mod assign;
mod synth;

pub use assign::assign_schedules;
pub use synth::generate_schedules;
