//! Power analysis and study sizing
//!
//! Computes the sample size a planned two-condition comparison needs and
//! converts it into per-story assignment capacity.
//!
//! # Workflow
//!
//! 1. **Effect size**: supplied directly, or estimated from a pilot outcome
//!    table ([`pilot::PilotSummary`])
//! 2. **Sample size**: normal-approximation formulas for independent and
//!    paired designs, inflated for dropout ([`design::SampleSize`])
//! 3. **Capacity**: per-story, per-condition assignment limits and their
//!    export rows ([`capacity`])
//!
//! # Examples
//!
//! ```
//! use studylens_power::{
//!     capacity::per_unit_capacity,
//!     design::{PowerTarget, SampleSize, StudyDesign},
//!     pilot::PilotSummary,
//! };
//!
//! let pilot = PilotSummary::from_groups("human", &[1.0, 2.0, 3.0], "vlm", &[2.0, 3.0, 4.0])?;
//! let size = SampleSize::required(StudyDesign::Independent, 0.5, &PowerTarget::default(), 1.0)?
//!     .with_dropout(0.0)?;
//! assert_eq!(pilot.cohens_d, 1.0);
//! assert_eq!(size.total(), 126);
//! assert_eq!(per_unit_capacity(size.largest_arm().unwrap(), 2)?, 32);
//! # Ok::<(), studylens_power::PowerError>(())
//! ```

pub use self::error::PowerError;

pub mod capacity;
pub mod design;
mod error;
pub mod pilot;
