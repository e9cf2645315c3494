/*!
 * Analysis
 * State sampling and adaptive pacing
 */

mod delay;
mod sampler;

pub use delay::{DelayController, PassReport};
pub use sampler::{SamplerHandle, SamplingLoop};
