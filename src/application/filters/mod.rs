mod discard;
mod identity;
mod pipeline;

pub use discard::DiscardSink;
pub use identity::IdentityFilter;
pub use pipeline::Pipeline;
