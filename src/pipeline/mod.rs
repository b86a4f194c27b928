pub mod criteria;
pub mod dedupe;
pub mod digest;

pub use criteria::matches;
pub use dedupe::dedupe;
pub use digest::Digest;
