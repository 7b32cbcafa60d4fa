pub mod caller;
pub mod hint;

pub use caller::{classify_error, parse_payload, RateLimitedCaller};
pub use hint::{HintAnswer, HintExchange, HintRequest, HintService};
