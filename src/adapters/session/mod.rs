mod probe;
mod relay;

pub use probe::{read_greeting, MAX_GREETING};
pub use relay::{relay, RelayStats};
