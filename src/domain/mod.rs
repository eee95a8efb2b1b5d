//! Domain layer - values and state machines of the realtime chat core.
//!
//! - `foundation` - identifiers, timestamps, errors, state machine trait
//! - `messaging` - chat message model and wire shape
//! - `realtime` - transport/channel lifecycles, backoff, topic addressing

pub mod foundation;
pub mod messaging;
pub mod realtime;
