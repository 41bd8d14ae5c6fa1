// REST store client
//
// Talks to an ioBroker instance through the `simple-api` adapter. Reads and
// writes are plain GET requests; change subscriptions are served by polling
// each subscribed point, since the REST surface has no push channel.

mod client;
mod poll;

pub use client::RestStore;
pub use poll::PollConfig;
