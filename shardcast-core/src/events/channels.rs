//! Occurrence channel factories and handles.
//!
//! Each shard lane is fed by its own unbounded channel: the connection layer
//! hands occurrences off and never waits on dispatch.

use super::types::Occurrence;
use tokio::sync::mpsc;

/// Sender handle for a shard lane.
pub type OccurrenceSender = mpsc::UnboundedSender<Occurrence>;
/// Receiver handle for a shard lane.
pub type OccurrenceReceiver = mpsc::UnboundedReceiver<Occurrence>;

/// Create a new occurrence channel.
///
/// Returns a (sender, receiver) pair. Each shard lane should have its own
/// channel so that one shard's backlog never delays another shard.
pub fn occurrence_channel() -> (OccurrenceSender, OccurrenceReceiver) {
    mpsc::unbounded_channel()
}
